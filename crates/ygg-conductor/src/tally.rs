use std::collections::HashMap;

use ygg_core::Faction;
use ygg_core::FactionId;
use ygg_core::FactionResult;
use ygg_core::OptionId;
use ygg_core::Rational;
use ygg_core::RowResult;
use ygg_core::User;
use ygg_core::UserId;
use ygg_core::Vote;
use ygg_core::FACTION_COUNT;
use ygg_core::OPTIONS_PER_ROW;

/// Injectable source of randomness for [`resolve_tie`].
///
/// Production code draws from a real RNG; tests inject a seeded one so the
/// tiebreaker is reproducible (spec.md §9 "Randomness").
pub trait TieBreaker {
    fn resolve(&self, tied: &[FactionId]) -> FactionId;
}

/// Picks uniformly at random among `tied`. Panics on an empty slice — that
/// is a caller bug (`ConductorError::TieInputEmpty` in spec.md §7 is
/// supposed to never reach here; `run` below never calls this with an empty
/// set, since the maximum of a non-empty collection is always in it).
pub fn resolve_tie<R: rand::Rng + ?Sized>(tied: &[FactionId], rng: &mut R) -> FactionId {
    assert!(!tied.is_empty(), "resolveTie called with empty tie set");
    let index = rng.random_range(0..tied.len());
    tied[index]
}

/// Production tiebreaker backed by a fresh thread-local RNG per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTieBreaker;

impl TieBreaker for RandomTieBreaker {
    fn resolve(&self, tied: &[FactionId]) -> FactionId {
        resolve_tie(tied, &mut rand::rng())
    }
}

/// Seeded tiebreaker for reproducible tests.
pub struct SeededTieBreaker {
    rng: std::cell::RefCell<rand::rngs::SmallRng>,
}

impl SeededTieBreaker {
    pub fn new(seed: u64) -> Self {
        use rand::SeedableRng;
        Self {
            rng: std::cell::RefCell::new(rand::rngs::SmallRng::seed_from_u64(seed)),
        }
    }
}

impl TieBreaker for SeededTieBreaker {
    fn resolve(&self, tied: &[FactionId]) -> FactionId {
        resolve_tie(tied, &mut *self.rng.borrow_mut())
    }
}

/// Tallies one row's votes into a [`RowResult`] (spec.md §4.2).
pub struct Tally;

impl Tally {
    /// `faction_size(f)` must count every user currently assigned to faction
    /// `f`, connected or not — coup accounting and coherence denominators are
    /// not affected by a temporary disconnect.
    pub fn run(
        votes: &HashMap<UserId, Vote>,
        users: &HashMap<UserId, User>,
        factions: &[Faction],
        tie_breaker: &dyn TieBreaker,
    ) -> RowResult {
        let mut faction_sizes = [0u64; FACTION_COUNT];
        for user in users.values() {
            if let Some(f) = user.faction {
                faction_sizes[f as usize] += 1;
            }
        }

        let mut counts_by_faction: Vec<[u32; OPTIONS_PER_ROW]> =
            vec![[0; OPTIONS_PER_ROW]; factions.len()];
        for vote in votes.values() {
            let Some(faction) = users.get(&vote.user_id).and_then(|u| u.faction) else {
                continue;
            };
            if (vote.faction_vote as usize) < OPTIONS_PER_ROW {
                counts_by_faction[faction as usize][vote.faction_vote as usize] += 1;
            }
        }

        let mut per_faction_results = Vec::with_capacity(factions.len());
        for faction in factions {
            let size = faction_sizes[faction.id as usize];
            let counts = counts_by_faction[faction.id as usize];
            let (chosen_option, max_count) = argmax(&counts);
            let raw = if size == 0 {
                Rational::zero()
            } else {
                Rational::new(max_count as u64, size)
            };
            let weighted = match faction.coup_multiplier {
                Some(multiplier) => raw.scale_by_one_plus(multiplier.numerator(), multiplier.denominator()),
                None => raw,
            };
            per_faction_results.push(FactionResult {
                faction_id: faction.id,
                chosen_option,
                raw_coherence: (raw.numerator(), raw.denominator()),
                weighted_coherence: (weighted.numerator(), weighted.denominator()),
            });
        }

        let (winner_id, winner_option, tiebreaker_was_used, tied_ids) =
            pick_faction_winner(&per_faction_results, tie_breaker);

        let mut popular_counts = [0u32; OPTIONS_PER_ROW];
        for vote in votes.values() {
            if (vote.personal_vote as usize) < OPTIONS_PER_ROW {
                popular_counts[vote.personal_vote as usize] += 1;
            }
        }
        let popular_winner = if votes.is_empty() {
            None
        } else {
            Some(argmax(&popular_counts).0)
        };

        RowResult {
            faction_winner_faction_id: winner_id,
            faction_winner_option_id: winner_option,
            popular_winner_option_id: popular_winner,
            per_faction_results,
            tiebreaker_was_used,
            tied_faction_ids: tied_ids,
        }
    }
}

/// Index of the maximum count, ties broken by lowest option index.
fn argmax(counts: &[u32; OPTIONS_PER_ROW]) -> (OptionId, u32) {
    let mut best_index = 0usize;
    let mut best_count = counts[0];
    for (index, &count) in counts.iter().enumerate().skip(1) {
        if count > best_count {
            best_count = count;
            best_index = index;
        }
    }
    (best_index as OptionId, best_count)
}

/// Finds the faction(s) with maximum weighted coherence and resolves ties.
///
/// Returns `(None, None, false, vec![])` only when `per_faction_results` is
/// empty, which cannot happen for an assigned show (always four factions).
fn pick_faction_winner(
    results: &[FactionResult],
    tie_breaker: &dyn TieBreaker,
) -> (Option<FactionId>, Option<OptionId>, bool, Vec<FactionId>) {
    let Some(max) = results
        .iter()
        .map(|r| Rational::new(r.weighted_coherence.0, r.weighted_coherence.1.max(1)))
        .max()
    else {
        return (None, None, false, Vec::new());
    };

    let tied: Vec<FactionId> = results
        .iter()
        .filter(|r| Rational::new(r.weighted_coherence.0, r.weighted_coherence.1.max(1)) == max)
        .map(|r| r.faction_id)
        .collect();

    if tied.len() == 1 {
        let winner = tied[0];
        let option = results
            .iter()
            .find(|r| r.faction_id == winner)
            .map(|r| r.chosen_option);
        (Some(winner), option, false, Vec::new())
    } else {
        let winner = tie_breaker.resolve(&tied);
        let option = results
            .iter()
            .find(|r| r.faction_id == winner)
            .map(|r| r.chosen_option);
        (Some(winner), option, true, tied)
    }
}
