use std::collections::HashMap;

use ygg_assignment::assign_factions;
use ygg_assignment::assign_latecomer;
use ygg_assignment::AdjacencyGraph;
use ygg_assignment::Joined;
use ygg_core::Faction;
use ygg_core::OptionId;
use ygg_core::PersonalTree;
use ygg_core::Rational;
use ygg_core::RowPhase;
use ygg_core::ShowPhase;
use ygg_core::ShowState;
use ygg_core::User;
use ygg_core::Vote;
use ygg_core::FACTION_COUNT;
use ygg_core::OPTIONS_PER_ROW;

use crate::effect::BroadcastScope;
use crate::effect::Effect;
use crate::error::ConductorError;
use crate::tally::TieBreaker;
use crate::Command;

const FACTION_NAMES: [&str; FACTION_COUNT] = ["Ember", "Tide", "Stone", "Gale"];
const FACTION_COLORS: [&str; FACTION_COUNT] = ["#d64545", "#3478c9", "#8a8a8a", "#4caf7d"];
const MULTIPLIER_DENOMINATOR: u64 = 1000;

/// The result of one [`Conductor::reduce`] call.
///
/// On validation failure, `state` is an unchanged clone of the input and
/// `error` is populated — `effects` is always empty in that case (spec.md
/// §7: "Validation errors are returned to the originating connection as an
/// `error` message; state is unchanged").
pub struct Outcome {
    pub state: ShowState,
    pub effects: Vec<Effect>,
    pub error: Option<ConductorError>,
}

impl Outcome {
    fn rejected(state: &ShowState, error: ConductorError) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
            error: Some(error),
        }
    }
    fn accepted(state: ShowState, effects: Vec<Effect>) -> Self {
        Self {
            state,
            effects,
            error: None,
        }
    }
}

/// The pure reducer: `(state, command) -> (state', effects[])` (spec.md
/// §4.3). Holds only the two injectable strategies the command catalog
/// needs — seat adjacency and tie resolution — never the show state itself,
/// which is owned and threaded through by the caller (the single-writer
/// command-queue actor in ygg-server).
pub struct Conductor<'a> {
    graph: &'a dyn AdjacencyGraph,
    tie_breaker: &'a dyn TieBreaker,
}

impl<'a> Conductor<'a> {
    pub fn new(graph: &'a dyn AdjacencyGraph, tie_breaker: &'a dyn TieBreaker) -> Self {
        Self { graph, tie_breaker }
    }

    pub fn reduce(&self, state: &ShowState, command: Command) -> Outcome {
        match command {
            Command::Join {
                user_id,
                seat_id,
                mode: _,
                timestamp,
            } => self.join(state, user_id, seat_id, timestamp),
            Command::Leave { user_id, .. } => self.leave(state, user_id),
            Command::SubmitFigTree { user_id, text, .. } => {
                self.submit_fig_tree(state, user_id, text)
            }
            Command::AssignFactions { .. } => self.assign_factions(state),
            Command::StartShow { .. } => self.start_show(state),
            Command::AdvancePhase { .. } => self.advance_phase(state),
            Command::CastVote {
                user_id,
                row_index,
                faction_vote,
                personal_vote,
                timestamp,
            } => self.cast_vote(state, user_id, row_index, faction_vote, personal_vote, timestamp),
            Command::CoupVote { user_id, .. } => self.coup_vote(state, user_id),
            Command::Pause { .. } => self.pause(state),
            Command::Resume { .. } => self.resume(state),
            Command::SkipRow { .. } => self.skip_row(state),
            Command::RestartRow { .. } => self.restart_row(state),
            Command::ForceFinale { .. } => self.force_finale(state),
            Command::ResetToLobby { preserve_users, .. } => {
                self.reset_to_lobby(state, preserve_users)
            }
            Command::ImportState { state: imported, .. } => self.import_state(state, *imported),
            Command::ForceReconnectAll { reason, .. } => Outcome {
                state: state.clone(),
                effects: vec![Effect::ForceReconnectAll { reason }],
                error: None,
            },
        }
    }

    fn join(
        &self,
        state: &ShowState,
        user_id: ygg_core::UserId,
        seat_id: Option<String>,
        timestamp: i64,
    ) -> Outcome {
        let mut next = state.clone();
        if let Some(user) = next.users.get_mut(&user_id) {
            user.connected = true;
        } else {
            let mut user = User::new(user_id, seat_id.clone(), timestamp);
            if next.phase != ShowPhase::Lobby {
                let existing: Vec<(ygg_core::UserId, Option<String>, u8)> = next
                    .users
                    .values()
                    .filter_map(|u| u.faction.map(|f| (u.id, u.seat_id.clone(), f)))
                    .collect();
                let joined = Joined {
                    user_id,
                    seat_id: seat_id.clone(),
                };
                let faction = assign_latecomer(&joined, &existing, self.graph);
                user.faction = Some(faction);
            }
            next.users.insert(user_id, user);
            next.personal_trees
                .entry(user_id)
                .or_insert_with(|| PersonalTree::new(user_id));
        }
        next.version += 1;
        Outcome::accepted(
            next.clone(),
            vec![Effect::Persist(next), Effect::Broadcast(BroadcastScope::All)],
        )
    }

    fn leave(&self, state: &ShowState, user_id: ygg_core::UserId) -> Outcome {
        let mut next = state.clone();
        let Some(user) = next.users.get_mut(&user_id) else {
            return Outcome::rejected(state, ConductorError::UnknownUser);
        };
        user.connected = false;
        next.version += 1;
        Outcome::accepted(
            next.clone(),
            vec![Effect::Persist(next), Effect::Broadcast(BroadcastScope::All)],
        )
    }

    fn submit_fig_tree(&self, state: &ShowState, user_id: ygg_core::UserId, text: String) -> Outcome {
        if !matches!(state.phase, ShowPhase::Lobby | ShowPhase::Assigning) {
            return Outcome::rejected(state, ConductorError::WrongPhase);
        }
        if !state.users.contains_key(&user_id) {
            return Outcome::rejected(state, ConductorError::UnknownUser);
        }
        let mut next = state.clone();
        next.fig_tree_responses.insert(user_id, text.clone());
        next.personal_trees
            .entry(user_id)
            .or_insert_with(|| PersonalTree::new(user_id))
            .fig_tree_response = text;
        next.version += 1;
        Outcome::accepted(
            next.clone(),
            vec![Effect::Persist(next), Effect::Broadcast(BroadcastScope::Connection(user_id))],
        )
    }

    fn assign_factions(&self, state: &ShowState) -> Outcome {
        if state.phase != ShowPhase::Lobby {
            return Outcome::rejected(state, ConductorError::WrongPhase);
        }
        if state.users.len() < 4 {
            return Outcome::rejected(state, ConductorError::WrongPhase);
        }
        let mut next = state.clone();
        let joined: Vec<Joined> = next
            .users
            .values()
            .map(|u| Joined {
                user_id: u.id,
                seat_id: u.seat_id.clone(),
            })
            .collect();
        let assignment = assign_factions(&joined, self.graph);
        for (user_id, faction_id) in &assignment {
            if let Some(user) = next.users.get_mut(user_id) {
                user.faction = Some(*faction_id);
            }
        }
        next.factions = (0..FACTION_COUNT as u8)
            .map(|id| Faction::new(id, FACTION_NAMES[id as usize], FACTION_COLORS[id as usize]))
            .collect();
        next.phase = ShowPhase::Assigning;
        next.version += 1;
        Outcome::accepted(
            next.clone(),
            vec![Effect::Persist(next), Effect::Broadcast(BroadcastScope::All)],
        )
    }

    fn start_show(&self, state: &ShowState) -> Outcome {
        if state.phase != ShowPhase::Assigning {
            return Outcome::rejected(state, ConductorError::WrongPhase);
        }
        let mut next = state.clone();
        next.phase = ShowPhase::Running;
        next.current_row_index = 0;
        if let Some(row) = next.rows.get_mut(0) {
            row.phase = RowPhase::Audition;
            row.current_audition_index = 0;
            row.audition_complete = false;
        }
        next.version += 1;
        Outcome::accepted(
            next.clone(),
            vec![Effect::Persist(next), Effect::Broadcast(BroadcastScope::All)],
        )
    }

    fn advance_phase(&self, state: &ShowState) -> Outcome {
        if state.phase == ShowPhase::Paused {
            return Outcome::rejected(state, ConductorError::WrongPhase);
        }
        if state.phase != ShowPhase::Running {
            return Outcome::rejected(state, ConductorError::WrongPhase);
        }
        let mut next = state.clone();
        let row_index = next.current_row_index;
        let mut extra_effects = Vec::new();

        let Some(row) = next.rows.get_mut(row_index) else {
            return Outcome::rejected(state, ConductorError::StaleRow);
        };

        match row.phase {
            RowPhase::Pending => {
                row.phase = RowPhase::Audition;
                row.current_audition_index = 0;
                row.audition_complete = false;
            }
            RowPhase::Audition => {
                if (row.current_audition_index as usize + 1) < OPTIONS_PER_ROW {
                    row.current_audition_index += 1;
                } else {
                    row.audition_complete = true;
                    row.phase = RowPhase::Voting;
                }
            }
            RowPhase::Voting => {
                row.phase = RowPhase::Reveal;
                let result = crate::tally::Tally::run(
                    &row.votes,
                    &next.users,
                    &next.factions,
                    self.tie_breaker,
                );
                if result.tiebreaker_was_used {
                    extra_effects.push(Effect::TriggerTiebreakerAnimation { row: row_index });
                }
                next.rows[row_index].result = Some(result);
                for faction in next.factions.iter_mut() {
                    faction.coup_multiplier = None;
                }
            }
            RowPhase::Reveal => {
                for faction in next.factions.iter_mut() {
                    faction.current_row_coup_votes.clear();
                }
                next.rows[row_index].phase = RowPhase::CoupWindow;
            }
            RowPhase::CoupWindow => {
                commit_row_completion(&mut next, row_index);
            }
            RowPhase::Complete => {
                return Outcome::rejected(state, ConductorError::StaleRow);
            }
        }

        next.version += 1;
        let mut effects = vec![Effect::Persist(next.clone()), Effect::Broadcast(BroadcastScope::All)];
        effects.extend(extra_effects);
        Outcome::accepted(next, effects)
    }

    #[allow(clippy::too_many_arguments)]
    fn cast_vote(
        &self,
        state: &ShowState,
        user_id: ygg_core::UserId,
        row_index: ygg_core::RowIndex,
        faction_vote: OptionId,
        personal_vote: OptionId,
        timestamp: i64,
    ) -> Outcome {
        if state.phase != ShowPhase::Running {
            return Outcome::rejected(state, ConductorError::WrongPhase);
        }
        if row_index != state.current_row_index {
            return Outcome::rejected(state, ConductorError::StaleRow);
        }
        let Some(row) = state.current_row() else {
            return Outcome::rejected(state, ConductorError::StaleRow);
        };
        if row.phase != RowPhase::Voting {
            return Outcome::rejected(state, ConductorError::WrongPhase);
        }
        let Some(user) = state.users.get(&user_id) else {
            return Outcome::rejected(state, ConductorError::UnknownUser);
        };
        if user.faction.is_none() {
            return Outcome::rejected(state, ConductorError::UnknownUser);
        }
        if faction_vote as usize >= OPTIONS_PER_ROW || personal_vote as usize >= OPTIONS_PER_ROW {
            return Outcome::rejected(state, ConductorError::InvalidOption);
        }
        if state.config.vote_policy == ygg_core::VotePolicy::Strict {
            if let Some(existing) = row.votes.get(&user_id) {
                if existing.attempt == row.attempts {
                    return Outcome::rejected(state, ConductorError::AlreadyVoted);
                }
            }
        }

        let mut next = state.clone();
        let attempt = next.rows[next.current_row_index].attempts;
        next.rows[next.current_row_index].votes.insert(
            user_id,
            Vote {
                user_id,
                row_index,
                faction_vote,
                personal_vote,
                timestamp,
                attempt,
            },
        );
        next.version += 1;
        Outcome::accepted(
            next.clone(),
            vec![Effect::Persist(next), Effect::Broadcast(BroadcastScope::Faction(user.faction.unwrap()))],
        )
    }

    fn coup_vote(&self, state: &ShowState, user_id: ygg_core::UserId) -> Outcome {
        if state.phase != ShowPhase::Running {
            return Outcome::rejected(state, ConductorError::WrongPhase);
        }
        let Some(row) = state.current_row() else {
            return Outcome::rejected(state, ConductorError::StaleRow);
        };
        if row.phase != RowPhase::CoupWindow {
            return Outcome::rejected(state, ConductorError::WrongPhase);
        }
        let Some(user) = state.users.get(&user_id) else {
            return Outcome::rejected(state, ConductorError::UnknownUser);
        };
        let Some(faction_id) = user.faction else {
            return Outcome::rejected(state, ConductorError::UnknownUser);
        };
        let Some(faction) = state.factions.iter().find(|f| f.id == faction_id) else {
            return Outcome::rejected(state, ConductorError::UnknownUser);
        };
        if faction.coup_used {
            return Outcome::rejected(state, ConductorError::CoupAlreadyUsed);
        }

        let mut next = state.clone();
        let faction_size = next
            .users
            .values()
            .filter(|u| u.faction == Some(faction_id))
            .count();
        let faction = next
            .factions
            .iter_mut()
            .find(|f| f.id == faction_id)
            .expect("faction existed in the snapshot above");
        faction.current_row_coup_votes.insert(user_id);

        let ratio = faction.current_row_coup_votes.len() as f64 / faction_size.max(1) as f64;
        if ratio >= next.config.coup.threshold {
            let bonus = next.config.coup.multiplier_bonus;
            let faction = next
                .factions
                .iter_mut()
                .find(|f| f.id == faction_id)
                .expect("faction existed in the snapshot above");
            faction.coup_multiplier = Some(Rational::new(
                (bonus * MULTIPLIER_DENOMINATOR as f64).round() as u64,
                MULTIPLIER_DENOMINATOR,
            ));
            faction.coup_used = true;
            faction.current_row_coup_votes.clear();
        }

        next.version += 1;
        Outcome::accepted(
            next.clone(),
            vec![Effect::Persist(next), Effect::Broadcast(BroadcastScope::Faction(faction_id))],
        )
    }

    fn pause(&self, state: &ShowState) -> Outcome {
        if matches!(state.phase, ShowPhase::Paused | ShowPhase::Ended) {
            return Outcome::rejected(state, ConductorError::WrongPhase);
        }
        let mut next = state.clone();
        next.pause_prior_phase = Some(next.phase);
        next.phase = ShowPhase::Paused;
        next.version += 1;
        Outcome::accepted(
            next.clone(),
            vec![Effect::Persist(next), Effect::Broadcast(BroadcastScope::All)],
        )
    }

    fn resume(&self, state: &ShowState) -> Outcome {
        if state.phase != ShowPhase::Paused {
            return Outcome::rejected(state, ConductorError::WrongPhase);
        }
        let mut next = state.clone();
        next.phase = next.pause_prior_phase.take().unwrap_or(ShowPhase::Running);
        next.version += 1;
        Outcome::accepted(
            next.clone(),
            vec![Effect::Persist(next), Effect::Broadcast(BroadcastScope::All)],
        )
    }

    fn skip_row(&self, state: &ShowState) -> Outcome {
        if state.phase != ShowPhase::Running {
            return Outcome::rejected(state, ConductorError::WrongPhase);
        }
        let row_index = state.current_row_index;
        if state.rows.get(row_index).map(|r| r.phase) == Some(RowPhase::Complete) {
            return Outcome::rejected(state, ConductorError::StaleRow);
        }
        let mut next = state.clone();
        if next.rows[row_index].result.is_none() {
            let result = crate::tally::Tally::run(
                &next.rows[row_index].votes,
                &next.users,
                &next.factions,
                self.tie_breaker,
            );
            for faction in next.factions.iter_mut() {
                faction.coup_multiplier = None;
            }
            next.rows[row_index].result = Some(result);
        }
        commit_row_completion(&mut next, row_index);
        next.version += 1;
        Outcome::accepted(
            next.clone(),
            vec![Effect::Persist(next), Effect::Broadcast(BroadcastScope::All)],
        )
    }

    fn restart_row(&self, state: &ShowState) -> Outcome {
        if state.phase != ShowPhase::Running {
            return Outcome::rejected(state, ConductorError::WrongPhase);
        }
        let mut next = state.clone();
        let row_index = next.current_row_index;
        let Some(row) = next.rows.get_mut(row_index) else {
            return Outcome::rejected(state, ConductorError::StaleRow);
        };
        row.phase = RowPhase::Audition;
        row.current_audition_index = 0;
        row.audition_complete = false;
        row.votes.clear();
        row.attempts += 1;
        row.result = None;
        next.version += 1;
        Outcome::accepted(
            next.clone(),
            vec![Effect::Persist(next), Effect::Broadcast(BroadcastScope::All)],
        )
    }

    fn force_finale(&self, state: &ShowState) -> Outcome {
        if !matches!(state.phase, ShowPhase::Running | ShowPhase::Paused) {
            return Outcome::rejected(state, ConductorError::WrongPhase);
        }
        let mut next = state.clone();
        next.phase = ShowPhase::Finale;
        next.version += 1;
        Outcome::accepted(
            next.clone(),
            vec![Effect::Persist(next), Effect::Broadcast(BroadcastScope::All)],
        )
    }

    fn reset_to_lobby(&self, state: &ShowState, preserve_users: bool) -> Outcome {
        let mut next = ShowState::create_initial(state.config.clone(), state.id);
        next.version = state.version + 1;
        if preserve_users {
            for user in state.users.values() {
                let mut carried = user.clone();
                carried.faction = None;
                next.users.insert(carried.id, carried);
            }
            // Open question resolution (SPEC_FULL.md §9): fig-tree responses
            // are preserved alongside users, not dropped.
            next.fig_tree_responses = state.fig_tree_responses.clone();
            for (user_id, text) in &next.fig_tree_responses {
                next.personal_trees
                    .entry(*user_id)
                    .or_insert_with(|| PersonalTree::new(*user_id))
                    .fig_tree_response = text.clone();
            }
        }
        Outcome::accepted(
            next.clone(),
            vec![Effect::Persist(next), Effect::Broadcast(BroadcastScope::All)],
        )
    }

    fn import_state(&self, state: &ShowState, imported: ShowState) -> Outcome {
        if let Err(reason) = validate_invariants(&imported) {
            return Outcome::rejected(state, ConductorError::ImportValidationFailed(reason));
        }
        let mut next = imported;
        next.version = state.version.max(next.version) + 1;
        Outcome::accepted(
            next.clone(),
            vec![Effect::Persist(next), Effect::Broadcast(BroadcastScope::All)],
        )
    }
}

/// Commits the current row's result onto `paths`/`personal_trees` and
/// advances to the next row (or `finale`), shared by the ordinary
/// `coup_window -> complete` transition and `SKIP_ROW` (spec.md §4.3).
fn commit_row_completion(state: &mut ShowState, row_index: ygg_core::RowIndex) {
    let no_votes = state.rows[row_index].votes.is_empty();
    let result = state.rows[row_index]
        .result
        .clone()
        .expect("commit_row_completion requires a tally result");

    let faction_option = if no_votes {
        None
    } else {
        result.faction_winner_option_id
    };
    let popular_option = if no_votes {
        None
    } else {
        result.popular_winner_option_id
    };
    state.paths.faction_path.push(faction_option);
    state.paths.popular_path.push(popular_option);

    let votes = state.rows[row_index].votes.clone();
    for user_id in state.users.keys().copied().collect::<Vec<_>>() {
        let entry = votes.get(&user_id).map(|v| v.personal_vote);
        let tree = state
            .personal_trees
            .entry(user_id)
            .or_insert_with(|| PersonalTree::new(user_id));
        tree.path.push(entry);
    }

    for faction in state.factions.iter_mut() {
        faction.current_row_coup_votes.clear();
    }

    state.rows[row_index].phase = RowPhase::Complete;
    state.current_row_index += 1;
    if state.current_row_index >= state.rows.len() {
        state.phase = ShowPhase::Finale;
    }
}

/// Minimal invariant check run on `IMPORT_STATE` (spec.md §7
/// `ImportValidationFailed`, §6 "reject documents whose invariants are
/// violated").
fn validate_invariants(state: &ShowState) -> Result<(), String> {
    if !state.factions.is_empty() {
        let mut sizes = [0u64; FACTION_COUNT];
        for user in state.users.values() {
            if let Some(f) = user.faction {
                if f as usize >= FACTION_COUNT {
                    return Err(format!("user references out-of-range faction {f}"));
                }
                sizes[f as usize] += 1;
            }
        }
        let max = *sizes.iter().max().unwrap_or(&0);
        let min = *sizes.iter().min().unwrap_or(&0);
        if max - min > 1 {
            return Err("faction sizes are not balanced".to_string());
        }
    }
    let completed = state
        .rows
        .iter()
        .filter(|r| r.phase == RowPhase::Complete)
        .count();
    if state.paths.faction_path.len() != completed || state.paths.popular_path.len() != completed {
        return Err("path lengths do not match the number of completed rows".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tally::SeededTieBreaker;
    use ygg_assignment::NullGraph;
    use ygg_core::ShowConfig;
    use ygg_core::UserId;
    use ygg_core::ID;

    fn fresh_state() -> ShowState {
        ShowState::create_initial(ShowConfig::default(), ID::default())
    }

    fn join(conductor: &Conductor, state: &ShowState, seat: Option<&str>) -> (UserId, ShowState) {
        let user_id = UserId::default();
        let outcome = conductor.reduce(
            state,
            Command::Join {
                user_id,
                seat_id: seat.map(str::to_string),
                mode: crate::command::Mode::Audience,
                timestamp: 0,
            },
        );
        (user_id, outcome.state)
    }

    #[test]
    fn s1_perfect_balance_after_assign_factions() {
        let graph = NullGraph;
        let tie_breaker = SeededTieBreaker::new(1);
        let conductor = Conductor::new(&graph, &tie_breaker);
        let mut state = fresh_state();
        for _ in 0..12 {
            let (_, next) = join(&conductor, &state, None);
            state = next;
        }
        let outcome = conductor.reduce(&state, Command::AssignFactions { timestamp: 0 });
        assert!(outcome.error.is_none());
        let mut sizes = [0u32; FACTION_COUNT];
        for user in outcome.state.users.values() {
            sizes[user.faction.unwrap() as usize] += 1;
        }
        let mut sorted = sizes.to_vec();
        sorted.sort();
        assert_eq!(sorted, vec![3, 3, 3, 3]);
    }

    #[test]
    fn version_strictly_increases_on_accepted_commands() {
        let graph = NullGraph;
        let tie_breaker = SeededTieBreaker::new(1);
        let conductor = Conductor::new(&graph, &tie_breaker);
        let state = fresh_state();
        let (_, next) = join(&conductor, &state, None);
        assert!(next.version > state.version);
    }

    #[test]
    fn version_unchanged_on_rejected_command() {
        let graph = NullGraph;
        let tie_breaker = SeededTieBreaker::new(1);
        let conductor = Conductor::new(&graph, &tie_breaker);
        let state = fresh_state();
        // START_SHOW is invalid from lobby (must come from assigning).
        let outcome = conductor.reduce(&state, Command::StartShow { timestamp: 0 });
        assert!(outcome.error.is_some());
        assert_eq!(outcome.state.version, state.version);
    }

    #[test]
    fn vote_overwrite_leaves_one_vote_for_same_attempt() {
        let graph = NullGraph;
        let tie_breaker = SeededTieBreaker::new(1);
        let conductor = Conductor::new(&graph, &tie_breaker);
        let mut state = fresh_state();
        let mut user_ids = Vec::new();
        for _ in 0..4 {
            let (id, next) = join(&conductor, &state, None);
            user_ids.push(id);
            state = next;
        }
        state = conductor
            .reduce(&state, Command::AssignFactions { timestamp: 0 })
            .state;
        state = conductor.reduce(&state, Command::StartShow { timestamp: 0 }).state;
        // Drive audition to completion (index 0..3 then voting).
        for _ in 0..4 {
            state = conductor.reduce(&state, Command::AdvancePhase { timestamp: 0 }).state;
        }
        assert_eq!(state.current_row().unwrap().phase, RowPhase::Voting);

        let voter = user_ids[0];
        state = conductor
            .reduce(
                &state,
                Command::CastVote {
                    user_id: voter,
                    row_index: 0,
                    faction_vote: 0,
                    personal_vote: 0,
                    timestamp: 1,
                },
            )
            .state;
        state = conductor
            .reduce(
                &state,
                Command::CastVote {
                    user_id: voter,
                    row_index: 0,
                    faction_vote: 2,
                    personal_vote: 3,
                    timestamp: 2,
                },
            )
            .state;
        assert_eq!(state.current_row().unwrap().votes.len(), 1);
        let vote = state.current_row().unwrap().votes.get(&voter).unwrap();
        assert_eq!(vote.faction_vote, 2);
        assert_eq!(vote.personal_vote, 3);
    }

    #[test]
    fn pause_blocks_advance_and_resume_restores_phase() {
        let graph = NullGraph;
        let tie_breaker = SeededTieBreaker::new(1);
        let conductor = Conductor::new(&graph, &tie_breaker);
        let mut state = fresh_state();
        for _ in 0..4 {
            let (_, next) = join(&conductor, &state, None);
            state = next;
        }
        state = conductor
            .reduce(&state, Command::AssignFactions { timestamp: 0 })
            .state;
        state = conductor.reduce(&state, Command::StartShow { timestamp: 0 }).state;
        let running_phase = state.phase;

        state = conductor.reduce(&state, Command::Pause { timestamp: 0 }).state;
        assert_eq!(state.phase, ShowPhase::Paused);
        let outcome = conductor.reduce(&state, Command::AdvancePhase { timestamp: 0 });
        assert!(outcome.error.is_some());
        assert_eq!(outcome.state.phase, ShowPhase::Paused);

        state = conductor.reduce(&state, Command::Resume { timestamp: 0 }).state;
        assert_eq!(state.phase, running_phase);
    }

    #[test]
    fn restart_row_discards_votes_and_increments_attempts() {
        let graph = NullGraph;
        let tie_breaker = SeededTieBreaker::new(1);
        let conductor = Conductor::new(&graph, &tie_breaker);
        let mut state = fresh_state();
        let mut user_ids = Vec::new();
        for _ in 0..12 {
            let (id, next) = join(&conductor, &state, None);
            user_ids.push(id);
            state = next;
        }
        state = conductor
            .reduce(&state, Command::AssignFactions { timestamp: 0 })
            .state;
        state = conductor.reduce(&state, Command::StartShow { timestamp: 0 }).state;
        for _ in 0..4 {
            state = conductor.reduce(&state, Command::AdvancePhase { timestamp: 0 }).state;
        }
        for user_id in &user_ids {
            state = conductor
                .reduce(
                    &state,
                    Command::CastVote {
                        user_id: *user_id,
                        row_index: 0,
                        faction_vote: 0,
                        personal_vote: 0,
                        timestamp: 1,
                    },
                )
                .state;
        }
        assert_eq!(state.current_row().unwrap().votes.len(), 12);
        state = conductor.reduce(&state, Command::RestartRow { timestamp: 0 }).state;
        let row = state.current_row().unwrap();
        assert_eq!(row.phase, RowPhase::Audition);
        assert_eq!(row.attempts, 1);
        assert!(row.votes.is_empty());
    }

    #[test]
    fn reset_to_lobby_preserving_users_keeps_fig_tree_responses() {
        let graph = NullGraph;
        let tie_breaker = SeededTieBreaker::new(1);
        let conductor = Conductor::new(&graph, &tie_breaker);
        let mut state = fresh_state();
        let (user_id, next) = join(&conductor, &state, None);
        state = next;
        state = conductor
            .reduce(
                &state,
                Command::SubmitFigTree {
                    user_id,
                    text: "a rolling stone".to_string(),
                    timestamp: 0,
                },
            )
            .state;
        state = conductor
            .reduce(&state, Command::ResetToLobby { preserve_users: true, timestamp: 0 })
            .state;
        assert!(state.users.contains_key(&user_id));
        assert_eq!(
            state.fig_tree_responses.get(&user_id).map(String::as_str),
            Some("a rolling stone")
        );
        assert!(state.users[&user_id].faction.is_none());
        assert_eq!(
            state.personal_trees.get(&user_id).map(|t| t.fig_tree_response.as_str()),
            Some("a rolling stone")
        );
    }

    #[test]
    fn submit_fig_tree_populates_personal_tree() {
        let graph = NullGraph;
        let tie_breaker = SeededTieBreaker::new(1);
        let conductor = Conductor::new(&graph, &tie_breaker);
        let mut state = fresh_state();
        let (user_id, next) = join(&conductor, &state, None);
        state = next;
        state = conductor
            .reduce(
                &state,
                Command::SubmitFigTree {
                    user_id,
                    text: "a wandering root".to_string(),
                    timestamp: 0,
                },
            )
            .state;
        assert_eq!(
            state.personal_trees.get(&user_id).map(|t| t.fig_tree_response.as_str()),
            Some("a wandering root")
        );
    }

    #[test]
    fn path_lengths_match_completed_row_count() {
        let graph = NullGraph;
        let tie_breaker = SeededTieBreaker::new(1);
        let conductor = Conductor::new(&graph, &tie_breaker);
        let mut state = fresh_state();
        for _ in 0..12 {
            let (_, next) = join(&conductor, &state, None);
            state = next;
        }
        state = conductor
            .reduce(&state, Command::AssignFactions { timestamp: 0 })
            .state;
        state = conductor.reduce(&state, Command::StartShow { timestamp: 0 }).state;
        for _ in 0..4 {
            state = conductor.reduce(&state, Command::AdvancePhase { timestamp: 0 }).state;
        }
        // voting -> reveal -> coup_window -> complete (no votes cast).
        for _ in 0..3 {
            state = conductor.reduce(&state, Command::AdvancePhase { timestamp: 0 }).state;
        }
        assert_eq!(state.completed_row_count(), 1);
        assert_eq!(state.paths.faction_path.len(), 1);
        assert_eq!(state.paths.popular_path.len(), 1);
        assert_eq!(state.paths.faction_path[0], None);
    }

    #[test]
    fn coup_arms_multiplier_and_is_one_shot() {
        let graph = NullGraph;
        let tie_breaker = SeededTieBreaker::new(1);
        let conductor = Conductor::new(&graph, &tie_breaker);
        let mut state = fresh_state();
        let mut user_ids = Vec::new();
        for _ in 0..4 {
            let (id, next) = join(&conductor, &state, None);
            user_ids.push(id);
            state = next;
        }
        state = conductor
            .reduce(&state, Command::AssignFactions { timestamp: 0 })
            .state;
        state = conductor.reduce(&state, Command::StartShow { timestamp: 0 }).state;
        for _ in 0..4 {
            state = conductor.reduce(&state, Command::AdvancePhase { timestamp: 0 }).state;
        }
        // voting -> reveal -> coup_window
        state = conductor.reduce(&state, Command::AdvancePhase { timestamp: 0 }).state;
        state = conductor.reduce(&state, Command::AdvancePhase { timestamp: 0 }).state;
        assert_eq!(state.current_row().unwrap().phase, RowPhase::CoupWindow);

        let faction_0_members: Vec<_> = user_ids
            .iter()
            .copied()
            .filter(|u| state.users[u].faction == Some(0))
            .collect();
        for member in faction_0_members.iter().take((faction_0_members.len() + 1) / 2) {
            state = conductor
                .reduce(&state, Command::CoupVote { user_id: *member, timestamp: 0 })
                .state;
        }
        let faction0 = state.factions.iter().find(|f| f.id == 0).unwrap();
        assert!(faction0.coup_used);
        assert!(faction0.coup_multiplier.is_some());
    }
}
