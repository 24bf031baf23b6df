use crate::graph::neighbor_count_in_faction;
use crate::AdjacencyGraph;
use std::collections::HashMap;
use ygg_core::FactionId;
use ygg_core::UserId;
use ygg_core::FACTION_COUNT;

/// One joined user as seen by the assignment algorithm: identity plus an
/// optional seat label for adjacency scoring.
#[derive(Debug, Clone)]
pub struct Joined {
    pub user_id: UserId,
    pub seat_id: Option<String>,
}

/// Target size for each of the four factions, given `n` joined users.
///
/// `base = floor(n / 4)`; the first `r = n mod 4` factions (by id) get
/// `base + 1`, the rest get `base` (spec.md §4.1).
fn target_sizes(n: usize) -> [usize; FACTION_COUNT] {
    let base = n / FACTION_COUNT;
    let remainder = n % FACTION_COUNT;
    let mut sizes = [base; FACTION_COUNT];
    for size in sizes.iter_mut().take(remainder) {
        *size += 1;
    }
    sizes
}

/// Partitions all joined users into four balanced factions.
///
/// Balance is a hard constraint: the returned map always produces exact
/// target sizes. Adjacency (avoiding same-faction neighbors) is a soft,
/// best-effort objective broken by greedy local assignment — ties on
/// adjacency score are broken by the smallest faction id (spec.md §4.1,
/// testable property 1).
pub fn assign_factions(
    users: &[Joined],
    graph: &dyn AdjacencyGraph,
) -> HashMap<UserId, FactionId> {
    let mut ordered = users.to_vec();
    ordered.sort_by_key(|u| u.user_id);

    let targets = target_sizes(ordered.len());
    let mut sizes = [0usize; FACTION_COUNT];
    let mut assigned_by_seat: HashMap<String, u8> = HashMap::new();
    let mut result = HashMap::with_capacity(ordered.len());

    for joined in &ordered {
        let faction = (0..FACTION_COUNT as u8)
            .filter(|&f| sizes[f as usize] < targets[f as usize])
            .min_by_key(|&f| {
                neighbor_count_in_faction(graph, joined.seat_id.as_deref(), f, &assigned_by_seat)
            })
            .expect("target sizes always sum to n, so a feasible faction always exists");

        sizes[faction as usize] += 1;
        if let Some(seat) = &joined.seat_id {
            assigned_by_seat.insert(seat.clone(), faction);
        }
        result.insert(joined.user_id, faction);
    }
    result
}

/// Assigns a single latecomer after the show has already started.
///
/// Picks from the faction(s) whose current size equals the overall minimum,
/// tiebreaking first by lowest neighbor count for the latecomer's seat, then
/// by lowest faction id (spec.md §4.1, testable property 2).
pub fn assign_latecomer(
    latecomer: &Joined,
    existing: &[(UserId, Option<String>, FactionId)],
    graph: &dyn AdjacencyGraph,
) -> FactionId {
    let mut sizes = [0usize; FACTION_COUNT];
    let mut assigned_by_seat: HashMap<String, u8> = HashMap::new();
    for (_, seat, faction) in existing {
        sizes[*faction as usize] += 1;
        if let Some(seat) = seat {
            assigned_by_seat.insert(seat.clone(), *faction);
        }
    }
    let min_size = *sizes.iter().min().unwrap_or(&0);

    (0..FACTION_COUNT as u8)
        .filter(|&f| sizes[f as usize] == min_size)
        .min_by_key(|&f| {
            neighbor_count_in_faction(
                graph,
                latecomer.seat_id.as_deref(),
                f,
                &assigned_by_seat,
            )
        })
        .expect("FACTION_COUNT is never zero")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullGraph;
    use crate::TheaterRowsGraph;

    fn user(id: UserId, seat: Option<&str>) -> Joined {
        Joined {
            user_id: id,
            seat_id: seat.map(str::to_string),
        }
    }

    fn sizes_of(assignment: &HashMap<UserId, FactionId>) -> Vec<usize> {
        let mut sizes = [0usize; FACTION_COUNT];
        for faction in assignment.values() {
            sizes[*faction as usize] += 1;
        }
        let mut v = sizes.to_vec();
        v.sort();
        v
    }

    #[test]
    fn perfect_balance_twelve_users() {
        let users: Vec<Joined> = (0..12).map(|_| user(UserId::default(), None)).collect();
        let assignment = assign_factions(&users, &NullGraph);
        assert_eq!(assignment.len(), 12);
        assert_eq!(sizes_of(&assignment), vec![3, 3, 3, 3]);
    }

    #[test]
    fn balance_holds_for_any_n() {
        for n in 0..=40usize {
            let users: Vec<Joined> = (0..n).map(|_| user(UserId::default(), None)).collect();
            let assignment = assign_factions(&users, &NullGraph);
            assert_eq!(assignment.len(), n);
            let sizes = sizes_of(&assignment);
            assert_eq!(sizes.iter().sum::<usize>(), n);
            assert!(sizes.iter().max().unwrap() - sizes.iter().min().unwrap() <= 1);
        }
    }

    #[test]
    fn seatless_users_still_assigned() {
        let users = vec![user(UserId::default(), None), user(UserId::default(), None)];
        let assignment = assign_factions(&users, &TheaterRowsGraph);
        assert_eq!(assignment.len(), 2);
    }

    #[test]
    fn latecomer_goes_to_unique_smallest() {
        let a = UserId::default();
        let b = UserId::default();
        let c = UserId::default();
        let existing = vec![(a, None, 0u8), (b, None, 1u8), (c, None, 2u8)];
        let latecomer = user(UserId::default(), None);
        let faction = assign_latecomer(&latecomer, &existing, &NullGraph);
        // sizes: [1,1,1,0] -> unique minimum is faction 3
        assert_eq!(faction, 3);
    }

    #[test]
    fn latecomer_tiebreak_prefers_fewer_neighbors_then_lowest_id() {
        let a = UserId::default();
        let existing = vec![(a, Some("B5".to_string()), 0u8)];
        // factions 1,2,3 are all size 0 (tied minimum); none neighbor A5,
        // so the final tiebreak is lowest faction id.
        let latecomer = user(UserId::default(), Some("A5"));
        let faction = assign_latecomer(&latecomer, &existing, &TheaterRowsGraph);
        assert_eq!(faction, 1);
    }
}
