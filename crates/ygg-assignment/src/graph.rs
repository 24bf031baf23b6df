use std::collections::HashMap;

/// Seat-adjacency lookup used to softly discourage seating same-faction
/// neighbors next to each other.
///
/// Implementors only need to answer "who sits next to this seat" — the
/// assignment algorithm handles everything else.
pub trait AdjacencyGraph {
    fn neighbors(&self, seat_id: &str) -> Vec<String>;
}

/// No-seat deployments: every seat has zero neighbors.
///
/// Used when the venue has no fixed seating (standing room, or seats are
/// simply not tracked). Adjacency contributes nothing to assignment in this
/// case — balance remains the only constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGraph;

impl AdjacencyGraph for NullGraph {
    fn neighbors(&self, _seat_id: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Gridded theater-row adjacency: left, right, front (same column, row
/// above), and back (same column, row below) neighbors.
///
/// Seat labels are `<rowLetter><columnNumber>`, e.g. `"C12"`. Malformed
/// labels are simply seatless for adjacency purposes — they are still
/// assigned a faction by [`crate::assign_factions`], but never surface as
/// anyone else's neighbor.
#[derive(Debug, Clone, Default)]
pub struct TheaterRowsGraph;

impl TheaterRowsGraph {
    /// Splits a seat label into its row letter and column number.
    ///
    /// Returns `None` for labels that don't end in a parseable run of
    /// digits preceded by a non-empty alphabetic run.
    pub fn parse_seat(seat_id: &str) -> Option<(char, u32)> {
        let row = seat_id.chars().next()?;
        if !row.is_alphabetic() {
            return None;
        }
        let digits: String = seat_id.chars().skip(1).collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let column: u32 = digits.parse().ok()?;
        Some((row, column))
    }
}

impl AdjacencyGraph for TheaterRowsGraph {
    fn neighbors(&self, seat_id: &str) -> Vec<String> {
        let Some((row, column)) = Self::parse_seat(seat_id) else {
            return Vec::new();
        };
        let row_index = row as u32;
        let mut neighbors = Vec::with_capacity(4);
        if column > 1 {
            neighbors.push(format!("{}{}", row, column - 1));
        }
        neighbors.push(format!("{}{}", row, column + 1));
        if row_index > 'A' as u32 {
            let front_row = char::from_u32(row_index - 1).unwrap();
            neighbors.push(format!("{}{}", front_row, column));
        }
        let back_row = char::from_u32(row_index + 1).unwrap();
        neighbors.push(format!("{}{}", back_row, column));
        neighbors
    }
}

/// Counts how many of `seat_id`'s neighbors already belong to `faction`,
/// according to the current (possibly partial) assignment map.
pub(crate) fn neighbor_count_in_faction(
    graph: &dyn AdjacencyGraph,
    seat_id: Option<&str>,
    faction: u8,
    assigned: &HashMap<String, u8>,
) -> usize {
    let Some(seat_id) = seat_id else {
        return 0;
    };
    graph
        .neighbors(seat_id)
        .iter()
        .filter(|n| assigned.get(*n) == Some(&faction))
        .count()
}
