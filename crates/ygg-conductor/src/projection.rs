use std::collections::HashMap;

use ygg_core::FactionId;
use ygg_core::OptionId;
use ygg_core::Paths;
use ygg_core::RowIndex;
use ygg_core::RowPhase;
use ygg_core::RowResult;
use ygg_core::RowState;
use ygg_core::ShowPhase;
use ygg_core::ShowState;
use ygg_core::UserId;
use ygg_core::Vote;
use ygg_core::FACTION_COUNT;

/// The publicly-visible slice of a [`RowState`] — never includes individual
/// votes, only the row's phase and (once tallied) its result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RowPublicState {
    pub index: RowIndex,
    pub label: String,
    pub phase: RowPhase,
    pub current_audition_index: u8,
    pub audition_complete: bool,
    pub vote_count: usize,
    pub attempts: u32,
    pub result: Option<RowResult>,
}

impl From<&RowState> for RowPublicState {
    fn from(row: &RowState) -> Self {
        Self {
            index: row.index,
            label: row.label.clone(),
            phase: row.phase,
            current_audition_index: row.current_audition_index,
            audition_complete: row.audition_complete,
            vote_count: row.votes.len(),
            attempts: row.attempts,
            result: row.result.clone(),
        }
    }
}

/// A faction's coup progress, visible only to its own members (spec.md §9
/// "Hidden information").
#[derive(Debug, Clone, serde::Serialize)]
pub struct CoupMeter {
    pub votes_cast: usize,
    pub faction_size: usize,
    pub threshold: f64,
    pub coup_used: bool,
}

/// What one audience handset sees (spec.md §4.4).
#[derive(Debug, Clone, serde::Serialize)]
pub struct AudienceView {
    pub version: u64,
    pub show_phase: ShowPhase,
    pub current_row_index: RowIndex,
    pub row: Option<RowPublicState>,
    pub my_faction: Option<FactionId>,
    pub my_vote_this_row: Option<Vote>,
    pub my_coup_meter: Option<CoupMeter>,
    pub my_personal_path: Vec<Option<OptionId>>,
}

/// What the projector display sees (spec.md §4.4): never per-user votes or
/// coup meters, but exposes the tiebreaker trigger via the row's result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProjectorView {
    pub version: u64,
    pub show_phase: ShowPhase,
    pub current_row_index: RowIndex,
    pub rows: Vec<RowPublicState>,
    pub paths: Paths,
    pub row_labels: Vec<String>,
    pub row_count: usize,
    pub user_count: usize,
}

/// What the performer's controller sees: everything, including fig-tree
/// text and per-faction coup state (spec.md §4.4: "full state sans fig-tree
/// text privacy").
#[derive(Debug, Clone, serde::Serialize)]
pub struct ControllerView {
    pub version: u64,
    pub state: ShowState,
    pub faction_counts: [usize; FACTION_COUNT],
    pub faction_coup_used: [bool; FACTION_COUNT],
    pub current_row_vote_count: usize,
    pub seat_map: HashMap<String, UserId>,
}

/// Incremental update sent when a client's `lastVersion` is exactly one
/// behind the authoritative state (spec.md §4.4/§4.6). Any larger gap forces
/// a full snapshot — see [`delta`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct Delta {
    pub from_version: u64,
    pub to_version: u64,
    pub show_phase: ShowPhase,
    pub current_row_index: RowIndex,
    pub current_row: Option<RowPublicState>,
    pub paths: Paths,
}

/// Derives role-specific client views from the authoritative state.
///
/// A pure function over `&ShowState`, mirroring the teacher's
/// `Perfect::erase(&self, hero) -> Partial` information-erasure pattern:
/// every view is produced by stripping fields from the one true state, never
/// hand-maintained separately.
pub struct Projection;

impl Projection {
    pub fn audience_view(state: &ShowState, user_id: UserId) -> Option<AudienceView> {
        let user = state.users.get(&user_id)?;
        let row = state.current_row();
        let my_vote_this_row = row.and_then(|r| r.votes.get(&user_id).copied());
        let my_coup_meter = user.faction.and_then(|faction_id| {
            let faction = state.factions.iter().find(|f| f.id == faction_id)?;
            let faction_size = state
                .users
                .values()
                .filter(|u| u.faction == Some(faction_id))
                .count();
            Some(CoupMeter {
                votes_cast: faction.current_row_coup_votes.len(),
                faction_size,
                threshold: state.config.coup.threshold,
                coup_used: faction.coup_used,
            })
        });
        let my_personal_path = state
            .personal_trees
            .get(&user_id)
            .map(|t| t.path.clone())
            .unwrap_or_default();

        Some(AudienceView {
            version: state.version,
            show_phase: state.phase,
            current_row_index: state.current_row_index,
            row: row.map(RowPublicState::from),
            my_faction: user.faction,
            my_vote_this_row,
            my_coup_meter,
            my_personal_path,
        })
    }

    pub fn projector_view(state: &ShowState) -> ProjectorView {
        ProjectorView {
            version: state.version,
            show_phase: state.phase,
            current_row_index: state.current_row_index,
            rows: state.rows.iter().map(RowPublicState::from).collect(),
            paths: state.paths.clone(),
            row_labels: state.config.row_labels.clone(),
            row_count: state.config.row_count,
            user_count: state.users.len(),
        }
    }

    pub fn controller_view(state: &ShowState) -> ControllerView {
        let mut faction_counts = [0usize; FACTION_COUNT];
        let mut seat_map = HashMap::new();
        for user in state.users.values() {
            if let Some(f) = user.faction {
                faction_counts[f as usize] += 1;
            }
            if let Some(seat) = &user.seat_id {
                seat_map.insert(seat.clone(), user.id);
            }
        }
        let mut faction_coup_used = [false; FACTION_COUNT];
        for faction in &state.factions {
            faction_coup_used[faction.id as usize] = faction.coup_used;
        }
        let current_row_vote_count = state.current_row().map(|r| r.votes.len()).unwrap_or(0);

        ControllerView {
            version: state.version,
            state: state.clone(),
            faction_counts,
            faction_coup_used,
            current_row_vote_count,
            seat_map,
        }
    }

    /// Returns `None` (meaning: send a full snapshot) unless `full` is
    /// exactly one version ahead of `previous` and the client's
    /// `since_version` matches `previous.version` — we only retain a
    /// current/previous pair, not a full history (SPEC_FULL.md §4.4).
    pub fn delta(previous: &ShowState, full: &ShowState, since_version: u64) -> Option<Delta> {
        if since_version != previous.version || full.version != previous.version + 1 {
            return None;
        }
        Some(Delta {
            from_version: previous.version,
            to_version: full.version,
            show_phase: full.phase,
            current_row_index: full.current_row_index,
            current_row: full.current_row().map(RowPublicState::from),
            paths: full.paths.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ygg_core::Faction;
    use ygg_core::ShowConfig;
    use ygg_core::ID;

    fn sample_state() -> ShowState {
        let mut state = ShowState::create_initial(ShowConfig::default(), ID::default());
        let user_id = UserId::default();
        let mut user = ygg_core::User::new(user_id, Some("A1".to_string()), 0);
        user.faction = Some(0);
        state.users.insert(user_id, user);
        state.factions.push(Faction::new(0, "Ember", "#d64545"));
        state
    }

    #[test]
    fn audience_view_hides_coup_meter_from_non_members() {
        let mut state = sample_state();
        let other_user = UserId::default();
        let mut other = ygg_core::User::new(other_user, None, 0);
        other.faction = None;
        state.users.insert(other_user, other);

        let view = Projection::audience_view(&state, other_user).unwrap();
        assert!(view.my_coup_meter.is_none());
    }

    #[test]
    fn audience_view_exposes_own_coup_meter() {
        let state = sample_state();
        let (&user_id, _) = state.users.iter().find(|(_, u)| u.faction == Some(0)).unwrap();
        let view = Projection::audience_view(&state, user_id).unwrap();
        assert!(view.my_coup_meter.is_some());
    }

    #[test]
    fn audience_view_unknown_user_returns_none() {
        let state = sample_state();
        assert!(Projection::audience_view(&state, UserId::default()).is_none());
    }

    #[test]
    fn projector_view_has_no_per_user_votes() {
        let state = sample_state();
        let view = Projection::projector_view(&state);
        assert_eq!(view.user_count, state.users.len());
    }

    #[test]
    fn delta_none_when_gap_exceeds_one_version() {
        let mut previous = sample_state();
        previous.version = 5;
        let mut full = previous.clone();
        full.version = 8;
        assert!(Projection::delta(&previous, &full, 5).is_none());
    }

    #[test]
    fn delta_some_when_exactly_one_version_behind() {
        let mut previous = sample_state();
        previous.version = 5;
        let mut full = previous.clone();
        full.version = 6;
        let delta = Projection::delta(&previous, &full, 5).unwrap();
        assert_eq!(delta.from_version, 5);
        assert_eq!(delta.to_version, 6);
    }
}
