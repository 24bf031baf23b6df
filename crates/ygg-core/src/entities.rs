use crate::FactionId;
use crate::OptionId;
use crate::Rational;
use crate::RowIndex;
use crate::ShowConfig;
use crate::UserId;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::collections::HashSet;

/// Milliseconds since the Unix epoch. Commands carry their own timestamp so
/// the Conductor reducer never reads a wall clock (spec.md §4.3).
pub type Timestamp = i64;

/// The show's top-level lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowPhase {
    Lobby,
    Assigning,
    Running,
    Paused,
    Finale,
    Ended,
}

/// A single row's sub-phase, driven solely by `ADVANCE_PHASE` (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowPhase {
    Pending,
    Audition,
    Voting,
    Reveal,
    CoupWindow,
    Complete,
}

/// An audience member, the projector connection, or the controller connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub seat_id: Option<String>,
    pub faction: Option<FactionId>,
    pub connected: bool,
    pub joined_at: Timestamp,
}

impl User {
    pub fn new(id: UserId, seat_id: Option<String>, joined_at: Timestamp) -> Self {
        Self {
            id,
            seat_id,
            faction: None,
            connected: true,
            joined_at,
        }
    }
}

/// One of the four audience factions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faction {
    pub id: FactionId,
    pub name: String,
    pub color: String,
    pub coup_used: bool,
    /// Cleared at each row boundary (spec.md §3).
    pub current_row_coup_votes: HashSet<UserId>,
    /// Set for the row immediately after a coup is armed; cleared on
    /// entering `complete` for that row.
    pub coup_multiplier: Option<Rational>,
}

impl Faction {
    pub fn new(id: FactionId, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
            coup_used: false,
            current_row_coup_votes: HashSet::new(),
            coup_multiplier: None,
        }
    }
}

/// A single user's ballot for the current row's `(rowIndex, attempt)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vote {
    pub user_id: UserId,
    pub row_index: RowIndex,
    pub faction_vote: OptionId,
    pub personal_vote: OptionId,
    pub timestamp: Timestamp,
    pub attempt: u32,
}

/// Per-faction coherence breakdown computed by the Tally (ygg-conductor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactionResult {
    pub faction_id: FactionId,
    pub chosen_option: OptionId,
    pub raw_coherence: (u64, u64),
    pub weighted_coherence: (u64, u64),
}

/// The outcome of a completed row's vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowResult {
    pub faction_winner_faction_id: Option<FactionId>,
    pub faction_winner_option_id: Option<OptionId>,
    pub popular_winner_option_id: Option<OptionId>,
    pub per_faction_results: Vec<FactionResult>,
    pub tiebreaker_was_used: bool,
    pub tied_faction_ids: Vec<FactionId>,
}

/// One branching decision point: four options, a sub-phase, and its votes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowState {
    pub index: RowIndex,
    pub label: String,
    pub phase: RowPhase,
    pub current_audition_index: u8,
    pub audition_complete: bool,
    pub votes: HashMap<UserId, Vote>,
    pub attempts: u32,
    pub result: Option<RowResult>,
}

impl RowState {
    pub fn pending(index: RowIndex, label: String) -> Self {
        Self {
            index,
            label,
            phase: RowPhase::Pending,
            current_audition_index: 0,
            audition_complete: false,
            votes: HashMap::new(),
            attempts: 0,
            result: None,
        }
    }
}

/// A user's private sequence of personal-vote options plus their fig-tree
/// response (spec.md Glossary: "personal tree").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalTree {
    pub user_id: UserId,
    pub path: Vec<Option<OptionId>>,
    pub fig_tree_response: String,
}

impl PersonalTree {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            path: Vec::new(),
            fig_tree_response: String::new(),
        }
    }
}

/// The faction path and popular path accumulated across completed rows.
///
/// `None` entries record a row completed with no countable vote (spec.md §9
/// Open Question #1, resolved in SPEC_FULL.md §9 in favor of a sentinel
/// rather than a deterministic fallback option).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paths {
    pub faction_path: Vec<Option<OptionId>>,
    pub popular_path: Vec<Option<OptionId>>,
}

/// The show's complete authoritative state, owned exclusively by the
/// Conductor (spec.md §3 invariant 8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShowState {
    pub id: crate::ID<crate::Show>,
    pub version: u64,
    pub phase: ShowPhase,
    pub config: ShowConfig,
    pub users: HashMap<UserId, User>,
    pub factions: Vec<Faction>,
    pub rows: Vec<RowState>,
    pub current_row_index: RowIndex,
    pub paths: Paths,
    pub personal_trees: HashMap<UserId, PersonalTree>,
    pub fig_tree_responses: HashMap<UserId, String>,
    pub pause_prior_phase: Option<ShowPhase>,
}

impl ShowState {
    /// Creates the lobby-phase initial state for a new show (spec.md §3
    /// "Lifecycle": "created by `createInitialState(config, id)`").
    pub fn create_initial(config: ShowConfig, id: crate::ID<crate::Show>) -> Self {
        let rows = (0..config.row_count)
            .map(|i| RowState::pending(i, config.label_for(i)))
            .collect();
        Self {
            id,
            version: 0,
            phase: ShowPhase::Lobby,
            config,
            users: HashMap::new(),
            factions: Vec::new(),
            rows,
            current_row_index: 0,
            paths: Paths::default(),
            personal_trees: HashMap::new(),
            fig_tree_responses: HashMap::new(),
            pause_prior_phase: None,
        }
    }

    pub fn current_row(&self) -> Option<&RowState> {
        self.rows.get(self.current_row_index)
    }
    pub fn current_row_mut(&mut self) -> Option<&mut RowState> {
        self.rows.get_mut(self.current_row_index)
    }
    pub fn completed_row_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.phase == RowPhase::Complete)
            .count()
    }
}

impl crate::Unique<crate::Show> for ShowState {
    fn id(&self) -> crate::ID<crate::Show> {
        self.id
    }
}
