use ygg_core::OptionId;
use ygg_core::RowIndex;
use ygg_core::ShowState;
use ygg_core::Timestamp;
use ygg_core::UserId;

/// The role a connection authenticated as when it joined (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Audience,
    Projector,
    Controller,
}

/// The full Conductor command catalog (spec.md §4.3).
///
/// Every variant carries its own `timestamp` — the reducer never reads a
/// wall clock (spec.md §4.3: "no I/O, no clocks except `command.timestamp`").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Join {
        user_id: UserId,
        seat_id: Option<String>,
        mode: Mode,
        timestamp: Timestamp,
    },
    Leave {
        user_id: UserId,
        timestamp: Timestamp,
    },
    SubmitFigTree {
        user_id: UserId,
        text: String,
        timestamp: Timestamp,
    },
    AssignFactions {
        timestamp: Timestamp,
    },
    StartShow {
        timestamp: Timestamp,
    },
    AdvancePhase {
        timestamp: Timestamp,
    },
    CastVote {
        user_id: UserId,
        row_index: RowIndex,
        faction_vote: OptionId,
        personal_vote: OptionId,
        timestamp: Timestamp,
    },
    CoupVote {
        user_id: UserId,
        timestamp: Timestamp,
    },
    Pause {
        timestamp: Timestamp,
    },
    Resume {
        timestamp: Timestamp,
    },
    SkipRow {
        timestamp: Timestamp,
    },
    RestartRow {
        timestamp: Timestamp,
    },
    ForceFinale {
        timestamp: Timestamp,
    },
    ResetToLobby {
        preserve_users: bool,
        timestamp: Timestamp,
    },
    ImportState {
        state: Box<ShowState>,
        timestamp: Timestamp,
    },
    ForceReconnectAll {
        reason: String,
        timestamp: Timestamp,
    },
}

/// Commands restricted to controller connections (spec.md §6).
pub const CONTROLLER_ONLY: &[&str] = &[
    "ASSIGN_FACTIONS",
    "ADVANCE_PHASE",
    "PAUSE",
    "RESUME",
    "SKIP_ROW",
    "RESTART_ROW",
    "FORCE_FINALE",
    "RESET_TO_LOBBY",
    "IMPORT_STATE",
    "FORCE_RECONNECT_ALL",
];

impl Command {
    /// Name used for authorization checks and logging, matching the wire
    /// command tags in spec.md §4.3's catalog.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "JOIN",
            Self::Leave { .. } => "LEAVE",
            Self::SubmitFigTree { .. } => "SUBMIT_FIG_TREE",
            Self::AssignFactions { .. } => "ASSIGN_FACTIONS",
            Self::StartShow { .. } => "START_SHOW",
            Self::AdvancePhase { .. } => "ADVANCE_PHASE",
            Self::CastVote { .. } => "CAST_VOTE",
            Self::CoupVote { .. } => "COUP_VOTE",
            Self::Pause { .. } => "PAUSE",
            Self::Resume { .. } => "RESUME",
            Self::SkipRow { .. } => "SKIP_ROW",
            Self::RestartRow { .. } => "RESTART_ROW",
            Self::ForceFinale { .. } => "FORCE_FINALE",
            Self::ResetToLobby { .. } => "RESET_TO_LOBBY",
            Self::ImportState { .. } => "IMPORT_STATE",
            Self::ForceReconnectAll { .. } => "FORCE_RECONNECT_ALL",
        }
    }

    /// Whether this command may only be issued by a controller connection.
    pub fn requires_controller(&self) -> bool {
        CONTROLLER_ONLY.contains(&self.name())
    }
}
