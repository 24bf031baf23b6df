/// Error kinds returned by [`crate::Conductor::reduce`] (spec.md §7).
///
/// These are kinds, not exceptions: every variant maps to a wire `error`
/// message's `code` field one-to-one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConductorError {
    UnknownUser,
    WrongPhase,
    StaleRow,
    InvalidOption,
    AlreadyVoted,
    CoupAlreadyUsed,
    NotAuthorized,
    MalformedCommand(String),
    ImportValidationFailed(String),
    PersistenceFailed(String),
}

impl std::fmt::Display for ConductorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownUser => write!(f, "unknown user"),
            Self::WrongPhase => write!(f, "command not valid in the current phase"),
            Self::StaleRow => write!(f, "command targets a row that is no longer current"),
            Self::InvalidOption => write!(f, "option id does not belong to this row"),
            Self::AlreadyVoted => write!(f, "user already voted this attempt under strict policy"),
            Self::CoupAlreadyUsed => write!(f, "faction has already used its coup"),
            Self::NotAuthorized => write!(f, "connection is not authorized to issue this command"),
            Self::MalformedCommand(s) => write!(f, "malformed command: {s}"),
            Self::ImportValidationFailed(s) => write!(f, "imported state failed validation: {s}"),
            Self::PersistenceFailed(s) => write!(f, "persistence failed: {s}"),
        }
    }
}

impl std::error::Error for ConductorError {}

/// Code string sent to clients in the wire `error { code, message }` message.
impl ConductorError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownUser => "UNKNOWN_USER",
            Self::WrongPhase => "WRONG_PHASE",
            Self::StaleRow => "STALE_ROW",
            Self::InvalidOption => "INVALID_OPTION",
            Self::AlreadyVoted => "ALREADY_VOTED",
            Self::CoupAlreadyUsed => "COUP_ALREADY_USED",
            Self::NotAuthorized => "NOT_AUTHORIZED",
            Self::MalformedCommand(_) => "MALFORMED_COMMAND",
            Self::ImportValidationFailed(_) => "IMPORT_VALIDATION_FAILED",
            Self::PersistenceFailed(_) => "PERSISTENCE_FAILED",
        }
    }
}
