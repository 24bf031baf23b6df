/// Errors surfaced by a [`crate::Store`] implementation.
///
/// Maps directly onto `ConductorError::PersistenceFailed` at the call site
/// (ygg-server's command loop) — this crate itself never touches
/// `ygg-conductor` types, keeping the dependency direction one-way.
#[derive(Debug)]
pub enum StoreError {
    NotFound,
    Serialization(String),
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "no snapshot found"),
            Self::Serialization(s) => write!(f, "serialization error: {s}"),
            Self::Backend(s) => write!(f, "backend error: {s}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
