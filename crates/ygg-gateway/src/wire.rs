use ygg_conductor::projection::AudienceView;
use ygg_conductor::projection::ControllerView;
use ygg_conductor::projection::Delta;
use ygg_conductor::projection::ProjectorView;
use ygg_conductor::Command;
use ygg_conductor::ConductorError;
use ygg_conductor::Mode;
use ygg_core::UserId;

/// Client → server messages (spec.md §6).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        user_id: Option<UserId>,
        show_id: String,
        seat_id: Option<String>,
        mode: Mode,
        last_version: Option<u64>,
    },
    Command {
        command: Command,
    },
    Pong,
}

/// The view variant carried by a `state_sync` message, chosen per the
/// connection's `mode` (spec.md §4.4).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum View {
    Audience(AudienceView),
    Projector(ProjectorView),
    Controller(ControllerView),
}

/// Server → client messages (spec.md §6).
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    StateSync {
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<View>,
        #[serde(skip_serializing_if = "Option::is_none")]
        delta: Option<Delta>,
        version: u64,
        snapshot: bool,
    },
    Ping,
    ForceReconnect {
        reason: String,
    },
    /// Play the tiebreaker animation for `row` before its result is shown
    /// (spec.md §4.2/§4.4). Clients that don't animate may ignore it.
    TiebreakerAnimation {
        row: usize,
    },
    Error {
        code: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn full_snapshot(state: View, version: u64) -> Self {
        Self::StateSync {
            state: Some(state),
            delta: None,
            version,
            snapshot: true,
        }
    }
    pub fn delta_sync(delta: Delta) -> Self {
        let version = delta.to_version;
        Self::StateSync {
            state: None,
            delta: Some(delta),
            version,
            snapshot: false,
        }
    }
    pub fn ping() -> Self {
        Self::Ping
    }
    pub fn force_reconnect(reason: impl Into<String>) -> Self {
        Self::ForceReconnect {
            reason: reason.into(),
        }
    }
    pub fn tiebreaker_animation(row: usize) -> Self {
        Self::TiebreakerAnimation { row }
    }
    pub fn error(error: &ConductorError) -> Self {
        Self::Error {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("serialize server message")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_round_trips_through_json() {
        let message = ServerMessage::error(&ConductorError::UnknownUser);
        let json = message.to_json();
        assert!(json.contains("UNKNOWN_USER"));
        assert!(json.contains("\"type\":\"error\""));
    }

    #[test]
    fn ping_serializes_without_payload_fields() {
        let json = ServerMessage::ping().to_json();
        assert_eq!(json, "{\"type\":\"ping\"}");
    }

    #[test]
    fn join_message_decodes_from_json() {
        let json = r#"{"type":"join","user_id":null,"show_id":"default-show","seat_id":null,"mode":"audience","last_version":null}"#;
        let parsed: ClientMessage = serde_json::from_str(json).unwrap();
        matches!(parsed, ClientMessage::Join { .. });
    }
}
