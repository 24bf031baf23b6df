use ygg_core::FactionId;
use ygg_core::RowIndex;
use ygg_core::ShowState;
use ygg_core::UserId;

/// Who an [`Effect::Broadcast`] should reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastScope {
    All,
    Faction(FactionId),
    Connection(UserId),
}

/// Outbound intents produced by [`crate::Conductor::reduce`].
///
/// The reducer never performs I/O itself — it only describes what should
/// happen next; the server loop (ygg-server) is responsible for actually
/// persisting and fanning out broadcasts.
#[derive(Debug, Clone)]
pub enum Effect {
    /// The new state must be durably saved before any broadcast goes out
    /// (spec.md §4.5: "Every accepted command triggers a `saveState` effect
    /// before broadcast").
    Persist(ShowState),
    /// Send a state-sync message derived from the new state to `scope`.
    Broadcast(BroadcastScope),
    /// Play the tiebreaker animation for `row` on clients before the result
    /// is shown (spec.md §4.2/§4.4).
    TriggerTiebreakerAnimation { row: RowIndex },
    /// Ask every connection to reconnect (spec.md §4.3 `FORCE_RECONNECT_ALL`).
    ForceReconnectAll { reason: String },
}
