use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;
use ygg_conductor::BroadcastScope;
use ygg_conductor::Mode;
use ygg_core::ShowState;
use ygg_core::UserId;

/// Identity of one live WebSocket connection, scoped to this process only —
/// never persisted, never sent to a client (spec.md §4.6).
pub type ConnectionId = uuid::Uuid;

struct Connection {
    user_id: Option<UserId>,
    mode: Mode,
    last_sent_version: u64,
    tx: UnboundedSender<String>,
}

/// Tracks every live connection's identity, role, and outbound channel.
///
/// Grounded on the teacher's `Casino` (`crates/hosting/src/casino.rs`),
/// generalized from one `Tx`/`Rx` pair per room to a fan-out registry of
/// many simultaneous connections against a single show.
#[derive(Default)]
pub struct Registry {
    connections: HashMap<ConnectionId, Connection>,
}

impl Registry {
    pub fn register(
        &mut self,
        id: ConnectionId,
        user_id: Option<UserId>,
        mode: Mode,
        tx: UnboundedSender<String>,
    ) {
        self.connections.insert(
            id,
            Connection {
                user_id,
                mode,
                last_sent_version: 0,
                tx,
            },
        );
    }

    /// Called once a `JOIN` resolves the connection's stable user id (the
    /// gateway may not know it up front if the client presented none).
    pub fn bind_user(&mut self, id: ConnectionId, user_id: UserId) {
        if let Some(connection) = self.connections.get_mut(&id) {
            connection.user_id = Some(user_id);
        }
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<UserId> {
        self.connections.remove(&id).and_then(|c| c.user_id)
    }

    pub fn mode_of(&self, id: ConnectionId) -> Option<Mode> {
        self.connections.get(&id).map(|c| c.mode)
    }

    pub fn user_of(&self, id: ConnectionId) -> Option<UserId> {
        self.connections.get(&id).and_then(|c| c.user_id)
    }

    pub fn last_sent_version(&self, id: ConnectionId) -> u64 {
        self.connections.get(&id).map(|c| c.last_sent_version).unwrap_or(0)
    }

    pub fn mark_sent(&mut self, id: ConnectionId, version: u64) {
        if let Some(connection) = self.connections.get_mut(&id) {
            connection.last_sent_version = version;
        }
    }

    pub fn send(&self, id: ConnectionId, message: &str) {
        if let Some(connection) = self.connections.get(&id) {
            let _ = connection.tx.send(message.to_string());
        }
    }

    pub fn all_ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().copied().collect()
    }

    /// Connections a [`BroadcastScope`] reaches, given current faction
    /// membership (spec.md §9 "Hidden information": coup meters only ever
    /// reach their own faction's audience members, plus the controller,
    /// which sees everything).
    pub fn targets(&self, scope: BroadcastScope, state: &ShowState) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|(_, connection)| match scope {
                BroadcastScope::All => true,
                BroadcastScope::Connection(user_id) => connection.user_id == Some(user_id),
                BroadcastScope::Faction(faction_id) => match connection.mode {
                    Mode::Controller => true,
                    Mode::Projector => false,
                    Mode::Audience => connection
                        .user_id
                        .and_then(|u| state.users.get(&u))
                        .and_then(|u| u.faction)
                        == Some(faction_id),
                },
            })
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;
    use ygg_core::ShowConfig;
    use ygg_core::User;
    use ygg_core::ID;

    fn state_with_user(user_id: UserId, faction: Option<u8>) -> ShowState {
        let mut state = ShowState::create_initial(ShowConfig::default(), ID::default());
        let mut user = User::new(user_id, None, 0);
        user.faction = faction;
        state.users.insert(user_id, user);
        state
    }

    #[test]
    fn faction_scope_excludes_other_factions_and_projector() {
        let mut registry = Registry::default();
        let (tx, _rx) = unbounded_channel();
        let member = UserId::default();
        let outsider = UserId::default();
        let state = state_with_user(member, Some(0));

        registry.register(ConnectionId::new_v4(), Some(member), Mode::Audience, tx.clone());
        registry.register(ConnectionId::new_v4(), Some(outsider), Mode::Audience, tx.clone());
        registry.register(ConnectionId::new_v4(), None, Mode::Projector, tx.clone());
        registry.register(ConnectionId::new_v4(), None, Mode::Controller, tx);

        let targets = registry.targets(BroadcastScope::Faction(0), &state);
        assert_eq!(targets.len(), 2); // member + controller
    }

    #[test]
    fn connection_scope_reaches_exactly_one_user() {
        let mut registry = Registry::default();
        let (tx, _rx) = unbounded_channel();
        let user_id = UserId::default();
        let id = ConnectionId::new_v4();
        registry.register(id, Some(user_id), Mode::Audience, tx);
        let state = state_with_user(user_id, None);

        let targets = registry.targets(BroadcastScope::Connection(user_id), &state);
        assert_eq!(targets, vec![id]);
    }
}
