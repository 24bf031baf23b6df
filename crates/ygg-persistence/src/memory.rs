use std::collections::HashMap;

use tokio::sync::Mutex;
use ygg_core::Show;
use ygg_core::ShowState;
use ygg_core::User;
use ygg_core::UserId;
use ygg_core::Vote;
use ygg_core::ID;

use crate::error::StoreError;
use crate::store::Store;

/// Cheap in-process [`Store`] backing unit tests (no feature flag needed) —
/// matches the teacher's habit of testing pure logic without a live
/// Postgres instance.
#[derive(Default)]
pub struct InMemoryStore {
    snapshots: Mutex<HashMap<ID<Show>, ShowState>>,
    latest: Mutex<Option<ID<Show>>>,
    users: Mutex<Vec<(ID<Show>, User)>>,
    votes: Mutex<Vec<(ID<Show>, Vote)>>,
    fig_tree_responses: Mutex<Vec<(ID<Show>, UserId, String)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every `save_user` record, for introspection in tests.
    pub async fn recorded_users(&self) -> Vec<User> {
        self.users.lock().await.iter().map(|(_, u)| u.clone()).collect()
    }
    /// Snapshot of every `save_vote` record, for introspection in tests.
    pub async fn recorded_votes(&self) -> Vec<Vote> {
        self.votes.lock().await.iter().map(|(_, v)| *v).collect()
    }
    /// Snapshot of every `save_fig_tree_response` record, for introspection
    /// in tests.
    pub async fn recorded_fig_tree_responses(&self) -> Vec<(UserId, String)> {
        self.fig_tree_responses
            .lock()
            .await
            .iter()
            .map(|(_, u, t)| (*u, t.clone()))
            .collect()
    }
}

#[async_trait::async_trait]
impl Store for InMemoryStore {
    async fn save_state(&self, state: &ShowState) -> Result<(), StoreError> {
        self.snapshots.lock().await.insert(state.id, state.clone());
        *self.latest.lock().await = Some(state.id);
        Ok(())
    }

    async fn load_state(&self, show_id: ID<Show>) -> Result<Option<ShowState>, StoreError> {
        Ok(self.snapshots.lock().await.get(&show_id).cloned())
    }

    async fn get_latest_show(&self) -> Result<Option<ShowState>, StoreError> {
        let Some(show_id) = *self.latest.lock().await else {
            return Ok(None);
        };
        Ok(self.snapshots.lock().await.get(&show_id).cloned())
    }

    async fn save_user(&self, show_id: ID<Show>, user: &User) -> Result<(), StoreError> {
        self.users.lock().await.push((show_id, user.clone()));
        Ok(())
    }

    async fn save_vote(&self, show_id: ID<Show>, vote: &Vote) -> Result<(), StoreError> {
        self.votes.lock().await.push((show_id, *vote));
        Ok(())
    }

    async fn save_fig_tree_response(
        &self,
        show_id: ID<Show>,
        user_id: UserId,
        text: &str,
    ) -> Result<(), StoreError> {
        self.fig_tree_responses
            .lock()
            .await
            .push((show_id, user_id, text.to_string()));
        Ok(())
    }
}
