use ygg_core::Show;
use ygg_core::ShowState;
use ygg_core::User;
use ygg_core::UserId;
use ygg_core::Vote;
use ygg_core::ID;

use crate::error::StoreError;

/// Durable ordered log plus latest-snapshot store (spec.md §4.5).
///
/// `save_state` is the only operation the Conductor's command loop waits on
/// before broadcasting (spec.md §4.5: "Every accepted command triggers a
/// `saveState` effect before broadcast"); the three `save_*` append-only
/// calls are fire-and-forget analytics writes the Conductor never reads back.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Atomically replaces the prior snapshot for `state.id`. Must commit or
    /// leave the prior snapshot intact on failure.
    async fn save_state(&self, state: &ShowState) -> Result<(), StoreError>;
    /// Reconstructs the full `ShowState` for `show_id`, containers and all.
    async fn load_state(&self, show_id: ID<Show>) -> Result<Option<ShowState>, StoreError>;
    /// The most recently saved show, for process restart (spec.md §6).
    async fn get_latest_show(&self) -> Result<Option<ShowState>, StoreError>;
    async fn save_user(&self, show_id: ID<Show>, user: &User) -> Result<(), StoreError>;
    async fn save_vote(&self, show_id: ID<Show>, vote: &Vote) -> Result<(), StoreError>;
    async fn save_fig_tree_response(
        &self,
        show_id: ID<Show>,
        user_id: UserId,
        text: &str,
    ) -> Result<(), StoreError>;
}
