use std::sync::Arc;

use tokio_postgres::Client;
use ygg_core::Show;
use ygg_core::ShowState;
use ygg_core::User;
use ygg_core::UserId;
use ygg_core::Vote;
use ygg_core::ID;

use crate::error::StoreError;
use crate::store::Store;

/// DDL for the snapshot + append-only tables, created on first connect.
///
/// Mirrors the teacher's `Schema::creates()` convention (`crates/database/src/traits.rs`)
/// of keeping table structure as plain `&'static str` SQL rather than an ORM.
const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS shows (
    show_id    UUID PRIMARY KEY,
    version    BIGINT NOT NULL,
    data       JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS show_users (
    show_id   UUID NOT NULL,
    user_id   UUID NOT NULL,
    data      JSONB NOT NULL,
    saved_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS show_votes (
    show_id   UUID NOT NULL,
    data      JSONB NOT NULL,
    saved_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS show_fig_tree_responses (
    show_id   UUID NOT NULL,
    user_id   UUID NOT NULL,
    text      TEXT NOT NULL,
    saved_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

/// Postgres-backed [`Store`], gated behind the `database` feature exactly
/// like the teacher's `#[cfg(feature = "database")]` gate on
/// `rbp-gameroom::room`.
pub struct PostgresStore {
    client: Arc<Client>,
}

impl PostgresStore {
    /// Connects using the `DB_URL` environment variable, matching the
    /// teacher's `rbp_database::db()` panic-on-missing-env convention.
    pub async fn connect_from_env() -> Self {
        let url = std::env::var("DB_URL").expect("DB_URL must be set");
        Self::connect(&url).await
    }

    pub async fn connect(url: &str) -> Self {
        log::info!("connecting to database");
        let (client, connection) = tokio_postgres::connect(url, tokio_postgres::NoTls)
            .await
            .expect("database connection failed");
        tokio::spawn(connection);
        let client = Arc::new(client);
        client
            .batch_execute(CREATE_TABLES)
            .await
            .expect("create show tables");
        Self { client }
    }

    fn deserialize_state(value: serde_json::Value) -> Result<ShowState, StoreError> {
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    /// WAL-style durability via a single transaction: delete-then-insert
    /// inside `BEGIN ... COMMIT` so a crash mid-write leaves the previous
    /// row (and therefore the previous snapshot) intact — Postgres
    /// transactional semantics give this for free, the same guarantee the
    /// teacher's `COPY ... BINARY` staging discipline gives bulk loads.
    async fn save_state(&self, state: &ShowState) -> Result<(), StoreError> {
        let payload = serde_json::to_value(state)?;
        let transaction = self
            .client
            .transaction()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        transaction
            .execute("DELETE FROM shows WHERE show_id = $1", &[&state.id.inner()])
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        transaction
            .execute(
                "INSERT INTO shows (show_id, version, data) VALUES ($1, $2, $3)",
                &[&state.id.inner(), &(state.version as i64), &payload],
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        transaction
            .commit()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn load_state(&self, show_id: ID<Show>) -> Result<Option<ShowState>, StoreError> {
        let row = self
            .client
            .query_opt("SELECT data FROM shows WHERE show_id = $1", &[&show_id.inner()])
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            Some(row) => Ok(Some(Self::deserialize_state(row.get(0))?)),
            None => Ok(None),
        }
    }

    async fn get_latest_show(&self) -> Result<Option<ShowState>, StoreError> {
        let row = self
            .client
            .query_opt("SELECT data FROM shows ORDER BY updated_at DESC LIMIT 1", &[])
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match row {
            Some(row) => Ok(Some(Self::deserialize_state(row.get(0))?)),
            None => Ok(None),
        }
    }

    async fn save_user(&self, show_id: ID<Show>, user: &User) -> Result<(), StoreError> {
        let payload = serde_json::to_value(user)?;
        self.client
            .execute(
                "INSERT INTO show_users (show_id, user_id, data) VALUES ($1, $2, $3)",
                &[&show_id.inner(), &user.id.inner(), &payload],
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn save_vote(&self, show_id: ID<Show>, vote: &Vote) -> Result<(), StoreError> {
        let payload = serde_json::to_value(vote)?;
        self.client
            .execute(
                "INSERT INTO show_votes (show_id, data) VALUES ($1, $2)",
                &[&show_id.inner(), &payload],
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn save_fig_tree_response(
        &self,
        show_id: ID<Show>,
        user_id: UserId,
        text: &str,
    ) -> Result<(), StoreError> {
        self.client
            .execute(
                "INSERT INTO show_fig_tree_responses (show_id, user_id, text) VALUES ($1, $2, $3)",
                &[&show_id.inner(), &user_id.inner(), &text],
            )
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}
