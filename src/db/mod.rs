//! The embedded SQLite store and its two repositories.
//!
//! [`Store`] owns the single process-wide pool. It starts `Uninitialized`,
//! becomes `Ready` once [`Store::open`] has prepared the schema, and ends
//! `Closed`; repository calls made outside `Ready` fail with
//! [`AppError::StorageUnavailable`].

pub mod conversation_repository;
pub mod message_repository;

use std::str::FromStr;
use std::sync::{Arc, RwLock};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{error, info};

use crate::errors::AppError;

const CREATE_CONVERSATIONS: &str = "CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    mode TEXT,
    model TEXT NOT NULL,
    created_at DATETIME NOT NULL
)";

const CREATE_CONVERSATION_MESSAGES: &str = "CREATE TABLE IF NOT EXISTS conversation_messages (
    id TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    message TEXT NOT NULL,
    created_at DATETIME NOT NULL,
    ai_replied INTEGER NOT NULL,
    ctx TEXT,
    FOREIGN KEY(conversation_id) REFERENCES conversations(id)
)";

/// What happens to existing history when the store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorePolicy {
    /// Drop both tables before recreating them: every launch starts empty.
    #[default]
    Ephemeral,
    /// Keep whatever the previous run left behind.
    Durable,
}

impl FromStr for StorePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ephemeral" => Ok(StorePolicy::Ephemeral),
            "durable" => Ok(StorePolicy::Durable),
            other => Err(AppError::InvalidConfig {
                key: "STORE_MODE".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

enum StoreState {
    Uninitialized,
    Ready(SqlitePool),
    Closed,
}

impl StoreState {
    fn name(&self) -> &'static str {
        match self {
            StoreState::Uninitialized => "uninitialized",
            StoreState::Ready(_) => "ready",
            StoreState::Closed => "closed",
        }
    }
}

#[derive(Clone)]
pub struct Store {
    url: String,
    policy: StorePolicy,
    state: Arc<RwLock<StoreState>>,
}

impl Store {
    pub fn new(url: impl Into<String>, policy: StorePolicy) -> Self {
        Self {
            url: url.into(),
            policy,
            state: Arc::new(RwLock::new(StoreState::Uninitialized)),
        }
    }

    /// A private in-memory database, mostly for tests.
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:", StorePolicy::Ephemeral)
    }

    pub fn policy(&self) -> StorePolicy {
        self.policy
    }

    /// Connects, applies the store policy and creates the schema.
    ///
    /// Under [`StorePolicy::Ephemeral`] the tables are dropped first, so all
    /// previous conversations are discarded.
    pub async fn open(&self) -> Result<(), AppError> {
        let options = SqliteConnectOptions::from_str(&self.url)
            .map_err(|e| AppError::db_query(format!("Invalid database url {}", self.url), e))?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives only as long as its one connection.
        let in_memory = self.url.contains(":memory:") || self.url.contains("mode=memory");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| {
                error!("Failed to open database {}: {e}", self.url);
                AppError::db_query("Failed to open database", e)
            })?;

        if self.policy == StorePolicy::Ephemeral {
            drop_tables(&pool).await?;
        }
        self.set_state(StoreState::Ready(pool));
        self.initialize_schema().await?;

        info!("Database {} ready ({:?})", self.url, self.policy);
        Ok(())
    }

    /// The live pool, or `StorageUnavailable` outside the `Ready` state.
    pub fn pool(&self) -> Result<SqlitePool, AppError> {
        let state = self
            .state
            .read()
            .map_err(|_| AppError::Unexpected("store state lock poisoned".to_string()))?;
        match &*state {
            StoreState::Ready(pool) => Ok(pool.clone()),
            other => Err(AppError::StorageUnavailable { state: other.name() }),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.pool().is_ok()
    }

    pub async fn initialize_schema(&self) -> Result<(), AppError> {
        let pool = self.pool()?;
        for statement in [CREATE_CONVERSATIONS, CREATE_CONVERSATION_MESSAGES] {
            sqlx::query(statement).execute(&pool).await.map_err(|e| {
                error!("Failed to create schema: {e}");
                AppError::db_query("Failed to create schema", e)
            })?;
        }
        Ok(())
    }

    pub async fn drop_schema(&self) -> Result<(), AppError> {
        drop_tables(&self.pool()?).await
    }

    /// Deletes every row of both tables, keeping the structure.
    pub async fn clear_all(&self) -> Result<(), AppError> {
        let pool = self.pool()?;
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| AppError::db_query("Failed to begin transaction", e))?;
        for statement in ["DELETE FROM conversation_messages", "DELETE FROM conversations"] {
            sqlx::query(statement).execute(&mut *tx).await.map_err(|e| {
                error!("Failed to clear history: {e}");
                AppError::db_query("Failed to clear history", e)
            })?;
        }
        tx.commit()
            .await
            .map_err(|e| AppError::db_query("Failed to commit history clear", e))
    }

    pub async fn close(&self) {
        let previous = match self.state.write() {
            Ok(mut state) => std::mem::replace(&mut *state, StoreState::Closed),
            Err(_) => return,
        };
        if let StoreState::Ready(pool) = previous {
            pool.close().await;
            info!("Database {} closed", self.url);
        }
    }

    fn set_state(&self, next: StoreState) {
        if let Ok(mut state) = self.state.write() {
            *state = next;
        }
    }
}

// Messages first: they reference conversations.
async fn drop_tables(pool: &SqlitePool) -> Result<(), AppError> {
    for statement in [
        "DROP TABLE IF EXISTS conversation_messages",
        "DROP TABLE IF EXISTS conversations",
    ] {
        sqlx::query(statement).execute(pool).await.map_err(|e| {
            error!("Failed to drop schema: {e}");
            AppError::db_query("Failed to drop schema", e)
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_from_str() {
        assert_eq!("ephemeral".parse::<StorePolicy>().unwrap(), StorePolicy::Ephemeral);
        assert_eq!(" Durable ".parse::<StorePolicy>().unwrap(), StorePolicy::Durable);
        assert!(matches!(
            "forever".parse::<StorePolicy>(),
            Err(AppError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn unopened_store_rejects_calls() {
        let store = Store::in_memory();
        assert!(matches!(
            store.pool(),
            Err(AppError::StorageUnavailable { state: "uninitialized" })
        ));
        assert!(store.initialize_schema().await.is_err());
    }

    #[tokio::test]
    async fn closed_store_rejects_calls() {
        let store = Store::in_memory();
        store.open().await.unwrap();
        assert!(store.is_ready());
        store.close().await;
        assert!(matches!(
            store.clear_all().await,
            Err(AppError::StorageUnavailable { state: "closed" })
        ));
    }
}
