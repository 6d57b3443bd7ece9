use tracing::{debug, error};

use crate::db::Store;
use crate::errors::AppError;
use crate::models::{format_timestamp, Conversation};

#[derive(Clone)]
pub struct ConversationRepository {
    store: Store,
}

impl ConversationRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn find_all(&self) -> Result<Vec<Conversation>, AppError> {
        sqlx::query_as::<_, Conversation>(
            "SELECT id, title, model, created_at FROM conversations
             ORDER BY created_at ASC, rowid ASC",
        )
        .fetch_all(&self.store.pool()?)
        .await
        .map_err(|e| {
            error!("Failed to fetch all conversations: {e}");
            AppError::db_query("Failed to fetch conversations", e)
        })
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Conversation>, AppError> {
        sqlx::query_as::<_, Conversation>(
            "SELECT id, title, model, created_at FROM conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.store.pool()?)
        .await
        .map_err(|e| {
            error!("Failed to find conversation {id}: {e}");
            AppError::db_query(format!("Failed to find conversation {id}"), e)
        })
    }

    pub async fn save(&self, conversation: &Conversation) -> Result<Conversation, AppError> {
        sqlx::query(
            "INSERT INTO conversations (id, title, created_at, model)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&conversation.id)
        .bind(&conversation.title)
        .bind(format_timestamp(&conversation.created_at))
        .bind(&conversation.model)
        .execute(&self.store.pool()?)
        .await
        .map_err(|e| {
            error!("Failed to save conversation {}: {e}", conversation.id);
            AppError::db_query("Failed to save conversation", e)
        })?;
        Ok(conversation.clone())
    }

    /// Sets the title. Unknown ids are not an error.
    pub async fn rename(&self, title: &str, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE conversations SET title = ? WHERE id = ?")
            .bind(title)
            .bind(id)
            .execute(&self.store.pool()?)
            .await
            .map_err(|e| {
                error!("Failed to rename conversation {id}: {e}");
                AppError::db_query("Failed to rename conversation", e)
            })?;
        if result.rows_affected() == 0 {
            debug!("Rename skipped, no conversation {id}");
        }
        Ok(())
    }

    /// Removes the conversation and every message that references it, as one
    /// transaction.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let pool = self.store.pool()?;
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| AppError::db_query("Failed to begin transaction", e))?;

        sqlx::query("DELETE FROM conversation_messages WHERE conversation_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to delete messages of conversation {id}: {e}");
                AppError::db_query("Failed to delete conversation messages", e)
            })?;

        sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to delete conversation {id}: {e}");
                AppError::db_query("Failed to delete conversation", e)
            })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit deletion of conversation {id}: {e}");
            AppError::db_query("Failed to delete conversation", e)
        })
    }
}
