use tracing::error;

use crate::db::Store;
use crate::errors::AppError;
use crate::models::{format_timestamp, ConversationMessage};

#[derive(Clone)]
pub struct MessageRepository {
    store: Store,
}

impl MessageRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Messages of one conversation, oldest first. Unknown ids yield an
    /// empty list.
    pub async fn find_by_conversation_id(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ConversationMessage>, AppError> {
        sqlx::query_as::<_, ConversationMessage>(
            "SELECT id, conversation_id, message, created_at, ai_replied, ctx
             FROM conversation_messages
             WHERE conversation_id = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.store.pool()?)
        .await
        .map_err(|e| {
            error!("Failed to fetch messages for conversation {conversation_id}: {e}");
            AppError::db_query(
                format!("Failed to fetch messages for conversation {conversation_id}"),
                e,
            )
        })
    }

    pub async fn save(&self, message: &ConversationMessage) -> Result<ConversationMessage, AppError> {
        sqlx::query(
            "INSERT INTO conversation_messages (id, conversation_id, message, created_at, ai_replied, ctx)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.message)
        .bind(format_timestamp(&message.created_at))
        .bind(i64::from(message.ai_replied))
        .bind(message.ctx.as_deref())
        .execute(&self.store.pool()?)
        .await
        .map_err(|e| {
            error!("Failed to save message {}: {e}", message.id);
            AppError::db_query("Failed to save message", e)
        })?;
        Ok(message.clone())
    }
}
