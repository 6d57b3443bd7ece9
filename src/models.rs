use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::context::{self, ContinuationContext};
use crate::ids::{generate_id_number, generate_random_id, ID_LENGTH};

/// Number of characters of the first message kept as the conversation title.
pub const TITLE_MAX_CHARS: usize = 20;

/// Current time at the precision the store keeps (milliseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// ISO-8601 rendering used for the `created_at` columns.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// First [`TITLE_MAX_CHARS`] characters of a message, used as the title of a
/// conversation once it receives its first message.
pub fn title_from_message(text: &str) -> String {
    text.chars().take(TITLE_MAX_CHARS).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: String, title: String, model: String) -> Self {
        Self { id, title, model, created_at: now() }
    }

    /// A fresh conversation with a random id and a `"Conversation NN"` title.
    pub fn placeholder(model: impl Into<String>) -> Self {
        Self::new(
            generate_random_id(ID_LENGTH),
            format!("Conversation {}", generate_id_number(2)),
            model.into(),
        )
    }
}

/// One turn of a conversation, authored either by the user or by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationMessage {
    pub id: String,
    pub conversation_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub ai_replied: bool,
    /// JSON integer array returned by the model server; `"[]"` for user turns.
    pub ctx: Option<String>,
}

impl ConversationMessage {
    pub fn user(conversation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: generate_random_id(ID_LENGTH),
            conversation_id: conversation_id.into(),
            message: message.into(),
            created_at: now(),
            ai_replied: false,
            ctx: Some(context::serialize(&[])),
        }
    }

    pub fn reply(
        conversation_id: impl Into<String>,
        message: impl Into<String>,
        context: &[i64],
    ) -> Self {
        Self {
            id: generate_random_id(ID_LENGTH),
            conversation_id: conversation_id.into(),
            message: message.into(),
            created_at: now(),
            ai_replied: true,
            ctx: Some(context::serialize(context)),
        }
    }

    /// Parsed `ctx`, empty when absent or malformed.
    pub fn context(&self) -> ContinuationContext {
        context::parse_or_empty(self.ctx.as_deref())
    }
}

/// A model installed on the Ollama server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableModel {
    pub name: String,
    pub digest: String,
    pub modified_at: DateTime<Utc>,
    pub size: u64,
}

/// Reply produced by one model exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub response: String,
    pub context: ContinuationContext,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelChoice {
    pub model: String,
}

/// Both halves of a completed send.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub conversation_id: String,
    pub user_message: ConversationMessage,
    pub reply: ConversationMessage,
}
