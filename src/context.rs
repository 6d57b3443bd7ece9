//! Continuation context handling.
//!
//! Ollama returns an opaque integer array with every reply; passing it back on
//! the next request lets the server resume from the prior conversational state.
//! The array is stored as JSON text on the reply message.

use tracing::warn;

use crate::errors::AppError;
use crate::models::ConversationMessage;

pub type ContinuationContext = Vec<i64>;

/// Position in the pre-turn message list whose `ctx` seeds the next request.
/// Index 1 is the first model reply of the conversation, not the latest one.
pub const HISTORICAL_CONTEXT_INDEX: usize = 1;

pub fn serialize(context: &[i64]) -> String {
    // A slice of integers always serializes.
    serde_json::to_string(context).unwrap_or_else(|_| "[]".to_string())
}

pub fn parse(raw: &str) -> Result<ContinuationContext, AppError> {
    serde_json::from_str(raw).map_err(|source| AppError::MalformedContext { source })
}

/// Parses a stored `ctx` column, substituting an empty array for NULL or
/// anything that is not a JSON integer array.
pub fn parse_or_empty(raw: Option<&str>) -> ContinuationContext {
    match raw {
        None => Vec::new(),
        Some(raw) => parse(raw).unwrap_or_else(|e| {
            warn!("{e}; continuing with an empty context");
            Vec::new()
        }),
    }
}

/// Which earlier message supplies the context for the next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPolicy {
    /// Always read the message at a fixed position of the history.
    FixedIndex(usize),
    /// Read the most recent model reply.
    LatestReply,
}

impl Default for ContextPolicy {
    fn default() -> Self {
        ContextPolicy::FixedIndex(HISTORICAL_CONTEXT_INDEX)
    }
}

impl ContextPolicy {
    pub fn derive(&self, history: &[ConversationMessage]) -> ContinuationContext {
        let source = match self {
            ContextPolicy::FixedIndex(index) => history.get(*index),
            ContextPolicy::LatestReply => history.iter().rev().find(|m| m.ai_replied),
        };
        source.map(ConversationMessage::context).unwrap_or_default()
    }
}

impl std::str::FromStr for ContextPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed-index" => Ok(ContextPolicy::default()),
            "latest-reply" => Ok(ContextPolicy::LatestReply),
            other => Err(AppError::InvalidConfig {
                key: "CONTEXT_POLICY".to_string(),
                value: other.to_string(),
            }),
        }
    }
}
