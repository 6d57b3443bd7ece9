use thiserror::Error;
use tracing::error;

/// Which integrity rule a rejected statement tripped over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    DuplicateKey,
    MissingReference,
    Other,
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Constraint::DuplicateKey => "duplicate key",
            Constraint::MissingReference => "missing reference",
            Constraint::Other => "constraint",
        })
    }
}

/// Top-level application error.
/// All variants carry a human-readable message for display/logging.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Storage errors ───────────────────────────────────────────────────────
    #[error("Store is not ready ({state})")]
    StorageUnavailable { state: &'static str },

    #[error("Constraint violation ({constraint}): {message}")]
    ConstraintViolation { constraint: Constraint, message: String },

    #[error("Database query failed: {message}")]
    DatabaseQueryFailed {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    // ── Model exchange errors ────────────────────────────────────────────────
    #[error("Ollama service unavailable at {host}")]
    OllamaUnavailable { host: String },

    #[error("Model '{model_name}' not found in Ollama")]
    ModelNotFound { model_name: String },

    #[error("Inference error: {message}")]
    InferenceError { message: String },

    // ── Continuation context ─────────────────────────────────────────────────
    #[error("Malformed continuation context: {source}")]
    MalformedContext {
        #[source]
        source: serde_json::Error,
    },

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    // ── Conversation errors ──────────────────────────────────────────────────
    #[error("Conversation '{id}' not found")]
    ConversationNotFound { id: String },

    #[error("A message is already being answered")]
    TurnInProgress,

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Invalid value '{value}' for {key}")]
    InvalidConfig { key: String, value: String },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    /// Maps a driver error, lifting integrity failures out of the generic
    /// query-failed bucket.
    pub fn db_query(message: impl Into<String>, source: sqlx::Error) -> Self {
        let message = message.into();
        if let sqlx::Error::Database(db_err) = &source {
            let constraint = if db_err.is_unique_violation() {
                Some(Constraint::DuplicateKey)
            } else if db_err.is_foreign_key_violation() {
                Some(Constraint::MissingReference)
            } else if db_err.is_check_violation() {
                Some(Constraint::Other)
            } else {
                None
            };
            if let Some(constraint) = constraint {
                return AppError::ConstraintViolation {
                    constraint,
                    message: format!("{message}: {}", db_err.message()),
                };
            }
        }
        match source {
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
                error!("{message}: store connection unavailable");
                AppError::StorageUnavailable { state: "unreachable" }
            }
            source => AppError::DatabaseQueryFailed { message, source },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::ConversationNotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::EmptyField { .. })
    }

    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            AppError::StorageUnavailable { .. }
                | AppError::ConstraintViolation { .. }
                | AppError::DatabaseQueryFailed { .. }
        )
    }

    pub fn is_model_exchange(&self) -> bool {
        matches!(
            self,
            AppError::OllamaUnavailable { .. }
                | AppError::ModelNotFound { .. }
                | AppError::InferenceError { .. }
        )
    }

    pub fn is_agent_unavailable(&self) -> bool {
        matches!(self, AppError::OllamaUnavailable { .. })
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(
            self,
            AppError::ConstraintViolation { constraint: Constraint::DuplicateKey, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_closed_maps_to_storage_unavailable() {
        let err = AppError::db_query("Failed to list", sqlx::Error::PoolClosed);
        assert!(matches!(err, AppError::StorageUnavailable { .. }));
        assert!(err.is_storage());
    }

    #[test]
    fn row_not_found_stays_a_query_failure() {
        let err = AppError::db_query("Failed to read", sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::DatabaseQueryFailed { .. }));
        assert!(!err.is_duplicate_key());
    }

    #[test]
    fn classification_is_disjoint() {
        let err = AppError::OllamaUnavailable { host: "http://127.0.0.1:11434".into() };
        assert!(err.is_model_exchange());
        assert!(err.is_agent_unavailable());
        assert!(!err.is_storage());
        assert!(!err.is_validation());
    }
}
