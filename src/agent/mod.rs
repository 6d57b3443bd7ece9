//! The model exchange seam: one prompt in, one reply and continuation context
//! out. [`OllamaClient`] is the production implementation.

mod ollama;

use async_trait::async_trait;

pub use ollama::{OllamaClient, DEFAULT_OLLAMA_URL};

use crate::errors::AppError;
use crate::models::{AvailableModel, Generation};

#[async_trait]
pub trait ModelExchange: Send + Sync {
    /// Sends a single, non-streaming prompt. Exactly one request per call.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        context: &[i64],
    ) -> Result<Generation, AppError>;

    /// Models installed on the server.
    async fn list_models(&self) -> Result<Vec<AvailableModel>, AppError>;

    /// Whether the server answers at all.
    async fn ping(&self) -> bool;
}
