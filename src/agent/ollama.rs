use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::agent::ModelExchange;
use crate::errors::AppError;
use crate::models::{AvailableModel, Generation};

pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    context: &'a [i64],
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    context: Vec<i64>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<AvailableModel>,
}

/// HTTP client for a local Ollama server (`/api/generate`, `/api/tags`).
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_connect() || e.is_timeout() {
            AppError::OllamaUnavailable { host: self.base_url.clone() }
        } else {
            AppError::InferenceError { message: e.to_string() }
        }
    }
}

#[async_trait]
impl ModelExchange for OllamaClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        context: &[i64],
    ) -> Result<Generation, AppError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest { model, prompt, context, stream: false };
        debug!("Generating with {model} ({} context tokens)", context.len());

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Ollama request to {url} failed: {e}");
                self.transport_error(e)
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            error!("Ollama has no model {model}");
            return Err(AppError::ModelNotFound { model_name: model.to_string() });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Ollama generate failed with {status}: {body}");
            return Err(AppError::InferenceError {
                message: format!("Ollama returned {status}: {body}"),
            });
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            error!("Unreadable Ollama reply: {e}");
            AppError::InferenceError { message: format!("Unreadable reply: {e}") }
        })?;

        Ok(Generation { response: body.response, context: body.context })
    }

    async fn list_models(&self) -> Result<Vec<AvailableModel>, AppError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            error!("Failed to list Ollama models: {e}");
            self.transport_error(e)
        })?;

        if !response.status().is_success() {
            return Err(AppError::InferenceError {
                message: format!("Failed to list models: {}", response.status()),
            });
        }

        let tags: TagsResponse = response.json().await.map_err(|e| AppError::InferenceError {
            message: format!("Unreadable model list: {e}"),
        })?;
        Ok(tags.models)
    }

    async fn ping(&self) -> bool {
        match self.client.get(&self.base_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Ollama at {} not reachable: {e}", self.base_url);
                false
            }
        }
    }
}
