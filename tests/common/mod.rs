#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use ollama_chat::agent::ModelExchange;
use ollama_chat::db::Store;
use ollama_chat::errors::AppError;
use ollama_chat::models::{AvailableModel, Generation};
use ollama_chat::service::ChatService;

/// One recorded `generate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub model: String,
    pub prompt: String,
    pub context: Vec<i64>,
}

/// A model exchange that replays queued results and records what it was
/// asked. Runs out → inference error.
#[derive(Default)]
pub struct ScriptedExchange {
    replies: Mutex<VecDeque<Result<Generation, AppError>>>,
    calls: Mutex<Vec<Call>>,
    models: Mutex<Vec<AvailableModel>>,
}

impl ScriptedExchange {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, response: &str, context: &[i64]) {
        self.replies.lock().unwrap().push_back(Ok(Generation {
            response: response.to_string(),
            context: context.to_vec(),
        }));
    }

    pub fn fail(&self, err: AppError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub fn set_models(&self, models: Vec<AvailableModel>) {
        *self.models.lock().unwrap() = models;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelExchange for ScriptedExchange {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        context: &[i64],
    ) -> Result<Generation, AppError> {
        self.calls.lock().unwrap().push(Call {
            model: model.to_string(),
            prompt: prompt.to_string(),
            context: context.to_vec(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::InferenceError { message: "no scripted reply".into() }))
    }

    async fn list_models(&self) -> Result<Vec<AvailableModel>, AppError> {
        Ok(self.models.lock().unwrap().clone())
    }

    async fn ping(&self) -> bool {
        true
    }
}

pub async fn open_store() -> Store {
    let store = Store::in_memory();
    store.open().await.expect("in-memory store opens");
    store
}

pub async fn service_with(exchange: Arc<ScriptedExchange>) -> (ChatService, Store) {
    let store = open_store().await;
    let svc = ChatService::new(store.clone(), exchange, "mistral");
    (svc, store)
}
