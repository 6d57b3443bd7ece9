use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::errors::AppError;
use crate::models::{ChatRequest, ModelChoice};
use crate::service::ChatService;
use crate::state::SessionStore;

// ── Response bodies ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: SessionStore,
    pub loading: bool,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET `/api/session` — the projection the UI renders
pub async fn session_handler(State(svc): State<ChatService>) -> impl IntoResponse {
    Json(SessionView {
        session: svc.snapshot().await,
        loading: svc.is_loading().await,
    })
}

/// GET `/api/conversations` — persisted conversations
pub async fn list_conversations_handler(State(svc): State<ChatService>) -> Response {
    match svc.get_conversations().await {
        Ok(convs) => Json(convs).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST `/api/conversations` — start an empty conversation and focus it
pub async fn new_conversation_handler(State(svc): State<ChatService>) -> Response {
    match svc.new_conversation().await {
        Ok(conv) => (StatusCode::CREATED, Json(conv)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE `/api/conversations` — wipe every conversation
pub async fn clear_history_handler(State(svc): State<ChatService>) -> Response {
    match svc.clear_history().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET `/api/conversations/{id}/messages` — persisted messages of one conversation
pub async fn list_messages_handler(
    Path(id): Path<String>,
    State(svc): State<ChatService>,
) -> Response {
    match svc.get_messages(&id).await {
        Ok(msgs) => Json(msgs).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST `/api/conversations/{id}/focus` — select a conversation
pub async fn focus_conversation_handler(
    Path(id): Path<String>,
    State(svc): State<ChatService>,
) -> Response {
    match svc.open_conversation(&id).await {
        Ok(msgs) => Json(msgs).into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE `/api/conversations/{id}`
pub async fn delete_conversation_handler(
    Path(id): Path<String>,
    State(svc): State<ChatService>,
) -> Response {
    match svc.delete_conversation(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST `/api/chat` — send a message and wait for the reply
pub async fn chat_handler(
    State(svc): State<ChatService>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if svc.is_loading().await {
        return error_response(&AppError::TurnInProgress);
    }
    svc.set_draft(request.message).await;
    match svc.send_draft().await {
        Ok(turn) => Json(turn).into_response(),
        Err(e) => error_response(&e),
    }
}

/// PUT `/api/model` — choose the model for new and focused conversations
pub async fn change_model_handler(
    State(svc): State<ChatService>,
    Json(choice): Json<ModelChoice>,
) -> Response {
    if choice.model.trim().is_empty() {
        return error_response(&AppError::EmptyField { field_name: "model".to_string() });
    }
    svc.change_model(&choice.model).await;
    StatusCode::NO_CONTENT.into_response()
}

/// GET `/api/models` — models known to the session
pub async fn list_models_handler(State(svc): State<ChatService>) -> impl IntoResponse {
    Json(svc.snapshot().await.available_models().to_vec())
}

/// POST `/api/models/refresh` — re-read the installed models from Ollama
pub async fn refresh_models_handler(State(svc): State<ChatService>) -> Response {
    match svc.refresh_models().await {
        Ok(()) => Json(svc.snapshot().await.available_models().to_vec()).into_response(),
        Err(e) => error_response(&e),
    }
}

// ── Helper ────────────────────────────────────────────────────────────────────

pub fn status_for(err: &AppError) -> StatusCode {
    if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if matches!(err, AppError::TurnInProgress | AppError::ConstraintViolation { .. }) {
        StatusCode::CONFLICT
    } else if err.is_agent_unavailable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else if err.is_model_exchange() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn error_response(err: &AppError) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        warn!("Request failed: {err}");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
