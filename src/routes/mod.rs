pub mod api_routes;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::ChatService;
use api_routes::{
    change_model_handler, chat_handler, clear_history_handler, delete_conversation_handler,
    focus_conversation_handler, list_conversations_handler, list_messages_handler,
    list_models_handler, new_conversation_handler, refresh_models_handler, session_handler,
};

/// JSON bridge used by the desktop shell.
pub fn router(chat_service: ChatService) -> Router {
    Router::new()
        .route("/api/session", get(session_handler))
        .route(
            "/api/conversations",
            get(list_conversations_handler)
                .post(new_conversation_handler)
                .delete(clear_history_handler),
        )
        .route("/api/conversations/{id}", axum::routing::delete(delete_conversation_handler))
        .route("/api/conversations/{id}/messages", get(list_messages_handler))
        .route("/api/conversations/{id}/focus", post(focus_conversation_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/model", put(change_model_handler))
        .route("/api/models", get(list_models_handler))
        .route("/api/models/refresh", post(refresh_models_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(chat_service)
}
