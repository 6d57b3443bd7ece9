use std::sync::Arc;

use tracing::{info, warn};

use ollama_chat::agent::OllamaClient;
use ollama_chat::config::AppConfig;
use ollama_chat::db::Store;
use ollama_chat::routes::router;
use ollama_chat::service::ChatService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ollama_chat=debug,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env()?;

    // ── Database ──────────────────────────────────────────────────────────────
    let store = Store::new(&config.database_url, config.store_policy);
    store.open().await?;

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let agent = OllamaClient::new(&config.ollama_base_url);
    let chat_service = ChatService::new(store.clone(), Arc::new(agent), &config.default_model)
        .with_context_policy(config.context_policy);

    chat_service.load_conversations().await?;
    if chat_service.check_server().await {
        if let Err(e) = chat_service.refresh_models().await {
            warn!("Could not list models: {e}");
        }
    } else {
        warn!(
            "Ollama is not reachable at {}. Start it with: OLLAMA_ORIGINS=* ollama serve",
            config.ollama_base_url
        );
    }

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, router(chat_service))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    store.close().await;
    Ok(())
}
