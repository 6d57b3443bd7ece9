//! `OllamaClient` against a `wiremock` stand-in for the Ollama HTTP API.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ollama_chat::agent::{ModelExchange, OllamaClient};
use ollama_chat::errors::AppError;

#[tokio::test]
async fn generate_sends_prompt_and_context() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "mistral",
            "prompt": "Hello",
            "context": [1, 2],
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "mistral",
            "created_at": "2026-10-16T08:30:00.000Z",
            "response": "Hi!",
            "done": true,
            "context": [1, 2, 3]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&server.uri());
    let generation = client.generate("mistral", "Hello", &[1, 2]).await.unwrap();

    assert_eq!(generation.response, "Hi!");
    assert_eq!(generation.context, vec![1, 2, 3]);
}

#[tokio::test]
async fn missing_context_in_reply_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "Hi!",
            "done": true
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&format!("{}/", server.uri()));
    let generation = client.generate("mistral", "Hello", &[]).await.unwrap();
    assert!(generation.context.is_empty());
}

#[tokio::test]
async fn unknown_model_maps_to_model_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": "model 'nope' not found" })),
        )
        .mount(&server)
        .await;

    let err = OllamaClient::new(&server.uri())
        .generate("nope", "Hello", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ModelNotFound { ref model_name } if model_name == "nope"));
}

#[tokio::test]
async fn server_error_maps_to_inference_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("out of memory"))
        .mount(&server)
        .await;

    let err = OllamaClient::new(&server.uri())
        .generate("mistral", "Hello", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InferenceError { ref message } if message.contains("out of memory")));
}

#[tokio::test]
async fn unreachable_server_maps_to_unavailable() {
    let client = OllamaClient::new("http://127.0.0.1:9");

    let err = client.generate("mistral", "Hello", &[]).await.unwrap_err();
    assert!(err.is_agent_unavailable(), "{err}");
    assert!(!client.ping().await);
}

#[tokio::test]
async fn list_models_reads_tags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{
                "name": "mistral:latest",
                "model": "mistral:latest",
                "modified_at": "2026-05-01T12:34:56.123456789-07:00",
                "size": 4109865159u64,
                "digest": "sha256:2ae6f6dd7a3dd734790bbbf58b8909a606e0e7e97e94b7604e0aa7ae4490e6d8",
                "details": { "format": "gguf", "family": "llama" }
            }]
        })))
        .mount(&server)
        .await;

    let models = OllamaClient::new(&server.uri()).list_models().await.unwrap();

    assert_eq!(models.len(), 1);
    assert_eq!(models[0].name, "mistral:latest");
    assert_eq!(models[0].size, 4_109_865_159);
    assert!(models[0].digest.starts_with("sha256:"));
    assert_eq!(models[0].modified_at.to_rfc3339(), "2026-05-01T19:34:56.123456789+00:00");
}

#[tokio::test]
async fn ping_checks_root() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Ollama is running"))
        .mount(&server)
        .await;

    assert!(OllamaClient::new(&server.uri()).ping().await);
}
