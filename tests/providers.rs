//! Wire-format tests for the Gemini and OpenAI providers against a mock
//! HTTP server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use policybot::config::{Config, Credentials, ProviderKind};
use policybot::embedding::{create_embedder, embed_query, EmbedMode};
use policybot::error::ProviderError;
use policybot::generation::create_generator;

const GEMINI_EMBED: &str = "/v1beta/models/text-embedding-004:batchEmbedContents";
const GEMINI_GENERATE: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn config_for(server: &MockServer, kind: ProviderKind) -> Config {
    let mut config = Config::default();
    config.provider.kind = kind;
    config.provider.base_url = Some(format!("{}/", server.uri()));
    config.provider.timeout_secs = Some(5);
    config
}

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============ Gemini ============

#[tokio::test]
async fn test_gemini_document_embeddings_are_batched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_EMBED))
        .and(header("x-goog-api-key", "secret"))
        .and(body_partial_json(json!({
            "requests": [{
                "model": "models/text-embedding-004",
                "taskType": "RETRIEVAL_DOCUMENT"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [{ "values": [0.5, 0.25] }]
        })))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = config_for(&server, ProviderKind::Gemini);
    config.embedding.batch_size = 1;
    let embedder = create_embedder(&config, &Credentials::new("secret")).unwrap();

    let vectors = embedder
        .embed(&texts(&["a", "b", "c"]), EmbedMode::Document)
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![0.5, 0.25]; 3]);
}

#[tokio::test]
async fn test_gemini_query_uses_query_task_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_EMBED))
        .and(body_partial_json(json!({
            "requests": [{
                "content": { "parts": [{ "text": "How much leave?" }] },
                "taskType": "RETRIEVAL_QUERY"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [{ "values": [1.0, 0.0, 0.0] }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, ProviderKind::Gemini);
    let embedder = create_embedder(&config, &Credentials::new("secret")).unwrap();

    let vector = embed_query(embedder.as_ref(), "How much leave?").await.unwrap();
    assert_eq!(vector, vec![1.0, 0.0, 0.0]);
}

#[tokio::test]
async fn test_gemini_rate_limit_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_EMBED))
        .respond_with(ResponseTemplate::new(429).set_body_string("RESOURCE_EXHAUSTED"))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, ProviderKind::Gemini);
    let embedder = create_embedder(&config, &Credentials::new("secret")).unwrap();

    let err = embedder
        .embed(&texts(&["a"]), EmbedMode::Document)
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
    assert!(err.to_string().contains("RESOURCE_EXHAUSTED"));
}

#[tokio::test]
async fn test_gemini_embedding_count_mismatch_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_EMBED))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [{ "values": [1.0] }]
        })))
        .mount(&server)
        .await;

    let config = config_for(&server, ProviderKind::Gemini);
    let embedder = create_embedder(&config, &Credentials::new("secret")).unwrap();

    let err = embedder
        .embed(&texts(&["a", "b"]), EmbedMode::Document)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_gemini_generation_joins_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_GENERATE))
        .and(header("x-goog-api-key", "secret"))
        .and(body_partial_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "the prompt" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Twenty " }, { "text": "days." }] }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, ProviderKind::Gemini);
    let generator = create_generator(&config, &Credentials::new("secret")).unwrap();

    assert_eq!(generator.generate("the prompt").await.unwrap(), "Twenty days.");
}

#[tokio::test]
async fn test_gemini_blocked_prompt_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_GENERATE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let config = config_for(&server, ProviderKind::Gemini);
    let generator = create_generator(&config, &Credentials::new("secret")).unwrap();

    let err = generator.generate("prompt").await.unwrap_err();
    assert!(err.to_string().contains("SAFETY"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_transport_error() {
    let mut config = Config::default();
    config.provider.base_url = Some("http://127.0.0.1:1".to_string());
    config.provider.timeout_secs = Some(2);
    let generator = create_generator(&config, &Credentials::new("secret")).unwrap();

    let err = generator.generate("prompt").await.unwrap_err();
    assert!(matches!(err, ProviderError::Transport { .. }));
}

// ============ OpenAI ============

#[tokio::test]
async fn test_openai_embeddings_sorted_by_index() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "text-embedding-3-small",
            "input": ["first", "second"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "index": 1, "embedding": [0.0, 2.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, ProviderKind::OpenAI);
    let embedder = create_embedder(&config, &Credentials::new("sk-test")).unwrap();

    let vectors = embedder
        .embed(&texts(&["first", "second"]), EmbedMode::Document)
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 2.0]]);
}

#[tokio::test]
async fn test_openai_chat_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [{ "role": "user", "content": "the prompt" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Twenty days." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, ProviderKind::OpenAI);
    let generator = create_generator(&config, &Credentials::new("sk-test")).unwrap();

    assert_eq!(generator.generate("the prompt").await.unwrap(), "Twenty days.");
}

#[tokio::test]
async fn test_openai_server_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let config = config_for(&server, ProviderKind::OpenAI);
    let generator = create_generator(&config, &Credentials::new("sk-test")).unwrap();

    match generator.generate("prompt").await.unwrap_err() {
        ProviderError::Api { provider, status, body } => {
            assert_eq!(provider, "openai");
            assert_eq!(status, 500);
            assert_eq!(body, "upstream down");
        }
        other => panic!("unexpected error: {}", other),
    }
}
