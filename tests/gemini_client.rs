use quickcal::config::{BackendConfig, KeyPlacement};
use quickcal::error::ExtractionError;
use quickcal::extraction::{CompletionBackend, GeminiClient};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/gemini-test:generateContent";

fn config(server: &MockServer) -> BackendConfig {
    let mut config = BackendConfig::new("test-key");
    config.endpoint = server.uri();
    config.model = "gemini-test".to_string();
    config.timeout = Duration::from_secs(5);
    config
}

fn envelope(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn test_returns_generated_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "Find the event" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope("{\"title\":\"Lunch\"}")))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new(&config(&server)).unwrap();
    let text = client.complete("Find the event").await.unwrap();
    assert_eq!(text, "{\"title\":\"Lunch\"}");
}

#[tokio::test]
async fn test_key_in_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.key_placement = KeyPlacement::Header;
    let client = GeminiClient::new(&config).unwrap();

    assert_eq!(client.complete("ping").await.unwrap(), "ok");
    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].url.query().is_none());
}

#[tokio::test]
async fn test_non_success_status_is_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal failure"))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new(&config(&server)).unwrap();
    match client.complete("hello").await {
        Err(ExtractionError::Backend { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "internal failure");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_envelope_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&config(&server)).unwrap();
    let err = client.complete("hello").await.unwrap_err();
    assert!(matches!(err, ExtractionError::BackendParse(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_slow_backend_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.timeout = Duration::from_millis(200);
    let client = GeminiClient::new(&config).unwrap();

    let err = client.complete("hello").await.unwrap_err();
    assert!(matches!(err, ExtractionError::Transport(_)));
    assert!(err.is_retryable());
    assert!(!err.to_string().contains("test-key"));
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let mut config = BackendConfig::new("test-key");
    config.endpoint = "http://127.0.0.1:1".to_string();
    config.timeout = Duration::from_secs(2);
    let client = GeminiClient::new(&config).unwrap();

    let err = client.complete("hello").await.unwrap_err();
    assert!(matches!(err, ExtractionError::Transport(_)));
    assert!(!err.to_string().contains("test-key"));
}

#[tokio::test]
async fn test_validate_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope("pong")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(query_param("key", "wrong-key"))
        .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&config(&server)).unwrap();
    assert!(client.validate_key().await);

    let mut wrong = config(&server);
    wrong.api_key = quickcal::config::ApiKey::new("wrong-key");
    let client = GeminiClient::new(&wrong).unwrap();
    assert!(!client.validate_key().await);
}
