//! Gemini driver against a mock HTTP server, alone and behind the facade.

use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use whyred_backend::drivers::{GeminiProvider, GenerationProvider, ModelConfig};
use whyred_backend::error_code::ErrorClass;
use whyred_backend::{ErrorKind, GenerationService, ModelRegistry, Part, RequestType, RetryPolicy};

fn candidate(text: &str) -> String {
    json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    })
    .to_string()
}

fn provider(url: String) -> GeminiProvider {
    GeminiProvider::with_client(reqwest::Client::new(), "test-key").with_base_url(url)
}

fn quick_policy() -> RetryPolicy {
    RetryPolicy::new(2, Duration::from_millis(5), Duration::from_millis(10))
        .unwrap()
        .with_max_jitter(Duration::ZERO)
}

#[tokio::test]
async fn posts_to_generate_content_with_key() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
        .match_header("x-goog-api-key", "test-key")
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "Hello" }] }],
            "generationConfig": { "topK": 40, "maxOutputTokens": 8192 }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(candidate("Hi there"))
        .create_async()
        .await;

    // The "models/" prefix is stripped before building the path.
    let text = provider(server.url())
        .generate(&ModelConfig::text("models/gemini-2.0-flash"), &[Part::text("Hello")])
        .await
        .unwrap();

    assert_eq!(text, "Hi there");
    mock.assert_async().await;
}

#[tokio::test]
async fn transport_errors_do_not_expose_api_key() {
    // Nothing listens on port 1.
    let provider = GeminiProvider::with_client(reqwest::Client::new(), "SECRET_KEY_123")
        .with_base_url("http://127.0.0.1:1");

    let err = provider
        .generate(&ModelConfig::text("gemini-2.0-flash"), &[Part::text("Hello")])
        .await
        .unwrap_err();

    let text = err.to_string();
    assert!(!text.contains("SECRET_KEY_123"), "key leaked: {text}");
    assert!(!format!("{err:?}").contains("SECRET_KEY_123"));
}

#[tokio::test]
async fn probe_config_sends_no_generation_config() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
        .match_query(Matcher::Any)
        .match_body(Matcher::Json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "ping" }] }]
        })))
        .with_status(200)
        .with_body(candidate("pong"))
        .create_async()
        .await;

    let text = provider(server.url())
        .generate(&ModelConfig::probe("gemini-1.5-flash"), &[Part::text("ping")])
        .await
        .unwrap();
    assert_eq!(text, "pong");
}

#[tokio::test]
async fn missing_model_is_classified_unavailable() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1beta/models/gemini-9:generateContent")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(
            json!({
                "error": {
                    "code": 404,
                    "message": "models/gemini-9 is not found for API version v1beta",
                    "status": "NOT_FOUND"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let err = provider(server.url())
        .generate(&ModelConfig::text("gemini-9"), &[Part::text("hi")])
        .await
        .unwrap_err();

    assert_eq!(err.class(), Some(ErrorClass::ModelNotFound));
    assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
    assert_eq!(err.model(), Some("gemini-9"));
    assert!(err.to_string().contains("is not found"));
}

#[tokio::test]
async fn quota_errors_are_transient() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_body(r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#)
        .create_async()
        .await;

    let err = provider(server.url())
        .generate(&ModelConfig::text("gemini-2.0-flash"), &[Part::text("hi")])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpstreamTransient);
    assert_eq!(err.http_status(), 429);
}

#[tokio::test]
async fn blocked_prompt_yields_empty_text() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
        .create_async()
        .await;

    let text = provider(server.url())
        .generate(&ModelConfig::text("gemini-2.0-flash"), &[Part::text("hi")])
        .await
        .unwrap();
    assert!(text.is_empty());
}

#[tokio::test]
async fn service_skips_retired_model_over_http() {
    let mut server = mockito::Server::new_async().await;
    let gone = server
        .mock("POST", "/v1beta/models/retired:generateContent")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":{"code":404,"message":"models/retired is not found","status":"NOT_FOUND"}}"#)
        .expect(1)
        .create_async()
        .await;
    let live = server
        .mock("POST", "/v1beta/models/current:generateContent")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(candidate("42"))
        .expect(1)
        .create_async()
        .await;

    let registry = ModelRegistry::new("retired", "backup").with_alternatives(vec!["current".into()]);
    let service = GenerationService::new(Arc::new(provider(server.url())), registry, quick_policy(), true);

    let generation = service.generate_text("6 * 7?", RequestType::Text).await.unwrap();
    assert_eq!(generation.text, "42");
    assert_eq!(generation.model, "current");
    assert!(!generation.degraded);

    gone.assert_async().await;
    live.assert_async().await;
}

#[tokio::test]
async fn service_health_check_over_http() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
        .match_query(Matcher::Any)
        .match_body(Matcher::Regex("respond with 'OK'".into()))
        .with_status(200)
        .with_body(candidate("OK"))
        .create_async()
        .await;

    let registry = ModelRegistry::new("gemini-2.0-flash", "gemini-1.5-flash");
    let service = GenerationService::new(Arc::new(provider(server.url())), registry, quick_policy(), true);
    assert!(service.health_check().await);
}
