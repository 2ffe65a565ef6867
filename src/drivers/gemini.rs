//! Gemini generateContent 驱动：请求构造、响应解析与错误分类
//!
//! Google Gemini `generateContent` REST driver.
//! - Endpoint: `{base}/v1beta/models/{model}:generateContent`, API key in the
//!   `x-goog-api-key` header.
//! - Body: `contents[0].parts` (text / `inline_data` with base64 payload),
//!   optional `generationConfig` and `safetySettings`.
//! - Response text: concatenation of the text parts of `candidates[0]`.
//! - Errors: `{ "error": { "code", "message", "status" } }`, classified by
//!   `status` first, then HTTP status, then message text.

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, warn};

use super::{GenerationProvider, ModelConfig};
use crate::transport::{HttpClientConfig, API_KEY_HEADER};
use crate::types::Part;
use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::with_client(HttpClientConfig::from_env().build()?, api_key))
    }

    pub fn with_client(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Point the driver at another host (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Accepts both `gemini-2.0-flash` and `models/gemini-2.0-flash`.
    fn endpoint(&self, model: &str) -> String {
        let id = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/v1beta/models/{}:generateContent", self.base_url, id)
    }

    pub(crate) fn build_body(config: &ModelConfig, parts: &[Part]) -> Value {
        let parts: Vec<Value> = parts
            .iter()
            .map(|p| match p {
                Part::Text(text) => json!({ "text": text }),
                Part::InlineData { media_type, data } => json!({
                    "inline_data": {
                        "mime_type": media_type,
                        "data": base64::engine::general_purpose::STANDARD.encode(data),
                    }
                }),
            })
            .collect();

        let mut body = json!({
            "contents": [{ "role": "user", "parts": parts }],
        });
        if !config.params.is_empty() {
            body["generationConfig"] = json!(config.params);
        }
        if !config.safety.is_empty() {
            body["safetySettings"] = json!(config.safety);
        }
        body
    }

    /// Concatenated text of the first candidate; empty when there is none
    /// (blocked prompt, safety stop, no candidates).
    pub(crate) fn extract_text(body: &Value) -> String {
        body.pointer("/candidates/0/content/parts")
            .and_then(|p| p.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn error_from_body(model: &str, status: u16, body: &str) -> Error {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let err = parsed.as_ref().and_then(|v| v.get("error"));
        let provider_status = err
            .and_then(|e| e.get("status"))
            .and_then(|s| s.as_str());
        let message = err
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(String::from)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body.chars().take(500).collect()
                }
            });
        Error::upstream(Some(model), provider_status, Some(status), message)
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, config: &ModelConfig, parts: &[Part]) -> Result<String> {
        let started = Instant::now();
        let body = Self::build_body(config, parts);

        let response = self
            .client
            .post(self.endpoint(&config.model))
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let class_hint = if e.is_timeout() { Some("DEADLINE_EXCEEDED") } else { None };
                Error::upstream(Some(&config.model), class_hint, None, e.without_url().to_string())
            })?;

        let status = response.status();
        let text = response.text().await?;
        let duration_ms = started.elapsed().as_millis() as u64;

        if !status.is_success() {
            let err = Self::error_from_body(&config.model, status.as_u16(), &text);
            warn!(
                model = %config.model,
                http_status = status.as_u16(),
                duration_ms,
                error = %err,
                "gemini request failed"
            );
            return Err(err);
        }

        let json: Value = serde_json::from_str(&text)?;
        let out = Self::extract_text(&json);
        debug!(
            model = %config.model,
            duration_ms,
            response_len = out.len(),
            "gemini request completed"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_code::ErrorClass;
    use crate::types::ErrorKind;

    #[test]
    fn test_build_body_text_preset() {
        let config = ModelConfig::text("gemini-2.0-flash");
        let body = GeminiProvider::build_body(&config, &[Part::text("Hello")]);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(body["generationConfig"]["temperature"].as_f64().map(|t| (t * 10.0).round()), Some(7.0));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(body["safetySettings"][1]["category"], "HARM_CATEGORY_HATE_SPEECH");
    }

    #[test]
    fn test_build_body_inline_media() {
        let config = ModelConfig::vision("gemini-2.0-flash");
        let parts = [
            Part::text("What is this?"),
            Part::InlineData {
                media_type: "image/png".into(),
                data: b"abc".to_vec(),
            },
        ];
        let body = GeminiProvider::build_body(&config, &parts);
        let inline = &body["contents"][0]["parts"][1]["inline_data"];
        assert_eq!(inline["mime_type"], "image/png");
        assert_eq!(inline["data"], "YWJj");
        assert!(body.get("safetySettings").is_none());
    }

    #[test]
    fn test_probe_omits_generation_config() {
        let body = GeminiProvider::build_body(&ModelConfig::probe("m"), &[Part::text("hi")]);
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_extract_text_concatenates_parts() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{"text": "Hel"}, {"text": "lo"}], "role": "model" },
                "finishReason": "STOP"
            }]
        });
        assert_eq!(GeminiProvider::extract_text(&body), "Hello");
        assert_eq!(GeminiProvider::extract_text(&json!({"candidates": []})), "");
    }

    #[test]
    fn test_endpoint_strips_models_prefix() {
        let p = GeminiProvider::with_client(reqwest::Client::new(), "k").with_base_url("http://x/");
        assert_eq!(
            p.endpoint("models/gemini-2.0-flash"),
            "http://x/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_error_classification_from_body() {
        let body = r#"{"error":{"code":404,"message":"models/gemini-x is not found for API version v1beta","status":"NOT_FOUND"}}"#;
        let err = GeminiProvider::error_from_body("gemini-x", 404, body);
        assert_eq!(err.class(), Some(ErrorClass::ModelNotFound));
        assert_eq!(err.kind(), ErrorKind::ModelUnavailable);

        let err = GeminiProvider::error_from_body("m", 429, "");
        assert_eq!(err.class(), Some(ErrorClass::RateLimited));
        assert!(err.to_string().contains("HTTP 429"));
    }
}
