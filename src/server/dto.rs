use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::facade::ModelInfo;
use crate::search::SearchResult;
use crate::store::ChatRecord;
use crate::types::MediaPart;

pub const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default = "default_type", rename = "type")]
    pub kind: String,
    pub image_data: Option<String>,
    pub mime_type: Option<String>,
}

fn default_type() -> String {
    "text".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    pub response: String,
    pub timestamp: DateTime<Utc>,
    pub processing_time: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub model: String,
    pub degraded: bool,
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct TestRequest {
    #[serde(default = "default_test_prompt")]
    pub prompt: String,
}

fn default_test_prompt() -> String {
    "Hello, this is a test message.".to_string()
}

#[derive(Debug, Serialize)]
pub struct TestResponse {
    pub response: String,
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub info: ModelInfo,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub response: String,
    pub sources: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    #[serde(default)]
    pub prompt: String,
    pub image_data: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub response: String,
    pub timestamp: DateTime<Utc>,
    pub processing_time: f64,
    pub model: String,
    pub degraded: bool,
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<ChatRecord>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Decode a base64 image, accepting `data:<type>;base64,` URIs. The media
/// type comes from `mime_type`, then the data URI, then the JPEG default.
pub fn decode_image(data: &str, mime_type: Option<&str>) -> Result<MediaPart, ApiError> {
    let (uri_type, payload) = match data.strip_prefix("data:") {
        Some(rest) => match rest.split_once(";base64,") {
            Some((media_type, payload)) => (Some(media_type), payload),
            None => return Err(ApiError::bad_request("Unsupported image data URI")),
        },
        None => (None, data),
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|_| ApiError::bad_request("Image data is not valid base64"))?;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("Image data is empty"));
    }

    let media_type = mime_type
        .filter(|m| !m.trim().is_empty())
        .or(uri_type.filter(|m| !m.is_empty()))
        .unwrap_or(DEFAULT_MEDIA_TYPE);
    Ok(MediaPart::new(bytes, media_type))
}

/// Milliseconds elapsed since `start`, fractional.
pub fn elapsed_ms(start: std::time::Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_plain_base64() {
        let media = decode_image("aGVsbG8=", None).unwrap();
        assert_eq!(media.data, b"hello");
        assert_eq!(media.media_type, "image/jpeg");
    }

    #[test]
    fn decode_data_uri_keeps_type() {
        let media = decode_image("data:image/png;base64,aGVsbG8=", None).unwrap();
        assert_eq!(media.media_type, "image/png");
        let media = decode_image("data:image/png;base64,aGVsbG8=", Some("image/webp")).unwrap();
        assert_eq!(media.media_type, "image/webp");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_image("***", None).is_err());
        assert!(decode_image("", None).is_err());
        assert!(decode_image("data:image/png,raw", None).is_err());
    }

    #[test]
    fn ask_request_defaults() {
        let req: AskRequest = serde_json::from_str(r#"{"prompt":"hi"}"#).unwrap();
        assert_eq!(req.kind, "text");
        assert!(req.image_data.is_none());
    }
}
