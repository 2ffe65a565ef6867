//! 生成服务驱动抽象层：通过 trait 将模型调用与具体厂商 API 解耦
//!
//! Generation provider abstraction. The facade talks to the upstream model
//! service only through [`GenerationProvider`], handing it a small stateless
//! [`ModelConfig`] (model identifier + generation parameters) per attempt.
//! Tests plug in fake providers; production uses [`GeminiProvider`].

pub mod gemini;

use async_trait::async_trait;
use serde::Serialize;

use crate::types::Part;
use crate::Result;

pub use gemini::GeminiProvider;

/// Sampling parameters. `None` leaves the provider default in place.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl GenerationParams {
    /// Text and code generation.
    pub const TEXT: Self = Self {
        temperature: Some(0.7),
        top_k: Some(40),
        top_p: Some(0.95),
        max_output_tokens: Some(8192),
    };

    /// Image understanding.
    pub const VISION: Self = Self {
        temperature: Some(0.4),
        top_k: Some(32),
        top_p: Some(1.0),
        max_output_tokens: Some(4096),
    };

    /// Provider defaults, used by the fallback probe.
    pub const PROBE: Self = Self {
        temperature: None,
        top_k: None,
        top_p: None,
        max_output_tokens: None,
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::PROBE
    }
}

/// One harm-category threshold sent with the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    pub fn new(category: impl Into<String>, threshold: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            threshold: threshold.into(),
        }
    }

    /// Harassment and hate speech blocked at medium probability and above.
    pub fn text_defaults() -> Vec<Self> {
        vec![
            Self::new("HARM_CATEGORY_HARASSMENT", "BLOCK_MEDIUM_AND_ABOVE"),
            Self::new("HARM_CATEGORY_HATE_SPEECH", "BLOCK_MEDIUM_AND_ABOVE"),
        ]
    }
}

/// Everything a single model invocation needs besides the content.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model: String,
    pub params: GenerationParams,
    pub safety: Vec<SafetySetting>,
}

impl ModelConfig {
    pub fn text(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            params: GenerationParams::TEXT,
            safety: SafetySetting::text_defaults(),
        }
    }

    pub fn vision(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            params: GenerationParams::VISION,
            safety: Vec::new(),
        }
    }

    pub fn probe(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            params: GenerationParams::PROBE,
            safety: Vec::new(),
        }
    }
}

/// Upstream generation service.
///
/// Implementations return the raw text (possibly empty) or an
/// [`Error::Upstream`](crate::Error::Upstream) carrying a structured
/// [`ErrorClass`](crate::error_code::ErrorClass). Deciding what counts as
/// an empty answer is the caller's job.
#[async_trait]
pub trait GenerationProvider: Send + Sync + std::fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn generate(&self, config: &ModelConfig, parts: &[Part]) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_generation_profiles() {
        let text = ModelConfig::text("gemini-2.0-flash");
        assert_eq!(text.params.max_output_tokens, Some(8192));
        assert_eq!(text.safety.len(), 2);

        let vision = ModelConfig::vision("gemini-2.0-flash");
        assert_eq!(vision.params.top_k, Some(32));
        assert!(vision.safety.is_empty());

        assert!(ModelConfig::probe("gemini-1.5-flash").params.is_empty());
    }

    #[test]
    fn params_serialize_camel_case_without_nulls() {
        let json = serde_json::to_value(GenerationParams::TEXT).unwrap();
        assert_eq!(json["maxOutputTokens"], 8192);
        assert_eq!(json["topK"], 40);
        let empty = serde_json::to_value(GenerationParams::PROBE).unwrap();
        assert_eq!(empty, serde_json::json!({}));
    }
}
