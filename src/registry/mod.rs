//! 模型注册表：将请求类型映射到按优先级排列的模型标识符集合
//!
//! Model registry: a static mapping from [`RequestType`] to the ordered
//! [`ModelSet`] the facade walks through. Read-only after construction and
//! shared freely between concurrent requests.

use serde::Serialize;

use crate::types::RequestType;
use crate::{Error, ErrorContext, Result};

pub const DEFAULT_PRIMARY_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_FALLBACK_MODEL: &str = "gemini-1.5-flash";

/// Ordered model identifiers to try for one request type.
///
/// Only built by [`ModelRegistry::model_set`], so never empty: the first
/// entry is the primary model and the last is the registry's fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModelSet {
    models: Vec<String>,
}

impl ModelSet {
    pub fn primary(&self) -> &str {
        &self.models[0]
    }

    pub fn fallback(&self) -> &str {
        &self.models[self.models.len() - 1]
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(String::as_str)
    }
}

/// Request type → model identifiers, plus global alternates and a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelRegistry {
    text: String,
    vision: String,
    code: String,
    fallback: String,
    alternatives: Vec<String>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self {
            text: DEFAULT_PRIMARY_MODEL.to_string(),
            vision: DEFAULT_PRIMARY_MODEL.to_string(),
            code: DEFAULT_PRIMARY_MODEL.to_string(),
            fallback: DEFAULT_FALLBACK_MODEL.to_string(),
            alternatives: vec![
                "gemini-2.0-flash-exp".to_string(),
                "gemini-2.0-flash".to_string(),
                "models/gemini-2.0-flash-exp".to_string(),
                "models/gemini-2.0-flash".to_string(),
            ],
        }
    }
}

impl ModelRegistry {
    /// Registry using one primary model for every request type.
    pub fn new(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        let primary = primary.into();
        Self {
            text: primary.clone(),
            vision: primary.clone(),
            code: primary,
            fallback: fallback.into(),
            alternatives: Vec::new(),
        }
    }

    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text = model.into();
        self
    }

    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision = model.into();
        self
    }

    pub fn with_code_model(mut self, model: impl Into<String>) -> Self {
        self.code = model.into();
        self
    }

    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback = model.into();
        self
    }

    pub fn with_alternatives(mut self, alternatives: Vec<String>) -> Self {
        self.alternatives = alternatives;
        self
    }

    /// Primary model for a request type. Search requests use the text model.
    pub fn primary_for(&self, request_type: RequestType) -> &str {
        match request_type {
            RequestType::Text | RequestType::Search => &self.text,
            RequestType::Vision => &self.vision,
            RequestType::Code => &self.code,
        }
    }

    pub fn fallback_model(&self) -> &str {
        &self.fallback
    }

    pub fn alternatives(&self) -> &[String] {
        &self.alternatives
    }

    /// Models to try for `request_type`: primary, then alternates, then the
    /// fallback. Repeated identifiers are tried once, at their first position,
    /// except the fallback which always stays last.
    pub fn model_set(&self, request_type: RequestType) -> ModelSet {
        let mut models: Vec<String> = Vec::with_capacity(self.alternatives.len() + 2);
        let candidates = std::iter::once(self.primary_for(request_type))
            .chain(self.alternatives.iter().map(String::as_str));
        for model in candidates {
            let model = model.trim();
            if model.is_empty() || model == self.fallback || models.iter().any(|m| m == model) {
                continue;
            }
            models.push(model.to_string());
        }
        models.push(self.fallback.clone());
        ModelSet { models }
    }

    /// Ensure every configured identifier is usable.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("text", &self.text),
            ("vision", &self.vision),
            ("code", &self.code),
            ("fallback", &self.fallback),
        ] {
            if value.trim().is_empty() {
                return Err(Error::configuration_with_context(
                    "model identifier must not be empty",
                    ErrorContext::new()
                        .with_field_path(format!("models.{}", field))
                        .with_source("model_registry"),
                ));
            }
        }
        Ok(())
    }
}
