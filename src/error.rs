use crate::error_code::ErrorClass;
use crate::types::ErrorKind;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "WHYRED_RETRY_MAX_ATTEMPTS", "request.prompt")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "retry_policy", "ask_route")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the backend.
///
/// Upstream failures carry a structured [`ErrorClass`]; everything the retry
/// loop needs to decide is derived from it through [`Error::kind`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("Upstream error ({class}){}: {message}", format_model(.model))]
    Upstream {
        class: ErrorClass,
        model: Option<String>,
        status: Option<u16>,
        message: String,
    },

    #[error("Empty response from model {model}")]
    EmptyResponse { model: String },

    #[error("All attempts failed. Last error: {source}")]
    Terminal {
        #[source]
        source: Box<Error>,
        last_model: Option<String>,
        attempts: u32,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_model(model: &Option<String>) -> String {
    match model {
        Some(m) => format!(" from model {}", m),
        None => String::new(),
    }
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Upstream failure classified from structured signals and message text.
    pub fn upstream(
        model: Option<&str>,
        provider_status: Option<&str>,
        http_status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Error::Upstream {
            class: ErrorClass::classify(provider_status, http_status, &message),
            model: model.map(String::from),
            status: http_status,
            message,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Validation { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    /// Coarse kind used by the retry orchestrator.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Upstream { class, .. } => class.kind(),
            Error::EmptyResponse { .. } => ErrorKind::EmptyResponse,
            Error::Transport(_) => ErrorKind::UpstreamTransient,
            _ => ErrorKind::TerminalFailure,
        }
    }

    /// Upstream classification, looking through terminal wrappers.
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            Error::Upstream { class, .. } => Some(*class),
            Error::Terminal { source, .. } => source.class(),
            _ => None,
        }
    }

    /// Kind of the underlying failure, looking through terminal wrappers.
    pub fn root_kind(&self) -> ErrorKind {
        match self {
            Error::Terminal { source, .. } => source.root_kind(),
            other => other.kind(),
        }
    }

    /// Model identifier the failure is attributed to, if known.
    pub fn model(&self) -> Option<&str> {
        match self {
            Error::Upstream { model, .. } => model.as_deref(),
            Error::EmptyResponse { model } => Some(model),
            Error::Terminal {
                last_model, source, ..
            } => last_model.as_deref().or_else(|| source.model()),
            _ => None,
        }
    }

    /// HTTP status the API layer answers with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Upstream { class, .. } => class.http_status(),
            Error::Terminal { source, .. } => source.http_status(),
            Error::Validation { .. } => 400,
            Error::Auth(_) => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound(_) => 404,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_keeps_last_message_and_status() {
        let inner = Error::upstream(Some("gemini-1.5-flash"), Some("NOT_FOUND"), Some(404), "model gone");
        let err = Error::Terminal {
            source: Box::new(inner),
            last_model: Some("gemini-1.5-flash".into()),
            attempts: 3,
        };
        assert_eq!(err.kind(), ErrorKind::TerminalFailure);
        assert_eq!(err.root_kind(), ErrorKind::ModelUnavailable);
        assert_eq!(err.http_status(), 503);
        assert_eq!(err.model(), Some("gemini-1.5-flash"));
        assert!(err.to_string().contains("model gone"));
    }

    #[test]
    fn empty_response_kind() {
        let err = Error::EmptyResponse {
            model: "gemini-2.0-flash".into(),
        };
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn context_is_rendered() {
        let err = Error::configuration_with_context(
            "base delay exceeds max delay",
            ErrorContext::new()
                .with_field_path("WHYRED_RETRY_BASE_DELAY_MS")
                .with_source("retry_policy"),
        );
        let text = err.to_string();
        assert!(text.contains("field: WHYRED_RETRY_BASE_DELAY_MS"));
        assert!(text.contains("source: retry_policy"));
        assert!(err.context().is_some());
    }
}
