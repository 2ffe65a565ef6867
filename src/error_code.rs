//! 上游错误分类：将 HTTP 状态、Gemini 错误状态与错误消息映射为统一的错误类别。
//!
//! Upstream error classification.
//!
//! The generation provider reports failures in three shapes, in decreasing
//! order of reliability:
//!
//! | Signal | Example | Mapper |
//! |--------|---------|--------|
//! | provider status string | `"NOT_FOUND"`, `"RESOURCE_EXHAUSTED"` | [`ErrorClass::from_provider_status`] |
//! | HTTP status | `404`, `429` | [`ErrorClass::from_http_status`] |
//! | human-readable message | `"model ... not found"` | [`ErrorClass::from_message`] |
//!
//! Message inspection is a last resort used only at the integration boundary,
//! when neither structured signal is available.
//!
//! ## Example
//!
//! ```rust
//! use whyred_backend::error_code::ErrorClass;
//! use whyred_backend::ErrorKind;
//!
//! let class = ErrorClass::from_provider_status("NOT_FOUND").unwrap();
//! assert_eq!(class, ErrorClass::ModelNotFound);
//! assert_eq!(class.kind(), ErrorKind::ModelUnavailable);
//! ```

use serde::Serialize;
use std::fmt;

use crate::types::ErrorKind;

/// Structured classification of a failed upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Malformed request or invalid argument
    InvalidRequest,
    /// Invalid, expired, or missing API key
    Authentication,
    /// Valid credentials but insufficient permissions
    PermissionDenied,
    /// Requested model identifier does not exist or was retired
    ModelNotFound,
    /// Request rate limit exceeded
    RateLimited,
    /// Account quota or billing limit reached
    QuotaExhausted,
    /// Internal error on the provider side
    ServerError,
    /// Provider temporarily overloaded
    Overloaded,
    /// Request timed out before a response arrived
    Timeout,
    /// Could not be classified
    Unknown,
}

impl ErrorClass {
    /// Returns the standard name (e.g., `"model_not_found"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Authentication => "authentication",
            Self::PermissionDenied => "permission_denied",
            Self::ModelNotFound => "model_not_found",
            Self::RateLimited => "rate_limited",
            Self::QuotaExhausted => "quota_exhausted",
            Self::ServerError => "server_error",
            Self::Overloaded => "overloaded",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }

    /// Coarse kind driving retry and model escalation.
    ///
    /// Only a missing model is escalated to the next identifier; everything
    /// else is treated as transient and goes through backoff.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ModelNotFound => ErrorKind::ModelUnavailable,
            _ => ErrorKind::UpstreamTransient,
        }
    }

    /// HTTP status the outer API layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Authentication | Self::PermissionDenied => 401,
            Self::RateLimited | Self::QuotaExhausted => 429,
            Self::ModelNotFound => 503,
            _ => 500,
        }
    }

    /// Maps a Gemini `error.status` string (Google RPC code name).
    pub fn from_provider_status(status: &str) -> Option<Self> {
        let class = match status {
            "INVALID_ARGUMENT" | "FAILED_PRECONDITION" | "OUT_OF_RANGE" => Self::InvalidRequest,
            "UNAUTHENTICATED" => Self::Authentication,
            "PERMISSION_DENIED" => Self::PermissionDenied,
            "NOT_FOUND" => Self::ModelNotFound,
            "RESOURCE_EXHAUSTED" => Self::RateLimited,
            "INTERNAL" | "UNKNOWN" | "DATA_LOSS" => Self::ServerError,
            "UNAVAILABLE" => Self::Overloaded,
            "DEADLINE_EXCEEDED" | "CANCELLED" => Self::Timeout,
            _ => return None,
        };
        Some(class)
    }

    /// Maps an HTTP status code to the most likely class.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidRequest,
            401 => Self::Authentication,
            403 => Self::PermissionDenied,
            404 => Self::ModelNotFound,
            408 | 504 => Self::Timeout,
            429 => Self::RateLimited, // could be quota; rate limit is the common case
            500 | 502 => Self::ServerError,
            503 => Self::Overloaded,
            _ => Self::Unknown,
        }
    }

    /// Heuristic mapping from a free-text error message.
    ///
    /// Fragile by nature; only used when the provider gave no structured status.
    pub fn from_message(message: &str) -> Self {
        let m = message.to_lowercase();
        if m.contains("not found") || m.contains("404") || m.contains("is not supported for") {
            Self::ModelNotFound
        } else if m.contains("api key") || m.contains("authentication") {
            Self::Authentication
        } else if m.contains("quota") {
            Self::QuotaExhausted
        } else if m.contains("rate limit") || m.contains("too many requests") {
            Self::RateLimited
        } else if m.contains("timed out") || m.contains("timeout") {
            Self::Timeout
        } else if m.contains("overloaded") || m.contains("unavailable") {
            Self::Overloaded
        } else {
            Self::Unknown
        }
    }

    /// Classify from every signal available, most structured first.
    pub fn classify(provider_status: Option<&str>, http_status: Option<u16>, message: &str) -> Self {
        if let Some(class) = provider_status.and_then(Self::from_provider_status) {
            return class;
        }
        if let Some(class) = http_status.map(Self::from_http_status) {
            if class != Self::Unknown {
                return class;
            }
        }
        Self::from_message(message)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_status_wins_over_http_status() {
        let class = ErrorClass::classify(Some("RESOURCE_EXHAUSTED"), Some(404), "");
        assert_eq!(class, ErrorClass::RateLimited);
    }

    #[test]
    fn unknown_http_status_falls_back_to_message() {
        let class = ErrorClass::classify(None, Some(418), "models/gemini-x is not found");
        assert_eq!(class, ErrorClass::ModelNotFound);
    }

    #[test]
    fn only_missing_model_escalates() {
        assert_eq!(ErrorClass::ModelNotFound.kind(), ErrorKind::ModelUnavailable);
        for class in [
            ErrorClass::RateLimited,
            ErrorClass::Authentication,
            ErrorClass::ServerError,
            ErrorClass::Timeout,
            ErrorClass::Unknown,
        ] {
            assert_eq!(class.kind(), ErrorKind::UpstreamTransient, "{class}");
        }
    }

    #[test]
    fn http_status_for_api_layer() {
        assert_eq!(ErrorClass::Authentication.http_status(), 401);
        assert_eq!(ErrorClass::QuotaExhausted.http_status(), 429);
        assert_eq!(ErrorClass::ModelNotFound.http_status(), 503);
        assert_eq!(ErrorClass::Overloaded.http_status(), 500);
    }

    #[test]
    fn message_heuristics() {
        assert_eq!(ErrorClass::from_message("API key not valid"), ErrorClass::Authentication);
        assert_eq!(ErrorClass::from_message("Quota exceeded for metric"), ErrorClass::QuotaExhausted);
        assert_eq!(ErrorClass::from_message("connection reset"), ErrorClass::Unknown);
    }
}
