//! Generation results.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Error;

/// Coarse failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network or rate-limit failure; retried with backoff.
    UpstreamTransient,
    /// Model identifier not found or retired; escalated to the next model.
    ModelUnavailable,
    /// Upstream answered without usable text.
    EmptyResponse,
    /// All models and retries exhausted, or a non-upstream failure.
    TerminalFailure,
}

impl ErrorKind {
    /// Only transient upstream failures are worth waiting for.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::UpstreamTransient)
    }
}

/// Text produced by a generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
    pub text: String,
    /// Model identifier that produced `text`.
    pub model: String,
    /// Number of orchestrator attempts used, fallback probe excluded.
    pub attempts: u32,
    /// Set when the post-exhaustion fallback probe answered. The probe uses a
    /// canned prompt, so `text` does not answer the caller's prompt.
    pub degraded: bool,
}

/// Serializable envelope handed back to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Success {
        text: String,
        model: String,
        degraded: bool,
        timestamp: DateTime<Utc>,
    },
    Failure {
        error_kind: ErrorKind,
        message: String,
        last_model: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl GenerationOutcome {
    pub fn from_result(result: &Result<Generation, Error>) -> Self {
        let timestamp = Utc::now();
        match result {
            Ok(g) => GenerationOutcome::Success {
                text: g.text.clone(),
                model: g.model.clone(),
                degraded: g.degraded,
                timestamp,
            },
            Err(e) => GenerationOutcome::Failure {
                error_kind: e.kind(),
                message: e.to_string(),
                last_model: e.model().map(String::from),
                timestamp,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success { .. })
    }
}
