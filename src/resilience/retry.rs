//! Retry orchestration
//!
//! Runs a unit of work with bounded attempts and exponential backoff with
//! jitter. Transient upstream failures are retried; a missing model or an
//! empty answer stops the loop at once, since waiting cannot fix either.
//!
//! ```text
//! attempt n fails (transient, n < max)
//!     sleep min(base * 2^(n-1), max_delay) + U[0, jitter)
//!     attempt n+1
//! loop ends with ModelUnavailable
//!     one extra call against the fallback model, outside the attempt count
//! ```

use rand::Rng;
use serde::{Serialize, Serializer};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::types::ErrorKind;
use crate::{Error, ErrorContext, Result};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1_000);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(5_000);
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(1_000);

fn as_millis<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Bounded retry configuration.
///
/// Invariants: `max_attempts >= 1` and `base_delay <= max_delay`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetryPolicy {
    max_attempts: u32,
    #[serde(rename = "base_delay_ms", serialize_with = "as_millis")]
    base_delay: Duration,
    #[serde(rename = "max_delay_ms", serialize_with = "as_millis")]
    max_delay: Duration,
    #[serde(rename = "max_jitter_ms", serialize_with = "as_millis")]
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::configuration_with_context(
                "max_attempts must be at least 1",
                ErrorContext::new()
                    .with_field_path("retry.max_attempts")
                    .with_source("retry_policy"),
            ));
        }
        if base_delay > max_delay {
            return Err(Error::configuration_with_context(
                "base_delay must not exceed max_delay",
                ErrorContext::new()
                    .with_field_path("retry.base_delay")
                    .with_details(format!(
                        "base={}ms max={}ms",
                        base_delay.as_millis(),
                        max_delay.as_millis()
                    ))
                    .with_source("retry_policy"),
            ));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            max_delay,
            max_jitter: DEFAULT_MAX_JITTER,
        })
    }

    /// Upper bound (exclusive) of the random delay added to each backoff.
    pub fn with_max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn max_jitter(&self) -> Duration {
        self.max_jitter
    }

    /// Deterministic part of the delay after failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let cap = self.max_delay.as_millis() as u64;
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(base.saturating_mul(factor).min(cap))
    }

    /// Backoff plus uniform jitter in `[0, max_jitter)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..jitter_ms)
        };
        self.backoff(attempt) + Duration::from_millis(jitter)
    }
}

/// Value produced by an orchestrated call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    /// Attempts consumed from the policy budget.
    pub attempts: u32,
    /// True when the fallback probe produced `value`.
    pub via_fallback: bool,
}

/// Executes units of work under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetryOrchestrator {
    policy: RetryPolicy,
}

impl RetryOrchestrator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` with retries. Exhaustion yields [`Error::Terminal`] wrapping
    /// the last underlying error.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<Retried<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(op, None::<fn() -> std::future::Ready<Result<T>>>)
            .await
    }

    /// Like [`execute`](Self::execute), but when the loop ends on a
    /// model-unavailable error, `fallback` is invoked exactly once before
    /// giving up.
    pub async fn execute_with_fallback<T, F, Fut, G, GFut>(&self, op: F, fallback: G) -> Result<Retried<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        G: FnOnce() -> GFut,
        GFut: Future<Output = Result<T>>,
    {
        self.run(op, Some(fallback)).await
    }

    async fn run<T, F, Fut, G, GFut>(&self, mut op: F, fallback: Option<G>) -> Result<Retried<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        G: FnOnce() -> GFut,
        GFut: Future<Output = Result<T>>,
    {
        let max = self.policy.max_attempts;
        let mut attempt = 0u32;

        let last_error = loop {
            attempt += 1;
            debug!(attempt, max_attempts = max, "executing attempt");

            let err = match op().await {
                Ok(value) => {
                    return Ok(Retried {
                        value,
                        attempts: attempt,
                        via_fallback: false,
                    })
                }
                Err(err) => err,
            };

            let kind = err.kind();
            warn!(attempt, max_attempts = max, error_kind = ?kind, error = %err, "attempt failed");

            if !kind.is_retryable() || attempt >= max {
                break err;
            }

            let delay = self.policy.delay_for(attempt);
            info!(attempt, delay_ms = delay.as_millis() as u64, "retrying after backoff");
            tokio::time::sleep(delay).await;
        };

        if last_error.kind() == ErrorKind::ModelUnavailable {
            if let Some(fallback) = fallback {
                info!(attempts = attempt, "primary path exhausted, trying fallback model");
                match fallback().await {
                    Ok(value) => {
                        warn!(
                            attempts = attempt,
                            "request served by fallback probe; answer is a placeholder"
                        );
                        return Ok(Retried {
                            value,
                            attempts: attempt,
                            via_fallback: true,
                        });
                    }
                    Err(fallback_error) => {
                        warn!(error = %fallback_error, "fallback model also failed");
                    }
                }
            }
        }

        let last_model = last_error.model().map(String::from);
        Err(Error::Terminal {
            source: Box::new(last_error),
            last_model,
            attempts: attempt,
        })
    }
}
