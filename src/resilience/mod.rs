//! 弹性模块：重试编排与按客户端限流。
//!
//! # Resilience Primitives
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`retry`] | Bounded retry with exponential backoff, jitter and a one-shot fallback |
//! | [`rate_limiter`] | Token bucket limiter keyed by client address |
//!
//! ## Retry
//!
//! ```rust
//! use std::time::Duration;
//! use whyred_backend::resilience::retry::{RetryOrchestrator, RetryPolicy};
//!
//! # async fn demo() -> whyred_backend::Result<()> {
//! let policy = RetryPolicy::new(3, Duration::from_millis(200), Duration::from_secs(2))?;
//! let orchestrator = RetryOrchestrator::new(policy);
//! let out = orchestrator.execute(|| async { Ok::<_, whyred_backend::Error>(42) }).await?;
//! assert_eq!(out.value, 42);
//! # Ok(())
//! # }
//! ```
//!
//! ## Rate Limiter
//!
//! ```rust
//! use std::time::Duration;
//! use whyred_backend::resilience::rate_limiter::{KeyedRateLimiter, RateLimiterConfig};
//!
//! # async fn demo() {
//! let config = RateLimiterConfig::per_window(100, Duration::from_secs(900)).unwrap();
//! let limiter = KeyedRateLimiter::new(config);
//! if limiter.try_acquire("203.0.113.7").await {
//!     // handle request
//! }
//! # }
//! ```

pub mod rate_limiter;
pub mod retry;

pub use rate_limiter::{KeyedRateLimiter, RateLimiterConfig};
pub use retry::{Retried, RetryOrchestrator, RetryPolicy};
