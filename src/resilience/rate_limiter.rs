use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiterSnapshot {
    pub rps: f64,
    pub burst: f64,
    pub tokens: f64,
    /// Estimated wait time until a token is available (ms), if currently empty.
    pub estimated_wait_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiterConfig {
    /// Tokens per second.
    pub rps: f64,
    /// Maximum burst size (tokens).
    pub burst: f64,
}

impl RateLimiterConfig {
    pub fn new() -> Self {
        Self {
            rps: 0.0,
            burst: 1.0,
        }
    }

    /// `max` requests per `window`, available as an initial burst and
    /// refilled evenly over the window.
    pub fn per_window(max: u32, window: Duration) -> Option<Self> {
        let secs = window.as_secs_f64();
        if max == 0 || secs <= 0.0 {
            return None;
        }
        Some(Self {
            rps: f64::from(max) / secs,
            burst: f64::from(max),
        })
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.burst = f64::from(max.max(1));
        self
    }

    pub fn with_refill_rate(mut self, rate: f64) -> Self {
        self.rps = if rate.is_finite() && rate > 0.0 { rate } else { 0.0 };
        self
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

/// Token-bucket rate limiter with one bucket per key (client address).
///
/// - `rps == 0` disables refill; a drained bucket stays drained
/// - Idle full buckets are dropped by [`prune`](Self::prune)
pub struct KeyedRateLimiter {
    cfg: RateLimiterConfig,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl KeyedRateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        Self {
            cfg,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.cfg
    }

    fn refill_locked(cfg: &RateLimiterConfig, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last).as_secs_f64();
        if elapsed > 0.0 {
            bucket.tokens = (bucket.tokens + elapsed * cfg.rps).min(cfg.burst);
            bucket.last = now;
        }
    }

    /// Take one token for `key` without waiting. Returns false when the key
    /// is over its budget.
    pub async fn try_acquire(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: self.cfg.burst,
            last: Instant::now(),
        });
        Self::refill_locked(&self.cfg, bucket);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub async fn snapshot(&self, key: &str) -> RateLimiterSnapshot {
        let mut buckets = self.buckets.lock().await;
        let tokens = match buckets.get_mut(key) {
            Some(bucket) => {
                Self::refill_locked(&self.cfg, bucket);
                bucket.tokens
            }
            None => self.cfg.burst,
        };
        let estimated_wait_ms = if tokens >= 1.0 || self.cfg.rps <= 0.0 {
            None
        } else {
            Some((((1.0 - tokens) / self.cfg.rps) * 1000.0).ceil() as u64)
        };
        RateLimiterSnapshot {
            rps: self.cfg.rps,
            burst: self.cfg.burst,
            tokens,
            estimated_wait_ms,
        }
    }

    /// Drop buckets that have refilled completely. Returns how many remain.
    pub async fn prune(&self) -> usize {
        let mut buckets = self.buckets.lock().await;
        let cfg = &self.cfg;
        buckets.retain(|_, bucket| {
            Self::refill_locked(cfg, bucket);
            bucket.tokens < cfg.burst
        });
        buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_per_window() {
        let config = RateLimiterConfig::per_window(100, Duration::from_secs(900)).unwrap();
        assert_eq!(config.burst, 100.0);
        assert!((config.rps - 100.0 / 900.0).abs() < f64::EPSILON);
        assert!(RateLimiterConfig::per_window(0, Duration::from_secs(1)).is_none());
        assert!(RateLimiterConfig::per_window(5, Duration::ZERO).is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = RateLimiterConfig::new()
            .with_max_tokens(100)
            .with_refill_rate(50.0);
        assert_eq!(config.burst, 100.0);
        assert_eq!(config.rps, 50.0);
        assert_eq!(RateLimiterConfig::new().with_refill_rate(f64::NAN).rps, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_have_separate_budgets() {
        let limiter = KeyedRateLimiter::new(RateLimiterConfig::new().with_max_tokens(2));

        assert!(limiter.try_acquire("10.0.0.1").await);
        assert!(limiter.try_acquire("10.0.0.1").await);
        assert!(!limiter.try_acquire("10.0.0.1").await);

        assert!(limiter.try_acquire("10.0.0.2").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_over_window() {
        let config = RateLimiterConfig::per_window(2, Duration::from_secs(10)).unwrap();
        let limiter = KeyedRateLimiter::new(config);

        assert!(limiter.try_acquire("a").await);
        assert!(limiter.try_acquire("a").await);
        assert!(!limiter.try_acquire("a").await);

        let snapshot = limiter.snapshot("a").await;
        assert_eq!(snapshot.estimated_wait_ms, Some(5000));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(limiter.try_acquire("a").await);
        assert!(!limiter.try_acquire("a").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_drops_full_buckets() {
        let config = RateLimiterConfig::per_window(1, Duration::from_secs(1)).unwrap();
        let limiter = KeyedRateLimiter::new(config);
        assert!(limiter.try_acquire("a").await);
        assert!(limiter.try_acquire("b").await);
        assert_eq!(limiter.prune().await, 2);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(limiter.prune().await, 0);
    }
}
