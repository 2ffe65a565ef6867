use crate::Result;
use std::env;
use std::time::Duration;

/// Google API key header. Keeps keys out of request URLs, and so out of
/// error text and logs.
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Connection settings for the outbound `reqwest` client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl HttpClientConfig {
    /// Defaults overridden by `WHYRED_HTTP_TIMEOUT_SECS`,
    /// `WHYRED_HTTP_POOL_MAX_IDLE_PER_HOST` and `WHYRED_HTTP_POOL_IDLE_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: env::var("WHYRED_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            pool_max_idle_per_host: env::var("WHYRED_HTTP_POOL_MAX_IDLE_PER_HOST")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(defaults.pool_max_idle_per_host),
            pool_idle_timeout: env::var("WHYRED_HTTP_POOL_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.pool_idle_timeout),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(Some(self.pool_idle_timeout))
            .user_agent(concat!("whyred-backend/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| crate::Error::Transport(TransportError::Other(e.to_string())))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

/// The request URL is dropped so query parameters never reach error text.
impl From<reqwest::Error> for crate::Error {
    fn from(e: reqwest::Error) -> Self {
        crate::Error::Transport(TransportError::Http(e.without_url()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_defaults() {
        let cfg = HttpClientConfig::default().with_timeout(Duration::from_secs(5));
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert!(cfg.build().is_ok());
    }
}
