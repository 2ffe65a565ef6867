//! 运行时配置：从进程环境变量读取服务、重试与模型设置。
//!
//! # Configuration
//!
//! Everything is read from the process environment (the binary loads a
//! `.env` file first). Numeric knobs that fail to parse keep their default;
//! only a retry policy that violates its invariants is rejected.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `GEMINI_API_KEY` | unset |
//! | `GEMINI_BASE_URL` | `https://generativelanguage.googleapis.com` |
//! | `GOOGLE_SEARCH_API_KEY` / `GOOGLE_SEARCH_ENGINE_ID` | unset |
//! | `GOOGLE_SEARCH_URL` | `https://www.googleapis.com/customsearch/v1` |
//! | `FIREBASE_API_KEY` | unset |
//! | `ALLOWED_ORIGINS` | `http://localhost:3000` |
//! | `HOST` / `PORT` | `0.0.0.0` / `8000` |
//! | `WHYRED_RETRY_MAX_ATTEMPTS` | `3` |
//! | `WHYRED_RETRY_BASE_DELAY_MS` / `WHYRED_RETRY_MAX_DELAY_MS` | `1000` / `5000` |
//! | `WHYRED_RETRY_JITTER_MS` | `1000` |
//! | `WHYRED_HTTP_TIMEOUT_SECS` | `30` |
//! | `WHYRED_HTTP_POOL_MAX_IDLE_PER_HOST` / `WHYRED_HTTP_POOL_IDLE_TIMEOUT_SECS` | `32` / `90` |
//! | `WHYRED_RATE_LIMIT_MAX` / `WHYRED_RATE_LIMIT_WINDOW_SECS` | `100` / `900` |
//! | `WHYRED_STREAM_CHUNK_DELAY_MS` | `50` |
//! | `WHYRED_MODEL_TEXT` / `_VISION` / `_CODE` / `_FALLBACK` | registry defaults |
//! | `WHYRED_MODEL_ALTERNATIVES` | comma list, registry defaults |

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::drivers::gemini::DEFAULT_BASE_URL;
use crate::registry::ModelRegistry;
use crate::resilience::retry::{self, RetryPolicy};
use crate::search::DEFAULT_SEARCH_URL;
use crate::transport::HttpClientConfig;
use crate::{Error, ErrorContext, Result};

pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_STREAM_CHUNK_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub search_api_key: Option<String>,
    pub search_engine_id: Option<String>,
    pub search_url: String,
    pub firebase_api_key: Option<String>,
    pub allowed_origins: Vec<String>,
    pub host: String,
    pub port: u16,
    pub retry: RetryPolicy,
    pub http: HttpClientConfig,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub stream_chunk_delay: Duration,
    pub models: ModelRegistry,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_base_url: DEFAULT_BASE_URL.to_string(),
            search_api_key: None,
            search_engine_id: None,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            firebase_api_key: None,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            retry: RetryPolicy::default(),
            http: HttpClientConfig::default(),
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window: DEFAULT_RATE_LIMIT_WINDOW,
            stream_chunk_delay: DEFAULT_STREAM_CHUNK_DELAY,
            models: ModelRegistry::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an explicit variable table instead of the process environment.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let number = |key: &str| text(key).and_then(|v| parse_or_warn::<u64>(key, &v));

        let defaults = Self::default();

        let max_attempts = text("WHYRED_RETRY_MAX_ATTEMPTS")
            .and_then(|v| parse_or_warn::<u32>("WHYRED_RETRY_MAX_ATTEMPTS", &v))
            .unwrap_or(retry::DEFAULT_MAX_ATTEMPTS);
        let base_delay = number("WHYRED_RETRY_BASE_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(retry::DEFAULT_BASE_DELAY);
        let max_delay = number("WHYRED_RETRY_MAX_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(retry::DEFAULT_MAX_DELAY);
        let jitter = number("WHYRED_RETRY_JITTER_MS")
            .map(Duration::from_millis)
            .unwrap_or(retry::DEFAULT_MAX_JITTER);
        let retry = RetryPolicy::new(max_attempts, base_delay, max_delay)?.with_max_jitter(jitter);

        let mut http = defaults.http.clone();
        if let Some(secs) = number("WHYRED_HTTP_TIMEOUT_SECS") {
            http = http.with_timeout(Duration::from_secs(secs));
        }
        if let Some(n) = number("WHYRED_HTTP_POOL_MAX_IDLE_PER_HOST") {
            http.pool_max_idle_per_host = n as usize;
        }
        if let Some(secs) = number("WHYRED_HTTP_POOL_IDLE_TIMEOUT_SECS") {
            http.pool_idle_timeout = Duration::from_secs(secs);
        }

        let port = text("PORT")
            .and_then(|v| parse_or_warn::<u16>("PORT", &v))
            .unwrap_or(defaults.port);

        let allowed_origins = text("ALLOWED_ORIGINS")
            .map(|v| split_list(&v))
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.allowed_origins);

        let mut models = defaults.models;
        if let Some(m) = text("WHYRED_MODEL_TEXT") {
            models = models.with_text_model(m);
        }
        if let Some(m) = text("WHYRED_MODEL_VISION") {
            models = models.with_vision_model(m);
        }
        if let Some(m) = text("WHYRED_MODEL_CODE") {
            models = models.with_code_model(m);
        }
        if let Some(m) = text("WHYRED_MODEL_FALLBACK") {
            models = models.with_fallback_model(m);
        }
        if let Some(list) = text("WHYRED_MODEL_ALTERNATIVES") {
            models = models.with_alternatives(split_list(&list));
        }
        models.validate()?;

        let rate_limit_max = text("WHYRED_RATE_LIMIT_MAX")
            .and_then(|v| parse_or_warn::<u32>("WHYRED_RATE_LIMIT_MAX", &v))
            .filter(|n| *n > 0)
            .unwrap_or(defaults.rate_limit_max);

        Ok(Self {
            gemini_api_key: text("GEMINI_API_KEY"),
            gemini_base_url: text("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            search_api_key: text("GOOGLE_SEARCH_API_KEY"),
            search_engine_id: text("GOOGLE_SEARCH_ENGINE_ID"),
            search_url: text("GOOGLE_SEARCH_URL").unwrap_or(defaults.search_url),
            firebase_api_key: text("FIREBASE_API_KEY"),
            allowed_origins,
            host: text("HOST").unwrap_or(defaults.host),
            port,
            retry,
            http,
            rate_limit_max,
            rate_limit_window: number("WHYRED_RATE_LIMIT_WINDOW_SECS")
                .filter(|n| *n > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_window),
            stream_chunk_delay: number("WHYRED_STREAM_CHUNK_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.stream_chunk_delay),
            models,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| {
            Error::configuration_with_context(
                "invalid listen address",
                ErrorContext::new()
                    .with_field_path("HOST")
                    .with_details(raw.clone())
                    .with_source("app_config"),
            )
        })
    }
}

fn parse_or_warn<T: FromStr>(key: &str, value: &str) -> Option<T> {
    match value.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value, "ignoring unparsable setting, using default");
            None
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestType;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_when_empty() {
        let cfg = AppConfig::from_map(&HashMap::new()).unwrap();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(cfg.retry, RetryPolicy::default());
        assert_eq!(cfg.rate_limit_window, Duration::from_secs(900));
        assert!(cfg.gemini_api_key.is_none());
    }

    #[test]
    fn overrides_and_lists() {
        let cfg = AppConfig::from_map(&vars(&[
            ("GEMINI_API_KEY", "k"),
            ("ALLOWED_ORIGINS", "https://a.dev, https://b.dev"),
            ("PORT", "9000"),
            ("WHYRED_RETRY_MAX_ATTEMPTS", "5"),
            ("WHYRED_MODEL_TEXT", "gemini-2.5-flash"),
            ("WHYRED_MODEL_ALTERNATIVES", "gemini-2.0-flash"),
        ]))
        .unwrap();
        assert_eq!(cfg.gemini_api_key.as_deref(), Some("k"));
        assert_eq!(cfg.allowed_origins, vec!["https://a.dev", "https://b.dev"]);
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.retry.max_attempts(), 5);
        assert_eq!(
            cfg.models.model_set(RequestType::Text).models(),
            &["gemini-2.5-flash", "gemini-2.0-flash", "gemini-1.5-flash"]
        );
    }

    #[test]
    fn unparsable_numbers_keep_defaults() {
        let cfg = AppConfig::from_map(&vars(&[("PORT", "eighty"), ("WHYRED_RETRY_BASE_DELAY_MS", "-1")])).unwrap();
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.retry.base_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let err = AppConfig::from_map(&vars(&[
            ("WHYRED_RETRY_BASE_DELAY_MS", "9000"),
            ("WHYRED_RETRY_MAX_DELAY_MS", "100"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));

        assert!(AppConfig::from_map(&vars(&[("WHYRED_RETRY_MAX_ATTEMPTS", "0")])).is_err());
    }

    #[test]
    fn socket_addr_parses() {
        let cfg = AppConfig::from_map(&vars(&[("HOST", "127.0.0.1"), ("PORT", "8080")])).unwrap();
        assert_eq!(cfg.socket_addr().unwrap().port(), 8080);
    }
}
