use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

use crate::auth::{FirebaseTokenVerifier, StaticTokenVerifier, TokenVerifier};
use crate::config::{AppConfig, DEFAULT_ALLOWED_ORIGIN, DEFAULT_STREAM_CHUNK_DELAY};
use crate::drivers::GeminiProvider;
use crate::facade::GenerationService;
use crate::resilience::{KeyedRateLimiter, RateLimiterConfig};
use crate::search::SearchClient;
use crate::store::{ChatRecord, HistoryStore, MemoryStore, ProfileStore};
use crate::Result;

pub type SharedState = Arc<ServerState>;

/// Everything handlers need, assembled once at startup.
pub struct ServerState {
    service: GenerationService,
    search: SearchClient,
    verifier: Arc<dyn TokenVerifier>,
    history: Arc<dyn HistoryStore>,
    profiles: Arc<dyn ProfileStore>,
    limiter: KeyedRateLimiter,
    stream_chunk_delay: Duration,
    allowed_origins: Vec<String>,
}

impl ServerState {
    pub fn new(service: GenerationService, search: SearchClient, verifier: Arc<dyn TokenVerifier>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let limiter_cfg = RateLimiterConfig::per_window(
            crate::config::DEFAULT_RATE_LIMIT_MAX,
            crate::config::DEFAULT_RATE_LIMIT_WINDOW,
        )
        .unwrap_or_default();
        Self {
            service,
            search,
            verifier,
            history: store.clone(),
            profiles: store,
            limiter: KeyedRateLimiter::new(limiter_cfg),
            stream_chunk_delay: DEFAULT_STREAM_CHUNK_DELAY,
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
        }
    }

    /// Wire the production collaborators described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let http = config.http.build()?;

        let api_key = config.gemini_api_key.clone().unwrap_or_else(|| {
            warn!("GEMINI_API_KEY is not set; generation calls will fail");
            String::new()
        });
        let provider = GeminiProvider::with_client(http.clone(), api_key)
            .with_base_url(config.gemini_base_url.clone());
        let service = GenerationService::new(
            Arc::new(provider),
            config.models.clone(),
            config.retry.clone(),
            config.gemini_api_key.is_some(),
        );

        let search = SearchClient::with_client(
            http.clone(),
            config.search_api_key.clone(),
            config.search_engine_id.clone(),
        )
        .with_base_url(config.search_url.clone());
        if !search.is_configured() {
            warn!("Google search credentials missing; search answers will run without results");
        }

        let verifier: Arc<dyn TokenVerifier> = match &config.firebase_api_key {
            Some(key) => Arc::new(FirebaseTokenVerifier::with_client(http, key.clone())),
            None => {
                warn!("FIREBASE_API_KEY is not set; authenticated routes will reject every token");
                Arc::new(StaticTokenVerifier::new())
            }
        };

        let mut state = Self::new(service, search, verifier)
            .with_stream_chunk_delay(config.stream_chunk_delay)
            .with_allowed_origins(config.allowed_origins.clone());
        if let Some(cfg) = RateLimiterConfig::per_window(config.rate_limit_max, config.rate_limit_window) {
            state = state.with_rate_limit(cfg);
        }
        Ok(state)
    }

    pub fn with_store<S>(mut self, store: Arc<S>) -> Self
    where
        S: HistoryStore + ProfileStore + 'static,
    {
        self.history = store.clone();
        self.profiles = store;
        self
    }

    pub fn with_rate_limit(mut self, cfg: RateLimiterConfig) -> Self {
        self.limiter = KeyedRateLimiter::new(cfg);
        self
    }

    pub fn with_stream_chunk_delay(mut self, delay: Duration) -> Self {
        self.stream_chunk_delay = delay;
        self
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(self)
    }

    pub(crate) fn service(&self) -> &GenerationService {
        &self.service
    }

    pub(crate) fn search(&self) -> &SearchClient {
        &self.search
    }

    pub(crate) fn verifier(&self) -> &dyn TokenVerifier {
        self.verifier.as_ref()
    }

    pub(crate) fn history(&self) -> &dyn HistoryStore {
        self.history.as_ref()
    }

    pub(crate) fn profiles(&self) -> &dyn ProfileStore {
        self.profiles.as_ref()
    }

    pub(crate) fn limiter(&self) -> &KeyedRateLimiter {
        &self.limiter
    }

    pub(crate) fn stream_chunk_delay(&self) -> Duration {
        self.stream_chunk_delay
    }

    pub(crate) fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }

    /// Persist a history record; failures are logged and swallowed.
    pub(crate) async fn record(&self, record: ChatRecord) {
        if let Err(e) = self.history.add(record).await {
            error!(error = %e, "failed to save chat history");
        }
    }
}
