//! Google Custom Search client.
//!
//! Search is advisory: any failure degrades to an empty result set and a
//! context line saying search is unavailable, so the answer route can still
//! ask the model.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::transport::{HttpClientConfig, API_KEY_HEADER};
use crate::{Error, Result};

pub const DEFAULT_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Results requested per query.
pub const RESULT_COUNT: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchContext {
    pub results: Vec<SearchResult>,
    /// Prompt-ready rendering of `results`.
    pub context: String,
}

impl SearchContext {
    pub fn from_results(results: Vec<SearchResult>) -> Self {
        let context = results
            .iter()
            .map(|r| format!("Title: {}\nSnippet: {}\n\n", r.title, r.snippet))
            .collect();
        Self { results, context }
    }

    pub fn unavailable(query: &str) -> Self {
        Self {
            results: Vec::new(),
            context: format!("Search functionality is currently unavailable for query: {query}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
}

#[derive(Debug, Clone)]
pub struct SearchClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    engine_id: Option<String>,
}

impl SearchClient {
    pub fn new(api_key: Option<String>, engine_id: Option<String>) -> Result<Self> {
        Ok(Self::with_client(
            HttpClientConfig::from_env().build()?,
            api_key,
            engine_id,
        ))
    }

    pub fn with_client(client: reqwest::Client, api_key: Option<String>, engine_id: Option<String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_SEARCH_URL.to_string(),
            api_key,
            engine_id,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.engine_id.is_some()
    }

    /// Search, degrading to [`SearchContext::unavailable`] on any failure.
    pub async fn search(&self, query: &str) -> SearchContext {
        match self.try_search(query).await {
            Ok(ctx) => {
                debug!(results = ctx.results.len(), "search completed");
                ctx
            }
            Err(e) => {
                error!(error = %e, "search failed");
                SearchContext::unavailable(query)
            }
        }
    }

    pub async fn try_search(&self, query: &str) -> Result<SearchContext> {
        let (Some(key), Some(cx)) = (self.api_key.as_deref(), self.engine_id.as_deref()) else {
            return Err(Error::Configuration {
                message: "search API key or engine id not configured".into(),
                context: crate::ErrorContext::new()
                    .with_field_path("GOOGLE_SEARCH_API_KEY")
                    .with_source("search"),
            });
        };

        let num = RESULT_COUNT.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .header(API_KEY_HEADER, key)
            .query(&[("cx", cx), ("q", query), ("num", num.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(None, None, Some(status.as_u16()), body));
        }

        let data: SearchResponse = response.json().await?;
        Ok(SearchContext::from_results(data.items))
    }
}
