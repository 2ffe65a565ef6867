//! 持久化抽象：聊天历史与用户资料存储。
//!
//! # Store
//!
//! Routes persist through two traits so the backing document database can be
//! swapped without touching handlers. [`MemoryStore`] implements both.
//!
//! | Trait | Collection |
//! |-------|------------|
//! | [`HistoryStore`] | chat history records, one per answered (or failed) request |
//! | [`ProfileStore`] | user profiles keyed by uid |

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::search::SearchResult;
use crate::Result;

pub use memory::MemoryStore;

/// One chat history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    /// Assigned by the store on insert.
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub prompt: String,
    pub response: String,
    #[serde(rename = "type")]
    pub request_type: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_image: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Vec<SearchResult>>,
}

impl ChatRecord {
    pub fn success(
        user_id: impl Into<String>,
        request_type: impl Into<String>,
        prompt: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            user_id: user_id.into(),
            prompt: prompt.into(),
            response: response.into(),
            request_type: request_type.into(),
            timestamp: Utc::now(),
            success: true,
            processing_time: None,
            model: None,
            error: None,
            has_image: None,
            search_results: None,
        }
    }

    pub fn failure(
        user_id: impl Into<String>,
        request_type: impl Into<String>,
        prompt: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        let mut record = Self::success(user_id, request_type, prompt, format!("Error: {error}"));
        record.success = false;
        record.error = Some(error);
        record
    }

    pub fn with_processing_time(mut self, ms: f64) -> Self {
        self.processing_time = Some(ms);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_has_image(mut self, has_image: bool) -> Self {
        self.has_image = Some(has_image);
        self
    }

    pub fn with_search_results(mut self, results: Vec<SearchResult>) -> Self {
        self.search_results = Some(results);
        self
    }
}

/// A user's profile document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(default)]
    pub preferences: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(uid: impl Into<String>, email: Option<String>, display_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            uid: uid.into(),
            email,
            display_name,
            preferences: Map::new(),
            created_at: now,
            last_active: now,
        }
    }
}

/// Partial profile update. `last_active` is always refreshed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    /// Replaces the stored preferences when non-empty.
    #[serde(default)]
    pub preferences: Option<Map<String, Value>>,
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Insert and return the new record id.
    async fn add(&self, record: ChatRecord) -> Result<String>;

    /// Newest first, at most `limit` entries.
    async fn list(&self, user_id: &str, limit: usize) -> Result<Vec<ChatRecord>>;

    /// Remove every record of `user_id`; returns how many were removed.
    async fn clear(&self, user_id: &str) -> Result<usize>;

    async fn get(&self, id: &str) -> Result<Option<ChatRecord>>;

    /// Returns false when `id` did not exist.
    async fn delete(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>>;

    async fn create_profile(&self, profile: UserProfile) -> Result<UserProfile>;

    /// Fails with [`Error::NotFound`](crate::Error::NotFound) for unknown uids.
    async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> Result<UserProfile>;
}
