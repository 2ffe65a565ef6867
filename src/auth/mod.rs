//! 身份验证：校验 Bearer ID 令牌并解析用户身份。
//!
//! # Auth
//!
//! | Verifier | Use |
//! |----------|-----|
//! | [`FirebaseTokenVerifier`] | Identity Toolkit `accounts:lookup` with the caller's ID token |
//! | [`StaticTokenVerifier`] | Fixed token table for tests and local development |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::warn;

use crate::transport::{HttpClientConfig, API_KEY_HEADER};
use crate::{Error, Result};

pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com";

/// Identity resolved from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Resolve `token` to a user, or fail with [`Error::Auth`].
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser>;
}

/// Verifies Firebase ID tokens against the Identity Toolkit REST API.
#[derive(Debug, Clone)]
pub struct FirebaseTokenVerifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    #[serde(default)]
    disabled: bool,
}

impl FirebaseTokenVerifier {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::with_client(HttpClientConfig::from_env().build()?, api_key))
    }

    pub fn with_client(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: DEFAULT_IDENTITY_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl TokenVerifier for FirebaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser> {
        let url = format!("{}/v1/accounts:lookup", self.base_url);
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&json!({ "idToken": token }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(http_status = status.as_u16(), "token lookup rejected");
            return Err(Error::Auth(format!("token rejected (HTTP {})", status.as_u16())));
        }

        let lookup: LookupResponse = response.json().await?;
        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| Error::Auth("no user for token".into()))?;
        if user.disabled {
            return Err(Error::Auth("user account is disabled".into()));
        }
        Ok(AuthenticatedUser {
            uid: user.local_id,
            email: user.email,
            name: user.display_name,
        })
    }
}

/// In-memory token table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, AuthenticatedUser>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.tokens.insert(token.into(), user);
        self
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| Error::Auth("unknown token".into()))
    }
}
