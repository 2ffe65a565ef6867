use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::header::{AUTHORIZATION, RETRY_AFTER};
use axum::http::HeaderValue;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use tracing::{debug, warn};

use super::error::ApiError;
use super::state::SharedState;
use crate::auth::AuthenticatedUser;

/// Caller identity from a verified `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthenticatedUser);

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(ApiError::unauthorized)?;

        match state.verifier().verify(token).await {
            Ok(user) => {
                debug!(uid = %user.uid, "authenticated request");
                Ok(AuthUser(user))
            }
            Err(e) => {
                warn!(error = %e, "authentication failed");
                Err(ApiError::unauthorized())
            }
        }
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Per-client-address request budget. Rejections carry `Retry-After` when
/// the bucket refills.
pub async fn rate_limit(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !state.limiter().try_acquire(&key).await {
        let snapshot = state.limiter().snapshot(&key).await;
        warn!(
            client = %key,
            tokens = snapshot.tokens,
            estimated_wait_ms = ?snapshot.estimated_wait_ms,
            "rate limit exceeded"
        );
        let mut response = ApiError::too_many_requests().into_response();
        if let Some(secs) = snapshot.estimated_wait_ms.map(retry_after_secs) {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        return response;
    }
    next.run(request).await
}

/// Whole seconds, rounded up, never zero.
fn retry_after_secs(wait_ms: u64) -> u64 {
    wait_ms.div_ceil(1000).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_rounds_up() {
        assert_eq!(retry_after_secs(0), 1);
        assert_eq!(retry_after_secs(1), 1);
        assert_eq!(retry_after_secs(1000), 1);
        assert_eq!(retry_after_secs(1001), 2);
        assert_eq!(retry_after_secs(1_800_000), 1800);
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
