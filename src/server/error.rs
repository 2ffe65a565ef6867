use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use std::net::SocketAddr;
use thiserror::Error;

use super::dto::ErrorResponse;
use crate::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Error answered to API clients as `{error, timestamp}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Invalid authentication credentials")
    }

    pub fn too_many_requests() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests from this IP, please try again later.",
        )
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            Error::Auth(_) => Self::unauthorized(),
            Error::Validation { message, .. } => Self::new(status, message),
            Error::NotFound(message) | Error::Forbidden(message) => Self::new(status, message),
            other => Self::new(status, other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
            timestamp: Utc::now(),
        });
        let mut response = (self.status, body).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_terminal_maps_to_status() {
        let inner = Error::upstream(Some("m"), Some("RESOURCE_EXHAUSTED"), Some(429), "quota");
        let err = Error::Terminal {
            source: Box::new(inner),
            last_model: None,
            attempts: 3,
        };
        let api: ApiError = err.into();
        assert_eq!(api.status, StatusCode::TOO_MANY_REQUESTS);
        assert!(api.message.starts_with("All attempts failed. Last error:"));
    }

    #[test]
    fn unauthorized_sets_challenge_header() {
        let response = ApiError::from(Error::Auth("bad".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn validation_message_is_passed_through() {
        let api = ApiError::from(Error::validation("Prompt is required"));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.message, "Prompt is required");
    }
}
