//! HTTP API (axum).
//!
//! | Route | Auth | Handler |
//! |-------|------|---------|
//! | `GET /`, `GET /health` | no | [`routes::root`] |
//! | `GET /api/ask/health`, `POST /api/ask/test` | no | [`routes::ask`] |
//! | `POST /api/ask` | yes, rate-limited | [`routes::ask`] |
//! | `POST /api/ask/stream` | yes | [`routes::stream`] |
//! | `POST /api/search` | yes | [`routes::search`] |
//! | `POST /api/image` | yes | [`routes::image`] |
//! | `GET/DELETE /api/history`, `DELETE /api/history/{id}` | yes | [`routes::history`] |
//! | `GET/PUT /api/user/profile` | yes | [`routes::user`] |

mod dto;
mod error;
mod middleware;
pub mod routes;
mod state;

pub use dto::ErrorResponse;
pub use error::{ApiError, ServerError};
pub use middleware::AuthUser;
pub use state::{ServerState, SharedState};

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{debug, info, warn};

/// Request bodies above this size are rejected (base64 images included).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// How often refilled rate-limit buckets are dropped.
pub const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

pub fn router(state: SharedState) -> Router {
    let cors = cors_layer(state.allowed_origins());

    let ask_limited = post(routes::ask::ask).route_layer(axum::middleware::from_fn_with_state(
        Arc::clone(&state),
        middleware::rate_limit,
    ));

    Router::new()
        .route("/", get(routes::root::index))
        .route("/health", get(routes::root::health))
        .route("/api/ask", ask_limited)
        .route("/api/ask/health", get(routes::ask::health))
        .route("/api/ask/test", post(routes::ask::test))
        .route("/api/ask/stream", post(routes::stream::stream))
        .route("/api/search", post(routes::search::search))
        .route("/api/image", post(routes::image::image))
        .route(
            "/api/history",
            get(routes::history::list).delete(routes::history::clear),
        )
        .route("/api/history/{id}", delete(routes::history::delete_entry))
        .route(
            "/api/user/profile",
            get(routes::user::get_profile).put(routes::user::update_profile),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers: [HeaderName; 3] = [header::AUTHORIZATION, header::CONTENT_TYPE, header::CACHE_CONTROL];

    // Credentials cannot be combined with a wildcard origin.
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "skipping invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods(methods)
        .allow_headers(headers)
}

/// Bind `addr` and serve until the process stops.
pub async fn serve(state: SharedState, addr: SocketAddr) -> Result<(), ServerError> {
    info!(%addr, "Binding HTTP server");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    serve_listener(listener, state).await
}

/// Serve on an already bound listener.
pub async fn serve_listener(listener: TcpListener, state: SharedState) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP server ready to accept connections");
    }
    let pruner = Arc::clone(&state);
    let prune_task = tokio::spawn(async move {
        let mut tick = tokio::time::interval(LIMITER_PRUNE_INTERVAL);
        loop {
            tick.tick().await;
            let remaining = pruner.limiter().prune().await;
            debug!(remaining, "pruned rate limit buckets");
        }
    });

    let app = router(state);
    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(ServerError::Serve);
    prune_task.abort();
    result
}
