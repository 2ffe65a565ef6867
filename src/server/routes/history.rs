use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use super::super::dto::{HistoryQuery, HistoryResponse, MessageResponse};
use super::super::error::ApiError;
use super::super::middleware::AuthUser;
use super::super::state::SharedState;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 100;

pub async fn list(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    let history = state.history().list(&user.uid, limit as usize).await?;
    Ok(Json(HistoryResponse { history }))
}

pub async fn clear(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    let count = state.history().clear(&user.uid).await?;
    info!(uid = %user.uid, count, "cleared chat history");
    Ok(Json(MessageResponse::new(format!(
        "Cleared {count} chat history entries"
    ))))
}

pub async fn delete_entry(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let record = state
        .history()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Chat entry not found"))?;
    if record.user_id != user.uid {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "Access denied"));
    }
    state.history().delete(&id).await?;
    Ok(Json(MessageResponse::new("Chat entry deleted successfully")))
}
