use axum::extract::State;
use axum::Json;
use tracing::{error, info};

use super::super::dto::{SearchRequest, SearchResponse};
use super::super::error::ApiError;
use super::super::middleware::AuthUser;
use super::super::state::SharedState;
use crate::facade::prompts::search_answer_prompt;
use crate::store::ChatRecord;
use crate::types::RequestType;

/// Web search, then a model answer grounded on the results.
pub async fn search(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("Search query is required"));
    }

    let found = state.search().search(query).await;
    info!(uid = %user.uid, results = found.results.len(), "search results fetched");

    let prompt = search_answer_prompt(query, &found.context);
    let generation = state
        .service()
        .generate_text(&prompt, RequestType::Text)
        .await
        .map_err(|e| {
            error!(error = %e, "search answer failed");
            ApiError::from(e)
        })?;

    state
        .record(
            ChatRecord::success(&user.uid, "search", query, &generation.text)
                .with_model(&generation.model)
                .with_search_results(found.results.clone()),
        )
        .await;

    Ok(Json(SearchResponse {
        response: generation.text,
        sources: found.results,
    }))
}
