use axum::extract::State;
use axum::Json;
use chrono::Utc;
use std::time::Instant;
use tracing::{error, info};

use super::super::dto::{
    decode_image, elapsed_ms, AskRequest, AskResponse, HealthResponse, TestRequest, TestResponse,
};
use super::super::error::ApiError;
use super::super::middleware::AuthUser;
use super::super::state::SharedState;
use crate::store::ChatRecord;
use crate::types::{GenerationRequest, RequestType};

pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let healthy = state.service().health_check().await;
    Json(HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        timestamp: Utc::now(),
        info: state.service().model_info(),
    })
}

/// Unauthenticated smoke test. Failures still answer 200 with a placeholder.
pub async fn test(State(state): State<SharedState>, Json(req): Json<TestRequest>) -> Json<TestResponse> {
    info!(prompt_len = req.prompt.len(), "test endpoint called");
    match state
        .service()
        .generate_text(&req.prompt, RequestType::Text)
        .await
    {
        Ok(generation) => Json(TestResponse {
            response: generation.text,
            timestamp: Utc::now(),
            model: generation.model,
            success: true,
            error: None,
        }),
        Err(e) => {
            error!(error = %e, "test endpoint failed");
            Json(TestResponse {
                response: format!(
                    "Test response for: \"{}\". The AI service is currently being optimized.",
                    req.prompt
                ),
                timestamp: Utc::now(),
                model: "fallback".to_string(),
                success: false,
                error: Some(e.to_string()),
            })
        }
    }
}

pub async fn ask(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    if req.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("Prompt is required"));
    }

    let request_type = RequestType::parse(&req.kind);
    let mut request = GenerationRequest::text(req.prompt.clone()).with_type(request_type);
    if request_type == RequestType::Vision {
        let data = req
            .image_data
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("Image data required for image analysis"))?;
        request = request.with_media(decode_image(data, req.mime_type.as_deref())?);
    }

    info!(uid = %user.uid, request_type = %request_type, "processing ask request");
    let started = Instant::now();
    let result = state.service().generate(&request).await;
    let processing_time = elapsed_ms(started);

    match result {
        Ok(generation) => {
            info!(
                model = %generation.model,
                duration_ms = processing_time as u64,
                degraded = generation.degraded,
                "response generated"
            );
            state
                .record(
                    ChatRecord::success(&user.uid, &req.kind, &req.prompt, &generation.text)
                        .with_processing_time(processing_time)
                        .with_model(&generation.model),
                )
                .await;
            Ok(Json(AskResponse {
                response: generation.text,
                timestamp: Utc::now(),
                processing_time,
                kind: req.kind,
                model: generation.model,
                degraded: generation.degraded,
                success: true,
            }))
        }
        Err(e) => {
            error!(error = %e, error_kind = ?e.root_kind(), "ask request failed");
            state
                .record(ChatRecord::failure(&user.uid, &req.kind, &req.prompt, e.to_string()))
                .await;
            Err(ApiError::from(e))
        }
    }
}
