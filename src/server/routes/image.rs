use axum::extract::State;
use axum::Json;
use chrono::Utc;
use std::time::Instant;
use tracing::{error, info};

use super::super::dto::{decode_image, elapsed_ms, ImageRequest, ImageResponse};
use super::super::error::ApiError;
use super::super::middleware::AuthUser;
use super::super::state::SharedState;
use crate::facade::prompts::image_text_prompt;
use crate::store::ChatRecord;
use crate::types::RequestType;

/// Image analysis. Without image data the prompt is answered as text.
pub async fn image(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ImageRequest>,
) -> Result<Json<ImageResponse>, ApiError> {
    if req.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("Prompt is required"));
    }

    let media = match req.image_data.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(data) => Some(decode_image(data, req.mime_type.as_deref())?),
        None => None,
    };
    let has_image = media.is_some();

    info!(uid = %user.uid, has_image, "processing image request");
    let started = Instant::now();
    let result = match &media {
        Some(media) => state.service().generate_from_image(&req.prompt, media).await,
        None => {
            state
                .service()
                .generate_text(&image_text_prompt(&req.prompt), RequestType::Text)
                .await
        }
    };
    let processing_time = elapsed_ms(started);

    let generation = result.map_err(|e| {
        error!(error = %e, "image request failed");
        ApiError::from(e)
    })?;

    state
        .record(
            ChatRecord::success(&user.uid, "image", &req.prompt, &generation.text)
                .with_processing_time(processing_time)
                .with_model(&generation.model)
                .with_has_image(has_image),
        )
        .await;

    Ok(Json(ImageResponse {
        response: generation.text,
        timestamp: Utc::now(),
        processing_time,
        model: generation.model,
        degraded: generation.degraded,
        success: true,
    }))
}
