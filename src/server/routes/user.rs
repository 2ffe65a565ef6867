use axum::extract::State;
use axum::Json;
use tracing::info;

use super::super::dto::MessageResponse;
use super::super::error::ApiError;
use super::super::middleware::AuthUser;
use super::super::state::SharedState;
use crate::auth::AuthenticatedUser;
use crate::store::{ProfileUpdate, UserProfile};

async fn load_or_create(state: &SharedState, user: &AuthenticatedUser) -> crate::Result<UserProfile> {
    if let Some(profile) = state.profiles().get_profile(&user.uid).await? {
        return Ok(profile);
    }
    info!(uid = %user.uid, "creating user profile");
    state
        .profiles()
        .create_profile(UserProfile::new(
            user.uid.clone(),
            user.email.clone(),
            user.name.clone(),
        ))
        .await
}

/// Current profile; created from the token identity on first access.
pub async fn get_profile(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(load_or_create(&state, &user).await?))
}

pub async fn update_profile(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<MessageResponse>, ApiError> {
    load_or_create(&state, &user).await?;
    state.profiles().update_profile(&user.uid, update).await?;
    Ok(Json(MessageResponse::new("Profile updated successfully")))
}
