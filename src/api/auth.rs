use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::common::ApiResponse;
use super::extract::{AuthUser, JsonBody};
use crate::core::models::UserProfile;
use crate::core::services::auth::{
    AuthSession, LoginRequest, RegisterRequest, UpdateProfileRequest,
};
use crate::error::AppResult;
use crate::state::AppState;

pub async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthSession>>)> {
    let session = state.auth.register(req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(session)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthSession>>> {
    Ok(ApiResponse::ok(state.auth.login(req).await?))
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    Ok(ApiResponse::ok(state.auth.profile(&user.user_id).await?))
}

pub async fn update_me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    Ok(ApiResponse::ok(
        state.auth.update_profile(&user.user_id, req).await?,
    ))
}
