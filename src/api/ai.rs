use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use super::common::{ApiResponse, Paging};
use super::extract::{AuthUser, JsonBody};
use crate::core::models::{ContentEntry, Page, UsageSummary};
use crate::core::services::generation::{
    CompatibilityRequest, GenerationRequest, GenerationResponse, HoroscopeRequest, TarotRequest,
};
use crate::error::AppResult;
use crate::state::AppState;

async fn generate(
    state: &AppState,
    user: &AuthUser,
    request: GenerationRequest,
) -> AppResult<Json<ApiResponse<GenerationResponse>>> {
    let result = state.generation.run(&user.user_id, request).await?;
    Ok(ApiResponse::ok(result))
}

pub async fn horoscope(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    JsonBody(req): JsonBody<HoroscopeRequest>,
) -> AppResult<Json<ApiResponse<GenerationResponse>>> {
    generate(&state, &user, GenerationRequest::Horoscope(req)).await
}

pub async fn tarot(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    JsonBody(req): JsonBody<TarotRequest>,
) -> AppResult<Json<ApiResponse<GenerationResponse>>> {
    generate(&state, &user, GenerationRequest::Tarot(req)).await
}

pub async fn compatibility(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    JsonBody(req): JsonBody<CompatibilityRequest>,
) -> AppResult<Json<ApiResponse<GenerationResponse>>> {
    generate(&state, &user, GenerationRequest::Compatibility(req)).await
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(paging): Query<Paging>,
) -> AppResult<Json<ApiResponse<Page<ContentEntry>>>> {
    let page = state
        .generation
        .history(&user.user_id, paging.limit, paging.offset)
        .await?;
    Ok(ApiResponse::ok(page))
}

pub async fn history_entry(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<ContentEntry>>> {
    Ok(ApiResponse::ok(state.generation.get(&user.user_id, &id).await?))
}

pub async fn usage(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<UsageSummary>>>> {
    Ok(ApiResponse::ok(state.generation.usage(&user.user_id).await?))
}
