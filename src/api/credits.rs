use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use super::common::{ApiResponse, Paging};
use super::extract::AuthUser;
use crate::core::models::{Page, Transaction};
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct BalanceResponse {
    pub balance: i64,
}

pub async fn balance(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<BalanceResponse>>> {
    let balance = state.ledger.balance(&user.user_id).await?;
    Ok(ApiResponse::ok(BalanceResponse { balance }))
}

pub async fn transactions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(paging): Query<Paging>,
) -> AppResult<Json<ApiResponse<Page<Transaction>>>> {
    let page = state
        .ledger
        .history(&user.user_id, paging.limit, paging.offset)
        .await?;
    Ok(ApiResponse::ok(page))
}
