use axum::{
    extract::{Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

use super::common::ApiResponse;
use crate::core::services::currency::{Conversion, RateTable};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub amount: String,
    pub from: String,
    pub to: String,
}

pub async fn rates(State(state): State<Arc<AppState>>) -> Json<ApiResponse<RateTable>> {
    ApiResponse::ok(state.currency.rates().await)
}

pub async fn convert(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConvertQuery>,
) -> AppResult<Json<ApiResponse<Conversion>>> {
    let amount = Decimal::from_str(query.amount.trim())
        .map_err(|_| AppError::invalid("amount", "Amount must be a decimal number"))?;
    let conversion = state
        .currency
        .convert(amount, &query.from, &query.to)
        .await?;
    Ok(ApiResponse::ok(conversion))
}
