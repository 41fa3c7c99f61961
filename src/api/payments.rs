use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::common::ApiResponse;
use super::extract::{AuthUser, JsonBody};
use crate::core::models::Transaction;
use crate::core::services::payments::{CheckoutResponse, PackageOffer, WebhookAck};
use crate::error::AppResult;
use crate::state::AppState;
use crate::upstream::spc::SIGNATURE_HEADER;

#[derive(Debug, Deserialize)]
pub struct PackagesQuery {
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub package_id: String,
}

pub async fn packages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PackagesQuery>,
) -> AppResult<Json<ApiResponse<Vec<PackageOffer>>>> {
    let offers = state.payments.packages(query.currency.as_deref()).await?;
    Ok(ApiResponse::ok(offers))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    JsonBody(req): JsonBody<CreatePaymentRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let checkout = state.payments.create(&user.user_id, &req.package_id).await?;
    Ok(ApiResponse::ok(checkout))
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<Transaction>>> {
    Ok(ApiResponse::ok(
        state.payments.status(&user.user_id, &order_id).await?,
    ))
}

/// Processor callback; the signature covers the raw body bytes
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<WebhookAck>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let ack = state.payments.handle_webhook(&body, signature).await?;
    Ok(ApiResponse::ok(ack))
}
