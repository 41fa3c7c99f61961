use crate::state::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

mod ai;
mod auth;
pub mod common;
mod credits;
mod currency;
pub mod extract;
mod middleware;
mod payments;
mod zodiac;

pub fn build_routes(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route_layer(from_fn_with_state(state.clone(), middleware::limit_auth));

    let ai_routes = Router::new()
        .route("/api/ai/horoscope", post(ai::horoscope))
        .route("/api/ai/tarot", post(ai::tarot))
        .route("/api/ai/compatibility", post(ai::compatibility))
        .route_layer(from_fn_with_state(state.clone(), middleware::limit_ai));

    let api_routes = Router::new()
        // Account
        .route("/api/auth/me", get(auth::me).put(auth::update_me))
        // Credits
        .route("/api/credits", get(credits::balance))
        .route("/api/credits/transactions", get(credits::transactions))
        // Content library
        .route("/api/ai/history", get(ai::history))
        .route("/api/ai/history/:id", get(ai::history_entry))
        .route("/api/ai/usage", get(ai::usage))
        // Payments
        .route("/api/payments", post(payments::create))
        .route("/api/payments/packages", get(payments::packages))
        .route("/api/payments/:order_id", get(payments::status))
        // Currency
        .route("/api/currency/rates", get(currency::rates))
        .route("/api/currency/convert", get(currency::convert))
        // Zodiac
        .route("/api/zodiac", get(zodiac::list_signs))
        .route("/api/zodiac/:sign", get(zodiac::sign))
        .route_layer(from_fn_with_state(state.clone(), middleware::limit_api));

    Router::new()
        .merge(auth_routes)
        .merge(ai_routes)
        .merge(api_routes)
        // Signed by the processor, not rate limited
        .route("/api/payments/webhook", post(payments::webhook))
        // Health
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}
