// Rate limiting layers
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::extract::{client_ip, AuthUser};
use crate::error::AppError;
use crate::ratelimit::RateLimiter;
use crate::state::AppState;

const REMAINING_HEADER: &str = "x-ratelimit-remaining";

async fn enforce(
    limiter: &dyn RateLimiter,
    key: String,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let decision = limiter.check(&key);
    if !decision.allowed {
        tracing::warn!("{} limit hit for {}", limiter.name(), key);
        return Err(AppError::RateLimited {
            retry_after_secs: decision.retry_after_secs(),
        });
    }

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    Ok(response)
}

/// Login and registration, fixed window per IP
pub async fn limit_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = format!("auth:{}", client_ip(req.headers(), req.extensions()));
    enforce(&state.limiters.auth, key, req, next).await
}

/// Content generation, sliding window per user
pub async fn limit_ai(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = format!("ai:{}", user.user_id);
    req.extensions_mut().insert(user);
    enforce(&state.limiters.ai, key, req, next).await
}

/// Remaining API routes, token bucket per IP
pub async fn limit_api(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = format!("api:{}", client_ip(req.headers(), req.extensions()));
    enforce(&state.limiters.api, key, req, next).await
}
