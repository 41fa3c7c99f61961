use axum::{extract::Path, Json};

use super::common::ApiResponse;
use crate::core::zodiac::{SignFacts, ZodiacSign};
use crate::error::{AppError, AppResult};

pub async fn list_signs() -> Json<ApiResponse<Vec<SignFacts>>> {
    ApiResponse::ok(ZodiacSign::ALL.iter().copied().map(SignFacts::from).collect())
}

pub async fn sign(Path(sign): Path<String>) -> AppResult<Json<ApiResponse<SignFacts>>> {
    let sign: ZodiacSign = sign
        .parse()
        .map_err(|_| AppError::NotFound(format!("Sign '{}'", sign)))?;
    Ok(ApiResponse::ok(SignFacts::from(sign)))
}
