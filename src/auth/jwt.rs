use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthError, AuthResult};

pub const ISSUER: &str = "astrology-server";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub iss: String,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn new(user_id: &str, email: &str, expiry_hours: i64) -> Self {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(expiry_hours);
        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            iss: ISSUER.to_string(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        }
    }
}

pub fn issue_token(claims: &Claims, secret: &str) -> AuthResult<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::HashingError(format!("JWT encoding error: {}", e)))
}

pub fn verify_token(token: &str, secret: &str) -> AuthResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.leeway = 0;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken(e.to_string()),
        })
}
