//! Password hashing, JWT issuance and input validation for accounts

pub mod jwt;
pub mod password;
pub mod validate;

use thiserror::Error;

use crate::error::AppError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Weak password: {0}")]
    WeakPassword(String),

    #[error("Hashing error: {0}")]
    HashingError(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::InvalidToken(_)
            | AuthError::TokenExpired => AppError::Unauthorized,
            AuthError::WeakPassword(msg) => AppError::invalid("password", msg),
            AuthError::HashingError(msg) => AppError::Internal(msg),
        }
    }
}
