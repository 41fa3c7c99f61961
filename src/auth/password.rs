use bcrypt::{hash, verify, DEFAULT_COST};

use super::{AuthError, AuthResult};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// bcrypt only reads the first 72 bytes
pub const MAX_PASSWORD_LENGTH: usize = 72;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "12345678", "123456789", "qwerty123", "iloveyou", "sunshine", "password1",
    "11111111", "abc12345", "football", "baseball", "letmein1", "trustno1", "superman",
    "starsign", "horoscope",
];

/// Hash on the blocking pool; bcrypt is CPU-bound.
pub async fn hash_password(password: &str, cost: Option<u32>) -> AuthResult<String> {
    let password = password.to_string();
    let cost = cost.unwrap_or(DEFAULT_COST);

    tokio::task::spawn_blocking(move || {
        hash(password, cost).map_err(|e| AuthError::HashingError(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::HashingError(format!("Task join error: {}", e)))?
}

pub async fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();

    tokio::task::spawn_blocking(move || {
        verify(password, &hash).map_err(|e| AuthError::HashingError(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::HashingError(format!("Task join error: {}", e)))?
}

pub fn validate_password(password: &str) -> AuthResult<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_LENGTH
        )));
    }

    if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
        return Err(AuthError::WeakPassword("Password is too common".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify_password() {
        let hash = hash_password("Moonlit-Orbit-9", Some(4)).await.unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("Moonlit-Orbit-9", &hash).await.unwrap());
        assert!(!verify_password("moonlit-orbit-9", &hash).await.unwrap());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(73)).is_err());
        assert!(validate_password("Password").is_err());
        assert!(validate_password("Saturn-Returns-29").is_ok());
    }
}
