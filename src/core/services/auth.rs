//! Account service
//! Registration, login and profile management

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::OnceCell;

use super::credits::{insert_transaction, read_balance, NewTransaction};
use crate::auth::jwt::{issue_token, Claims};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::validate::{normalize_email, Validator};
use crate::auth::AuthError;
use crate::core::models::{TransactionKind, User, UserProfile};
use crate::core::zodiac::ZodiacSign;
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub birth_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    /// Empty string clears the stored date
    pub birth_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub expires_at: usize,
    pub user: UserProfile,
}

pub struct AuthService {
    pool: SqlitePool,
    jwt_secret: String,
    jwt_expiry_hours: i64,
    bcrypt_cost: u32,
    signup_bonus: i64,
    /// Checked for unknown emails so both login failures cost one bcrypt verify
    dummy_hash: OnceCell<String>,
}

impl AuthService {
    pub fn new(
        pool: SqlitePool,
        jwt_secret: String,
        jwt_expiry_hours: i64,
        bcrypt_cost: u32,
        signup_bonus: i64,
    ) -> Self {
        Self {
            pool,
            jwt_secret,
            jwt_expiry_hours,
            bcrypt_cost,
            signup_bonus,
            dummy_hash: OnceCell::new(),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub async fn register(&self, req: RegisterRequest) -> AppResult<AuthSession> {
        let email = normalize_email(&req.email);

        let mut v = Validator::new();
        v.email(&email);
        v.password(&req.password);
        v.name(&req.name);
        let birth_date = req.birth_date.as_deref().and_then(|d| v.birth_date(d));
        v.finish().map_err(AppError::Validation)?;

        if self.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&req.password, Some(self.bcrypt_cost)).await?;
        let zodiac_sign = birth_date.and_then(|d| ZodiacSign::from_date(d.month(), d.day()));
        let user_id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, birth_date, zodiac_sign, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user_id)
        .bind(&email)
        .bind(&password_hash)
        .bind(req.name.trim())
        .bind(birth_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(zodiac_sign.map(|s| s.as_str()))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await;

        // Lost a race with a concurrent signup for the same address
        if let Err(sqlx::Error::Database(db_err)) = &inserted {
            if db_err.is_unique_violation() {
                return Err(AppError::Conflict(
                    "An account with this email already exists".to_string(),
                ));
            }
        }
        inserted?;

        sqlx::query("INSERT INTO credits (user_id, balance, updated_at) VALUES (?, ?, ?)")
            .bind(&user_id)
            .bind(self.signup_bonus)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        if self.signup_bonus > 0 {
            insert_transaction(
                &mut tx,
                &NewTransaction::completed(
                    &user_id,
                    TransactionKind::Bonus,
                    self.signup_bonus,
                    "Welcome bonus",
                ),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!("Registered user {} ({})", user_id, email);

        let user = self
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| AppError::Internal("user vanished after insert".to_string()))?;
        self.session_for(&user, self.signup_bonus)
    }

    pub async fn login(&self, req: LoginRequest) -> AppResult<AuthSession> {
        let email = normalize_email(&req.email);

        let Some(user) = self.find_by_email(&email).await? else {
            tracing::debug!("Login for unknown email {}", email);
            let dummy = self
                .dummy_hash
                .get_or_try_init(|| hash_password("not-a-real-password", Some(self.bcrypt_cost)))
                .await?;
            verify_password(&req.password, dummy).await?;
            return Err(AuthError::InvalidCredentials.into());
        };

        if !verify_password(&req.password, &user.password_hash).await? {
            tracing::debug!("Wrong password for {}", user.id);
            return Err(AuthError::InvalidCredentials.into());
        }

        let balance = self.balance_of(&user.id).await?;
        self.session_for(&user, balance)
    }

    pub async fn profile(&self, user_id: &str) -> AppResult<UserProfile> {
        let user = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;
        let balance = self.balance_of(user_id).await?;
        Ok(user.profile(balance))
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        req: UpdateProfileRequest,
    ) -> AppResult<UserProfile> {
        let user = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        let mut v = Validator::new();
        if let Some(name) = &req.name {
            v.name(name);
        }

        let (birth_date, zodiac_sign) = match req.birth_date.as_deref().map(str::trim) {
            None => (
                user.birth_date.clone(),
                user.zodiac_sign.map(|s| s.as_str().to_string()),
            ),
            Some("") => (None, None),
            Some(raw) => match v.birth_date(raw) {
                Some(d) => (
                    Some(d.format("%Y-%m-%d").to_string()),
                    ZodiacSign::from_date(d.month(), d.day()).map(|s| s.as_str().to_string()),
                ),
                None => (None, None),
            },
        };
        v.finish().map_err(AppError::Validation)?;

        let name = req
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&user.name)
            .to_string();

        sqlx::query(
            "UPDATE users SET name = ?, birth_date = ?, zodiac_sign = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&name)
        .bind(birth_date)
        .bind(zodiac_sign)
        .bind(chrono::Utc::now().timestamp())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        self.profile(user_id).await
    }

    pub async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(User::from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(User::from_row).transpose()
    }

    async fn balance_of(&self, user_id: &str) -> Result<i64, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        Ok(read_balance(&mut conn, user_id).await?.unwrap_or(0))
    }

    fn session_for(&self, user: &User, balance: i64) -> AppResult<AuthSession> {
        let claims = Claims::new(&user.id, &user.email, self.jwt_expiry_hours);
        let token = issue_token(&claims, &self.jwt_secret)?;
        Ok(AuthSession {
            token,
            expires_at: claims.exp,
            user: user.profile(balance),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::verify_token;
    use crate::core::db::init_db;

    async fn service() -> AuthService {
        let pool = init_db("sqlite::memory:").await.unwrap();
        AuthService::new(pool, "secret".to_string(), 1, 4, 3)
    }

    fn register_req(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "Retrograde-42".to_string(),
            name: "Luna".to_string(),
            birth_date: Some("1992-08-05".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_grants_bonus_and_sign() {
        let svc = service().await;
        let session = svc.register(register_req("Luna@Example.com")).await.unwrap();
        assert_eq!(session.user.email, "luna@example.com");
        assert_eq!(session.user.credits, 3);
        assert_eq!(session.user.zodiac_sign, Some(ZodiacSign::Leo));

        let claims = verify_token(&session.token, "secret").unwrap();
        assert_eq!(claims.sub, session.user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let svc = service().await;
        svc.register(register_req("dup@example.com")).await.unwrap();
        let err = svc
            .register(register_req("  DUP@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_register_reports_every_bad_field() {
        let svc = service().await;
        let err = svc
            .register(RegisterRequest {
                email: "nope".to_string(),
                password: "short".to_string(),
                name: "".to_string(),
                birth_date: Some("yesterday".to_string()),
            })
            .await
            .unwrap_err();
        match err {
            AppError::Validation(fields) => assert_eq!(fields.len(), 4),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login() {
        let svc = service().await;
        svc.register(register_req("sol@example.com")).await.unwrap();

        let session = svc
            .login(LoginRequest {
                email: "SOL@example.com".to_string(),
                password: "Retrograde-42".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.user.credits, 3);

        for (email, password) in [
            ("sol@example.com", "wrong-password"),
            ("nobody@example.com", "Retrograde-42"),
        ] {
            let err = svc
                .login(LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Unauthorized));
        }
    }

    #[tokio::test]
    async fn test_unknown_email_still_verifies_a_hash() {
        let svc = service().await;
        assert!(svc.dummy_hash.get().is_none());

        let err = svc
            .login(LoginRequest {
                email: "ghost@example.com".to_string(),
                password: "Retrograde-42".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));

        // Hashed at the configured cost, then reused
        let dummy = svc.dummy_hash.get().unwrap().clone();
        assert!(dummy.starts_with("$2b$04$"));
        svc.login(LoginRequest {
            email: "ghost@example.com".to_string(),
            password: "other-guess-77".to_string(),
        })
        .await
        .unwrap_err();
        assert_eq!(svc.dummy_hash.get().unwrap(), &dummy);
    }

    #[tokio::test]
    async fn test_update_profile_rederives_sign() {
        let svc = service().await;
        let session = svc.register(register_req("vega@example.com")).await.unwrap();

        let profile = svc
            .update_profile(
                &session.user.id,
                UpdateProfileRequest {
                    name: Some("  Vega ".to_string()),
                    birth_date: Some("1990-03-25".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(profile.name, "Vega");
        assert_eq!(profile.zodiac_sign, Some(ZodiacSign::Aries));

        let cleared = svc
            .update_profile(
                &session.user.id,
                UpdateProfileRequest {
                    name: None,
                    birth_date: Some(String::new()),
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.name, "Vega");
        assert_eq!(cleared.birth_date, None);
        assert_eq!(cleared.zodiac_sign, None);
    }
}
