use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::core::zodiac::ZodiacSign;

/// Row from `users`, password hash included
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub birth_date: Option<String>,
    pub zodiac_sign: Option<ZodiacSign>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let sign: Option<String> = row.try_get("zodiac_sign")?;
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            name: row.try_get("name")?,
            birth_date: row.try_get("birth_date")?,
            zodiac_sign: sign.and_then(|s| s.parse().ok()),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    pub fn profile(&self, credits: i64) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            birth_date: self.birth_date.clone(),
            zodiac_sign: self.zodiac_sign,
            credits,
            created_at: self.created_at,
        }
    }
}

/// Public view of a user
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub birth_date: Option<String>,
    pub zodiac_sign: Option<ZodiacSign>,
    pub credits: i64,
    pub created_at: i64,
}
