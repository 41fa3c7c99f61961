use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "users",
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            name TEXT NOT NULL,
            birth_date TEXT,
            zodiac_sign TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );",
    ),
    (
        "credits",
        "CREATE TABLE IF NOT EXISTS credits (
            user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
            balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
            updated_at INTEGER NOT NULL
        );",
    ),
    (
        "transactions",
        "CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            amount INTEGER NOT NULL,
            status TEXT NOT NULL,
            order_id TEXT UNIQUE,
            package_id TEXT,
            price_minor INTEGER,
            currency TEXT,
            external_id TEXT,
            description TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );",
    ),
    (
        "generation_logs",
        "CREATE TABLE IF NOT EXISTS generation_logs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            model TEXT NOT NULL,
            outcome TEXT NOT NULL,
            credits_spent INTEGER NOT NULL,
            latency_ms INTEGER NOT NULL,
            error TEXT,
            created_at INTEGER NOT NULL
        );",
    ),
    (
        "content_library",
        "CREATE TABLE IF NOT EXISTS content_library (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );",
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions(user_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_transactions_status ON transactions(status, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_generation_logs_user ON generation_logs(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_content_library_user ON content_library(user_id, created_at)",
];

/// Open the pool and bring the schema up to date.
///
/// In-memory databases are private to a connection, so `sqlite::memory:`
/// gets a single-connection pool.
pub async fn init_db(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let max_connections = if database_url.contains(":memory:") {
        1
    } else {
        5
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;

    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for (table, ddl) in MIGRATIONS {
        sqlx::query(ddl).execute(pool).await.map_err(|e| {
            tracing::error!("Failed to create {} table: {}", table, e);
            e
        })?;
    }

    for ddl in INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_init_memory_db_creates_tables() {
        let pool = init_db("sqlite::memory:").await.unwrap();
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(&pool)
            .await
            .unwrap();
        let names: Vec<String> = rows.iter().map(|r| r.get("name")).collect();
        for (table, _) in MIGRATIONS {
            assert!(names.iter().any(|n| n == table), "missing {}", table);
        }
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent_on_file_db() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("astro.db").display());
        let pool = init_db(&url).await.unwrap();
        migrate(&pool).await.unwrap();
        pool.close().await;

        let reopened = init_db(&url).await.unwrap();
        migrate(&reopened).await.unwrap();
    }
}
