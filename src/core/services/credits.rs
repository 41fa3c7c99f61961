//! Credit ledger
//!
//! Balances live in `credits`; every movement also lands in `transactions`.
//! A deduction is a single guarded UPDATE, so the balance can never go
//! negative and a refused deduction changes nothing.

use sqlx::{Row, SqliteConnection, SqlitePool};
use thiserror::Error;

use crate::core::models::{clamp_paging, Page, Transaction, TransactionKind, TransactionStatus};
use crate::error::AppError;

#[derive(Error, Debug)]
pub enum CreditError {
    #[error("Insufficient credits: {required} required, {available} available")]
    Insufficient { required: i64, available: i64 },

    #[error("No credit account for user {0}")]
    UnknownUser(String),

    #[error("Credit amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<CreditError> for AppError {
    fn from(err: CreditError) -> Self {
        match err {
            CreditError::Insufficient {
                required,
                available,
            } => AppError::InsufficientCredits {
                required,
                available,
            },
            CreditError::UnknownUser(_) => AppError::NotFound("User".to_string()),
            CreditError::InvalidAmount(_) => {
                AppError::invalid("amount", "Amount must be a positive number of credits")
            }
            CreditError::Database(e) => AppError::Database(e),
        }
    }
}

/// Columns for a new `transactions` row
#[derive(Debug, Clone)]
pub struct NewTransaction<'a> {
    pub user_id: &'a str,
    pub kind: TransactionKind,
    pub amount: i64,
    pub status: TransactionStatus,
    pub description: &'a str,
    pub order_id: Option<&'a str>,
    pub package_id: Option<&'a str>,
    pub price_minor: Option<i64>,
    pub currency: Option<&'a str>,
}

impl<'a> NewTransaction<'a> {
    pub fn completed(
        user_id: &'a str,
        kind: TransactionKind,
        amount: i64,
        description: &'a str,
    ) -> Self {
        Self {
            user_id,
            kind,
            amount,
            status: TransactionStatus::Completed,
            description,
            order_id: None,
            package_id: None,
            price_minor: None,
            currency: None,
        }
    }
}

pub async fn insert_transaction(
    conn: &mut SqliteConnection,
    tx: &NewTransaction<'_>,
) -> Result<String, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO transactions
            (id, user_id, kind, amount, status, order_id, package_id, price_minor, currency, description, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(tx.user_id)
    .bind(tx.kind.as_str())
    .bind(tx.amount)
    .bind(tx.status.as_str())
    .bind(tx.order_id)
    .bind(tx.package_id)
    .bind(tx.price_minor)
    .bind(tx.currency)
    .bind(tx.description)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

pub async fn read_balance(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<i64>, sqlx::Error> {
    let row = sqlx::query("SELECT balance FROM credits WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|r| r.get("balance")))
}

/// Raise a balance inside the caller's transaction and return the new value.
pub async fn increase_balance(
    conn: &mut SqliteConnection,
    user_id: &str,
    amount: i64,
) -> Result<i64, CreditError> {
    if amount <= 0 {
        return Err(CreditError::InvalidAmount(amount));
    }

    let result = sqlx::query(
        "UPDATE credits SET balance = balance + ?, updated_at = ? WHERE user_id = ?",
    )
    .bind(amount)
    .bind(chrono::Utc::now().timestamp())
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CreditError::UnknownUser(user_id.to_string()));
    }

    read_balance(conn, user_id)
        .await?
        .ok_or_else(|| CreditError::UnknownUser(user_id.to_string()))
}

#[derive(Clone)]
pub struct CreditLedger {
    pool: SqlitePool,
}

impl CreditLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn balance(&self, user_id: &str) -> Result<i64, CreditError> {
        let mut conn = self.pool.acquire().await?;
        read_balance(&mut conn, user_id)
            .await?
            .ok_or_else(|| CreditError::UnknownUser(user_id.to_string()))
    }

    /// Spend `amount` credits. Returns the remaining balance.
    pub async fn deduct(
        &self,
        user_id: &str,
        amount: i64,
        description: &str,
    ) -> Result<i64, CreditError> {
        if amount <= 0 {
            return Err(CreditError::InvalidAmount(amount));
        }

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE credits SET balance = balance - ?, updated_at = ?
             WHERE user_id = ? AND balance >= ?",
        )
        .bind(amount)
        .bind(chrono::Utc::now().timestamp())
        .bind(user_id)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let available = read_balance(&mut tx, user_id).await?;
            tx.rollback().await?;
            return match available {
                Some(available) => {
                    tracing::info!(
                        "Refused deduction of {} credits for {} (balance {})",
                        amount,
                        user_id,
                        available
                    );
                    Err(CreditError::Insufficient {
                        required: amount,
                        available,
                    })
                }
                None => Err(CreditError::UnknownUser(user_id.to_string())),
            };
        }

        insert_transaction(
            &mut tx,
            &NewTransaction::completed(user_id, TransactionKind::Spend, amount, description),
        )
        .await?;

        let balance = read_balance(&mut tx, user_id).await?.unwrap_or(0);
        tx.commit().await?;

        tracing::debug!("Deducted {} credits from {}, balance {}", amount, user_id, balance);
        Ok(balance)
    }

    /// Grant credits (bonus, refund or manual purchase). Returns the new balance.
    pub async fn add(
        &self,
        user_id: &str,
        amount: i64,
        kind: TransactionKind,
        description: &str,
    ) -> Result<i64, CreditError> {
        let mut tx = self.pool.begin().await?;
        let balance = increase_balance(&mut tx, user_id, amount).await?;
        insert_transaction(
            &mut tx,
            &NewTransaction::completed(user_id, kind, amount, description),
        )
        .await?;
        tx.commit().await?;

        tracing::info!("Added {} credits ({}) to {}, balance {}", amount, kind, user_id, balance);
        Ok(balance)
    }

    pub async fn history(
        &self,
        user_id: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Page<Transaction>, CreditError> {
        let (limit, offset) = clamp_paging(limit, offset);

        let rows = sqlx::query(
            "SELECT * FROM transactions WHERE user_id = ?
             ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(Transaction::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let total: i64 = sqlx::query("SELECT COUNT(*) AS n FROM transactions WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?
            .get("n");

        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }
}
