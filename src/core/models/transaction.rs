use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Purchase,
    Bonus,
    Spend,
    Refund,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Bonus => "bonus",
            TransactionKind::Spend => "spend",
            TransactionKind::Refund => "refund",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(TransactionKind::Purchase),
            "bonus" => Ok(TransactionKind::Bonus),
            "spend" => Ok(TransactionKind::Spend),
            "refund" => Ok(TransactionKind::Refund),
            other => Err(format!("unknown transaction kind: {}", other)),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Expired,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Expired => "expired",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            "expired" => Ok(TransactionStatus::Expired),
            other => Err(format!("unknown transaction status: {}", other)),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row from `transactions`
///
/// `amount` is always a positive credit count; `kind` says which way it moved.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: String,
    #[serde(skip)]
    pub user_id: String,
    pub kind: TransactionKind,
    pub amount: i64,
    pub status: TransactionStatus,
    pub order_id: Option<String>,
    pub package_id: Option<String>,
    pub price_minor: Option<i64>,
    pub currency: Option<String>,
    #[serde(skip)]
    pub external_id: Option<String>,
    pub description: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Transaction {
    pub fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let kind: String = row.try_get("kind")?;
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            kind: kind.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            amount: row.try_get("amount")?,
            status: status
                .parse()
                .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            order_id: row.try_get("order_id")?,
            package_id: row.try_get("package_id")?,
            price_minor: row.try_get("price_minor")?,
            currency: row.try_get("currency")?,
            external_id: row.try_get("external_id")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
