//! Persistent data models

mod content;
mod transaction;
mod user;

pub use content::{ContentEntry, ContentKind, GenerationOutcome, UsageSummary};
pub use transaction::{Transaction, TransactionKind, TransactionStatus};
pub use user::{User, UserProfile};

use serde::Serialize;

pub const MAX_PAGE_SIZE: i64 = 100;

/// One page of a newest-first listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Clamp client paging input to `1..=MAX_PAGE_SIZE` and a non-negative offset.
pub fn clamp_paging(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (
        limit.unwrap_or(20).clamp(1, MAX_PAGE_SIZE),
        offset.unwrap_or(0).max(0),
    )
}
