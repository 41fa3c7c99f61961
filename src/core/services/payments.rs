//! Payment service
//!
//! A purchase is a `pending` transaction row until the processor's signed
//! webhook moves it to `completed` (crediting the package) or `failed`.
//! Rows leave `pending` exactly once; later webhooks are acknowledged only.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;

use thiserror::Error;

use super::credits::{increase_balance, insert_transaction, CreditError, NewTransaction};
use super::currency::{normalize_code, CurrencyError, CurrencyService, RateOrigin, BASE_CURRENCY};
use crate::core::models::{Transaction, TransactionKind, TransactionStatus};
use crate::core::traits::{PaymentGateway, PaymentRequest};
use crate::error::AppError;
use crate::upstream::{spc, UpstreamError};

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Unknown credit package: {0}")]
    UnknownPackage(String),

    #[error("Order not found")]
    UnknownOrder,

    #[error("Webhook signature rejected: {0}")]
    BadSignature(&'static str),

    #[error("Malformed webhook: {0}")]
    Malformed(String),

    #[error("Payment processor error: {0}")]
    Gateway(#[from] UpstreamError),

    #[error(transparent)]
    Currency(#[from] CurrencyError),

    #[error(transparent)]
    Credit(#[from] CreditError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::UnknownPackage(_) => {
                AppError::invalid("package_id", "Unknown credit package")
            }
            PaymentError::UnknownOrder => AppError::NotFound("Order".to_string()),
            PaymentError::BadSignature(reason) => AppError::Forbidden(reason.to_string()),
            PaymentError::Malformed(msg) => AppError::invalid("body", msg),
            PaymentError::Gateway(UpstreamError::NotConfigured(what)) => {
                AppError::Upstream(format!("{} is not configured", what))
            }
            PaymentError::Gateway(e) => AppError::Upstream(format!("Payment processor error: {}", e)),
            PaymentError::Currency(e) => e.into(),
            PaymentError::Credit(e) => e.into(),
            PaymentError::Database(e) => AppError::Database(e),
        }
    }
}

type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CreditPackage {
    pub id: &'static str,
    pub name: &'static str,
    pub credits: i64,
    /// UAH minor units
    pub price_minor: i64,
}

pub const PACKAGES: [CreditPackage; 3] = [
    CreditPackage {
        id: "starter",
        name: "Starter",
        credits: 10,
        price_minor: 9_900,
    },
    CreditPackage {
        id: "popular",
        name: "Popular",
        credits: 30,
        price_minor: 24_900,
    },
    CreditPackage {
        id: "premium",
        name: "Premium",
        credits: 100,
        price_minor: 69_900,
    },
];

pub fn find_package(id: &str) -> Option<&'static CreditPackage> {
    PACKAGES.iter().find(|p| p.id == id)
}

#[derive(Debug, Serialize)]
pub struct PackageOffer {
    pub id: &'static str,
    pub name: &'static str,
    pub credits: i64,
    pub price: Decimal,
    pub currency: String,
    /// Charged amount; the processor settles in UAH
    pub charged_price: Decimal,
    pub charged_currency: &'static str,
    pub rate_source: Option<RateOrigin>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub checkout_url: String,
    pub package_id: &'static str,
    pub credits: i64,
    pub amount: Decimal,
    pub currency: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Success,
    Failure,
    Processing,
}

/// Callback body sent by the processor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub order_id: String,
    pub payment_id: String,
    pub status: WebhookStatus,
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WebhookAck {
    pub order_id: String,
    pub status: TransactionStatus,
    pub already_processed: bool,
}

pub struct PaymentSettings {
    pub merchant_id: String,
    pub secret: String,
    pub public_base_url: String,
}

pub struct PaymentService {
    pool: SqlitePool,
    gateway: Arc<dyn PaymentGateway>,
    currency: Arc<CurrencyService>,
    settings: PaymentSettings,
}

impl PaymentService {
    pub fn new(
        pool: SqlitePool,
        gateway: Arc<dyn PaymentGateway>,
        currency: Arc<CurrencyService>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            pool,
            gateway,
            currency,
            settings,
        }
    }

    pub async fn packages(&self, currency: Option<&str>) -> PaymentResult<Vec<PackageOffer>> {
        let code = match currency {
            Some(c) => normalize_code(c)?,
            None => BASE_CURRENCY.to_string(),
        };

        let rate_source = if code == BASE_CURRENCY {
            None
        } else {
            Some(self.currency.rates().await.source)
        };

        let mut offers = Vec::with_capacity(PACKAGES.len());
        for package in PACKAGES.iter() {
            offers.push(PackageOffer {
                id: package.id,
                name: package.name,
                credits: package.credits,
                price: self.currency.price_in(package.price_minor, &code).await?,
                currency: code.clone(),
                charged_price: Decimal::new(package.price_minor, 2),
                charged_currency: BASE_CURRENCY,
                rate_source,
            });
        }
        Ok(offers)
    }

    pub async fn create(&self, user_id: &str, package_id: &str) -> PaymentResult<CheckoutResponse> {
        let package = find_package(package_id)
            .ok_or_else(|| PaymentError::UnknownPackage(package_id.to_string()))?;

        let order_id = format!("ord_{}", uuid::Uuid::new_v4().simple());
        let description = format!("{} credits ({})", package.credits, package.name);

        {
            let mut conn = self.pool.acquire().await?;
            insert_transaction(
                &mut conn,
                &NewTransaction {
                    user_id,
                    kind: TransactionKind::Purchase,
                    amount: package.credits,
                    status: TransactionStatus::Pending,
                    description: &description,
                    order_id: Some(&order_id),
                    package_id: Some(package.id),
                    price_minor: Some(package.price_minor),
                    currency: Some(BASE_CURRENCY),
                },
            )
            .await?;
        }

        let base = self.settings.public_base_url.trim_end_matches('/');
        let request = PaymentRequest {
            merchant_id: self.settings.merchant_id.clone(),
            order_id: order_id.clone(),
            amount: package.price_minor,
            currency: BASE_CURRENCY.to_string(),
            description,
            callback_url: format!("{}/api/payments/webhook", base),
            return_url: format!("{}/payment/result?order_id={}", base, order_id),
            timestamp: chrono::Utc::now().timestamp(),
        };

        let session = match self.gateway.create_checkout(&request).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Checkout for order {} failed: {}", order_id, e);
                self.set_status(&order_id, TransactionStatus::Failed).await?;
                return Err(PaymentError::Gateway(e));
            }
        };

        sqlx::query("UPDATE transactions SET external_id = ?, updated_at = ? WHERE order_id = ?")
            .bind(&session.payment_id)
            .bind(chrono::Utc::now().timestamp())
            .bind(&order_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(
            "Created order {} for user {} ({} credits, {} minor {})",
            order_id,
            user_id,
            package.credits,
            package.price_minor,
            BASE_CURRENCY
        );

        Ok(CheckoutResponse {
            order_id,
            checkout_url: session.checkout_url,
            package_id: package.id,
            credits: package.credits,
            amount: Decimal::new(package.price_minor, 2),
            currency: BASE_CURRENCY,
        })
    }

    pub async fn status(&self, user_id: &str, order_id: &str) -> PaymentResult<Transaction> {
        let row = sqlx::query("SELECT * FROM transactions WHERE order_id = ? AND user_id = ?")
            .bind(order_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PaymentError::UnknownOrder)?;
        Ok(Transaction::from_row(&row)?)
    }

    pub async fn handle_webhook(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> PaymentResult<WebhookAck> {
        let Some(signature) = signature else {
            tracing::warn!("Webhook without signature rejected");
            return Err(PaymentError::BadSignature("missing signature"));
        };
        if self.settings.secret.is_empty()
            || !spc::verify(&self.settings.secret, raw_body, signature)
        {
            tracing::warn!("Webhook with bad signature rejected");
            return Err(PaymentError::BadSignature("invalid signature"));
        }

        let event: WebhookEvent = serde_json::from_slice(raw_body)
            .map_err(|e| PaymentError::Malformed(e.to_string()))?;

        let row = sqlx::query("SELECT * FROM transactions WHERE order_id = ?")
            .bind(&event.order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PaymentError::UnknownOrder)?;
        let order = Transaction::from_row(&row)?;

        if order.status != TransactionStatus::Pending {
            tracing::info!(
                "Webhook for order {} ignored, already {}",
                order.id,
                order.status
            );
            return Ok(self.ack(&event.order_id, order.status, true));
        }

        match event.status {
            WebhookStatus::Processing => {
                Ok(self.ack(&event.order_id, TransactionStatus::Pending, false))
            }
            WebhookStatus::Failure => self.fail(&event).await,
            WebhookStatus::Success => {
                let expected_currency = order.currency.as_deref().unwrap_or(BASE_CURRENCY);
                if Some(event.amount_minor) != order.price_minor
                    || !event.currency.eq_ignore_ascii_case(expected_currency)
                {
                    tracing::warn!(
                        "Order {} paid {} {} but expected {:?} {}",
                        event.order_id,
                        event.amount_minor,
                        event.currency,
                        order.price_minor,
                        expected_currency
                    );
                    return self.fail(&event).await;
                }
                self.complete(&order, &event).await
            }
        }
    }

    async fn complete(&self, order: &Transaction, event: &WebhookEvent) -> PaymentResult<WebhookAck> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE transactions SET status = 'completed', external_id = ?, updated_at = ?
             WHERE order_id = ? AND status = 'pending'",
        )
        .bind(&event.payment_id)
        .bind(chrono::Utc::now().timestamp())
        .bind(&event.order_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // A concurrent delivery or the expiry sweep got there first
            tx.rollback().await?;
            let status = self.current_status(&event.order_id).await?;
            if status != TransactionStatus::Completed {
                tracing::warn!(
                    "Paid order {} was already {}; payment {} needs reconciling",
                    event.order_id,
                    status,
                    event.payment_id
                );
            }
            return Ok(self.ack(&event.order_id, status, true));
        }

        let balance = increase_balance(&mut tx, &order.user_id, order.amount).await?;
        tx.commit().await?;

        tracing::info!(
            "Order {} completed, {} credits added to {} (balance {})",
            event.order_id,
            order.amount,
            order.user_id,
            balance
        );
        Ok(self.ack(&event.order_id, TransactionStatus::Completed, false))
    }

    async fn fail(&self, event: &WebhookEvent) -> PaymentResult<WebhookAck> {
        if !self.set_status(&event.order_id, TransactionStatus::Failed).await? {
            let status = self.current_status(&event.order_id).await?;
            return Ok(self.ack(&event.order_id, status, true));
        }
        tracing::info!("Order {} marked failed", event.order_id);
        Ok(self.ack(&event.order_id, TransactionStatus::Failed, false))
    }

    async fn current_status(&self, order_id: &str) -> PaymentResult<TransactionStatus> {
        let row = sqlx::query("SELECT * FROM transactions WHERE order_id = ?")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PaymentError::UnknownOrder)?;
        Ok(Transaction::from_row(&row)?.status)
    }

    /// Move a pending order to `status`; false when it had already left `pending`.
    async fn set_status(&self, order_id: &str, status: TransactionStatus) -> PaymentResult<bool> {
        let result = sqlx::query(
            "UPDATE transactions SET status = ?, updated_at = ? WHERE order_id = ? AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(chrono::Utc::now().timestamp())
        .bind(order_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Expire purchases left pending for longer than `max_age_hours`.
    pub async fn expire_stale(&self, max_age_hours: i64) -> Result<u64, sqlx::Error> {
        let now = chrono::Utc::now().timestamp();
        let cutoff = now - max_age_hours * 3600;
        let result = sqlx::query(
            "UPDATE transactions SET status = 'expired', updated_at = ?
             WHERE status = 'pending' AND kind = 'purchase' AND created_at < ?",
        )
        .bind(now)
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        let expired = result.rows_affected();
        if expired > 0 {
            tracing::info!("Expired {} stale pending orders", expired);
        }
        Ok(expired)
    }

    fn ack(&self, order_id: &str, status: TransactionStatus, already_processed: bool) -> WebhookAck {
        WebhookAck {
            order_id: order_id.to_string(),
            status,
            already_processed,
        }
    }
}
