//! Seams between the services and the outside world
//! Production uses the reqwest clients in `upstream`; tests plug in stubs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::upstream::UpstreamError;

/// Generative-text backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier recorded in generation logs
    fn model(&self) -> &str;

    /// Send one prompt and return the raw text answer.
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError>;
}

/// One published exchange rate, UAH per unit of `code`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedRate {
    pub code: String,
    pub name: String,
    pub rate: f64,
    pub date: String,
}

/// Exchange-rate feed
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<PublishedRate>, UpstreamError>;
}

/// Checkout request sent to the payment processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub merchant_id: String,
    pub order_id: String,
    /// Minor units (kopiyky)
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub callback_url: String,
    pub return_url: String,
    pub timestamp: i64,
}

/// Processor's answer to a checkout request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub payment_id: String,
    pub checkout_url: String,
}

/// Payment processor
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(&self, request: &PaymentRequest)
        -> Result<CheckoutSession, UpstreamError>;
}
