// SPC payment processor client
//
// Requests and webhooks carry `X-Signature: base64(HMAC-SHA256(secret, body))`.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{http_client, snippet, UpstreamError};
use crate::core::traits::{CheckoutSession, PaymentGateway, PaymentRequest};

pub const SIGNATURE_HEADER: &str = "X-Signature";

type HmacSha256 = Hmac<Sha256>;

pub fn sign(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts any key length");
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Constant-time check of a base64 signature over `body`
pub fn verify(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

pub struct SpcClient {
    client: reqwest::Client,
    base_url: String,
    secret: String,
}

impl SpcClient {
    pub fn new(base_url: &str, secret: &str) -> Self {
        Self {
            client: http_client(30),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret: secret.to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for SpcClient {
    async fn create_checkout(
        &self,
        request: &PaymentRequest,
    ) -> Result<CheckoutSession, UpstreamError> {
        if request.merchant_id.is_empty() || self.secret.is_empty() {
            return Err(UpstreamError::NotConfigured("payment processor"));
        }

        // Sign the exact bytes that go on the wire
        let body = serde_json::to_vec(request)
            .map_err(|e| UpstreamError::Decode(format!("payment request: {}", e)))?;
        let signature = sign(&self.secret, &body);

        let response = self
            .client
            .post(format!("{}/payments", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(
                "Payment processor rejected order {}: {} {}",
                request.order_id,
                status,
                snippet(&text)
            );
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: snippet(&text),
            });
        }

        response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| UpstreamError::Decode(format!("checkout session: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let body = br#"{"order_id":"ord_1","status":"success"}"#;
        let sig = sign("shh", body);
        assert!(verify("shh", body, &sig));
        assert!(!verify("other", body, &sig));
        assert!(!verify("shh", b"{}", &sig));
        assert!(!verify("shh", body, "not base64 !!"));
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let sig = sign("Jefe", b"what do ya want for nothing?");
        assert_eq!(sig, "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM=");
    }

    #[tokio::test]
    async fn test_unconfigured_gateway() {
        let client = SpcClient::new("https://pay.example", "");
        let request = PaymentRequest {
            merchant_id: "m".to_string(),
            order_id: "ord_1".to_string(),
            amount: 9900,
            currency: "UAH".to_string(),
            description: "x".to_string(),
            callback_url: "https://a/cb".to_string(),
            return_url: "https://a/ret".to_string(),
            timestamp: 0,
        };
        assert!(matches!(
            client.create_checkout(&request).await,
            Err(UpstreamError::NotConfigured(_))
        ));
    }
}
