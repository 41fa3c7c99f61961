//! Clients for the third-party HTTP services
//! (generative text, payment processor, exchange rates)

pub mod error_classifier;
pub mod gemini;
pub mod nbu;
pub mod spc;

use thiserror::Error;

pub use gemini::GeminiClient;
pub use nbu::NbuClient;
pub use spc::SpcClient;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{message}")]
    Transport {
        kind: &'static str,
        message: &'static str,
    },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        let (kind, message) = error_classifier::classify_request_error(&err);
        tracing::warn!("upstream request failed ({}): {}", kind, err);
        UpstreamError::Transport { kind, message }
    }
}

/// Shared client builder for every upstream
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(concat!("astrology-server/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// Truncate an error body for logs and messages
pub(crate) fn snippet(body: &str) -> String {
    const MAX: usize = 300;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
