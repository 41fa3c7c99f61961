// Gemini generateContent client
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{http_client, snippet, UpstreamError};
use crate::core::traits::TextGenerator;

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(base_url: &str, model: &str, api_key: &str, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn endpoint(&self) -> Result<url::Url, UpstreamError> {
        let raw = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let mut url = url::Url::parse(&raw)
            .map_err(|e| UpstreamError::Decode(format!("bad LLM base URL {}: {}", raw, e)))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

/// Request body asking for a JSON answer
pub fn build_request(prompt: &str) -> Value {
    json!({
        "contents": [{"role": "user", "parts": [{"text": prompt}]}],
        "generationConfig": {
            "temperature": 0.9,
            "topP": 0.95,
            "maxOutputTokens": 2048,
            "responseMimeType": "application/json"
        }
    })
}

/// Concatenated text parts of the first candidate
pub fn extract_text(response: &Value) -> Option<String> {
    // Some gateways wrap the payload in a `response` field
    let response = response.get("response").unwrap_or(response);

    let parts = response
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        if self.api_key.is_empty() {
            return Err(UpstreamError::NotConfigured("LLM API key"));
        }

        let response = self
            .client
            .post(self.endpoint()?)
            .json(&build_request(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("LLM returned {}: {}", status, snippet(&body));
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        let body: Value = response.json().await?;
        extract_text(&body).ok_or_else(|| {
            // Blocked or empty candidates still count as an answer we cannot use
            tracing::warn!("LLM response had no text: {}", snippet(&body.to_string()));
            UpstreamError::Decode("no text in LLM response".to_string())
        })
    }
}
