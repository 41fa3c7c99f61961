// National Bank of Ukraine exchange-rate feed
use async_trait::async_trait;
use serde::Deserialize;

use super::{http_client, snippet, UpstreamError};
use crate::core::traits::{PublishedRate, RateSource};

/// Entry of the NBU `statdirectory/exchange?json` array
#[derive(Debug, Deserialize)]
struct NbuRate {
    #[allow(dead_code)]
    r030: i32,
    txt: String,
    rate: f64,
    cc: String,
    exchangedate: String,
}

pub struct NbuClient {
    client: reqwest::Client,
    url: String,
}

impl NbuClient {
    pub fn new(url: &str) -> Self {
        Self {
            client: http_client(10),
            url: url.to_string(),
        }
    }
}

pub fn parse_rates(body: &str) -> Result<Vec<PublishedRate>, UpstreamError> {
    let raw: Vec<NbuRate> = serde_json::from_str(body)
        .map_err(|e| UpstreamError::Decode(format!("NBU payload: {}", e)))?;

    Ok(raw
        .into_iter()
        .filter(|r| r.rate.is_finite() && r.rate > 0.0)
        .map(|r| PublishedRate {
            code: r.cc.to_uppercase(),
            name: r.txt,
            rate: r.rate,
            date: r.exchangedate,
        })
        .collect())
}

#[async_trait]
impl RateSource for NbuClient {
    async fn fetch(&self) -> Result<Vec<PublishedRate>, UpstreamError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        let rates = parse_rates(&body)?;
        tracing::debug!("NBU published {} rates", rates.len());
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rates() {
        let body = r#"[
            {"r030":840,"txt":"Долар США","rate":41.2345,"cc":"USD","exchangedate":"19.10.2026"},
            {"r030":978,"txt":"Євро","rate":44.871,"cc":"EUR","exchangedate":"19.10.2026"},
            {"r030":1,"txt":"Broken","rate":0,"cc":"XXX","exchangedate":"19.10.2026"}
        ]"#;
        let rates = parse_rates(body).unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].code, "USD");
        assert_eq!(rates[1].rate, 44.871);
    }

    #[test]
    fn test_parse_rates_rejects_garbage() {
        assert!(matches!(
            parse_rates("<html>maintenance</html>"),
            Err(UpstreamError::Decode(_))
        ));
    }
}
