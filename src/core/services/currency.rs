//! Currency service
//! Serves NBU rates from a freshness-bounded cache, with static fallback rates.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::core::traits::RateSource;
use crate::error::AppError;

/// Settlement currency; every price is stored in its minor units
pub const BASE_CURRENCY: &str = "UAH";

pub const SUPPORTED_CURRENCIES: [&str; 5] = ["UAH", "USD", "EUR", "GBP", "PLN"];

/// Used when NBU has never answered
const FALLBACK_RATES: [(&str, Decimal); 4] = [
    ("USD", dec!(41.50)),
    ("EUR", dec!(45.20)),
    ("GBP", dec!(52.80)),
    ("PLN", dec!(10.45)),
];

#[derive(Error, Debug)]
pub enum CurrencyError {
    #[error("Unsupported currency: {0}")]
    Unsupported(String),

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Amount is too large to convert")]
    OutOfRange,
}

impl From<CurrencyError> for AppError {
    fn from(err: CurrencyError) -> Self {
        match err {
            CurrencyError::Unsupported(code) => {
                AppError::invalid("currency", format!("Unsupported currency: {}", code))
            }
            CurrencyError::InvalidAmount => AppError::invalid("amount", "Amount must be positive"),
            CurrencyError::OutOfRange => AppError::invalid("amount", "Amount is too large to convert"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateOrigin {
    /// Fetched by this call
    Live,
    /// Served from cache, fresh or stale
    Cached,
    /// Built-in numbers, NBU never reached
    Fallback,
}

/// UAH per one unit of each supported currency
#[derive(Debug, Clone, Serialize)]
pub struct RateTable {
    pub base: &'static str,
    pub rates: BTreeMap<String, Decimal>,
    pub source: RateOrigin,
    /// Unix seconds of the NBU fetch behind these numbers
    pub fetched_at: Option<i64>,
}

impl RateTable {
    fn rate_of(&self, code: &str) -> Result<Decimal, CurrencyError> {
        if code == BASE_CURRENCY {
            return Ok(Decimal::ONE);
        }
        self.rates
            .get(code)
            .copied()
            .ok_or_else(|| CurrencyError::Unsupported(code.to_string()))
    }

    fn fallback() -> Self {
        Self {
            base: BASE_CURRENCY,
            rates: FALLBACK_RATES
                .iter()
                .map(|(code, rate)| (code.to_string(), *rate))
                .collect(),
            source: RateOrigin::Fallback,
            fetched_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub amount: Decimal,
    pub from: String,
    pub to: String,
    pub result: Decimal,
    pub rate_source: RateOrigin,
}

struct CachedRates {
    table: RateTable,
    loaded_at: Instant,
}

pub struct CurrencyService {
    source: Arc<dyn RateSource>,
    ttl: Duration,
    cache: RwLock<Option<CachedRates>>,
}

/// Upper-cased, supported code
pub fn normalize_code(code: &str) -> Result<String, CurrencyError> {
    let code = code.trim().to_uppercase();
    if SUPPORTED_CURRENCIES.contains(&code.as_str()) {
        Ok(code)
    } else {
        Err(CurrencyError::Unsupported(code))
    }
}

impl CurrencyService {
    pub fn new(source: Arc<dyn RateSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// Current table: cached while fresh, refetched when stale.
    pub async fn rates(&self) -> RateTable {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.loaded_at.elapsed() < self.ttl {
                    let mut table = cached.table.clone();
                    table.source = RateOrigin::Cached;
                    return table;
                }
            }
        }

        self.refresh().await
    }

    /// Fetch unconditionally; stale cache, then fallback, on failure.
    pub async fn refresh(&self) -> RateTable {
        match self.source.fetch().await {
            Ok(published) => {
                let mut rates: BTreeMap<String, Decimal> = published
                    .into_iter()
                    .filter(|r| SUPPORTED_CURRENCIES.contains(&r.code.as_str()))
                    .filter_map(|r| {
                        Decimal::try_from(r.rate)
                            .ok()
                            .map(|d| (r.code, d.round_dp(4)))
                    })
                    .collect();

                if rates.is_empty() {
                    tracing::warn!("NBU returned no supported currencies");
                    return self.degraded().await;
                }
                self.fill_missing(&mut rates).await;

                let table = RateTable {
                    base: BASE_CURRENCY,
                    rates,
                    source: RateOrigin::Live,
                    fetched_at: Some(chrono::Utc::now().timestamp()),
                };

                tracing::info!("Refreshed exchange rates ({} currencies)", table.rates.len());
                *self.cache.write().await = Some(CachedRates {
                    table: table.clone(),
                    loaded_at: Instant::now(),
                });
                table
            }
            Err(e) => {
                tracing::warn!("Exchange-rate fetch failed: {}", e);
                self.degraded().await
            }
        }
    }

    /// Codes absent from a partial feed keep the previous rate, else the built-in one.
    async fn fill_missing(&self, rates: &mut BTreeMap<String, Decimal>) {
        let cache = self.cache.read().await;
        let previous = cache.as_ref().map(|c| &c.table.rates);
        for (code, fallback) in FALLBACK_RATES.iter() {
            if rates.contains_key(*code) {
                continue;
            }
            let rate = previous
                .and_then(|p| p.get(*code))
                .copied()
                .unwrap_or(*fallback);
            tracing::warn!("NBU feed lacks {}, keeping {}", code, rate);
            rates.insert(code.to_string(), rate);
        }
    }

    async fn degraded(&self) -> RateTable {
        let cache = self.cache.read().await;
        match cache.as_ref() {
            Some(cached) => {
                let mut table = cached.table.clone();
                table.source = RateOrigin::Cached;
                table
            }
            None => RateTable::fallback(),
        }
    }

    pub async fn convert(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<Conversion, CurrencyError> {
        if amount <= Decimal::ZERO {
            return Err(CurrencyError::InvalidAmount);
        }
        let from = normalize_code(from)?;
        let to = normalize_code(to)?;

        let table = self.rates().await;
        let from_rate = table.rate_of(&from)?;
        let to_rate = table.rate_of(&to)?;
        let result = amount
            .checked_mul(from_rate)
            .and_then(|in_base| in_base.checked_div(to_rate))
            .ok_or(CurrencyError::OutOfRange)?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        Ok(Conversion {
            amount,
            from,
            to,
            result,
            rate_source: table.source,
        })
    }

    /// Price given in UAH minor units, expressed in `currency`.
    pub async fn price_in(&self, minor_uah: i64, currency: &str) -> Result<Decimal, CurrencyError> {
        let code = normalize_code(currency)?;
        let major = Decimal::new(minor_uah, 2);
        if code == BASE_CURRENCY {
            return Ok(major);
        }
        Ok(self.convert(major, BASE_CURRENCY, &code).await?.result)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::traits::PublishedRate;
    use crate::upstream::UpstreamError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Counts fetches; fails while `down` is set
    #[derive(Default)]
    pub(crate) struct StubRates {
        pub calls: AtomicUsize,
        pub down: AtomicBool,
    }

    #[async_trait]
    impl RateSource for StubRates {
        async fn fetch(&self) -> Result<Vec<PublishedRate>, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.down.load(Ordering::SeqCst) {
                return Err(UpstreamError::Status {
                    status: 503,
                    body: "down".to_string(),
                });
            }
            Ok(vec![
                PublishedRate {
                    code: "USD".to_string(),
                    name: "US Dollar".to_string(),
                    rate: 40.0,
                    date: "19.10.2026".to_string(),
                },
                PublishedRate {
                    code: "EUR".to_string(),
                    name: "Euro".to_string(),
                    rate: 44.0,
                    date: "19.10.2026".to_string(),
                },
                PublishedRate {
                    code: "JPY".to_string(),
                    name: "Yen".to_string(),
                    rate: 0.27,
                    date: "19.10.2026".to_string(),
                },
            ])
        }
    }

    #[tokio::test]
    async fn test_fresh_cache_is_reused() {
        let stub = Arc::new(StubRates::default());
        let svc = CurrencyService::new(stub.clone(), Duration::from_secs(3600));

        let first = svc.rates().await;
        let second = svc.rates().await;
        assert_eq!(first.source, RateOrigin::Live);
        assert_eq!(second.source, RateOrigin::Cached);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
        assert!(!first.rates.contains_key("JPY"));
    }

    #[tokio::test]
    async fn test_stale_cache_refetches() {
        let stub = Arc::new(StubRates::default());
        let svc = CurrencyService::new(stub.clone(), Duration::ZERO);

        svc.rates().await;
        svc.rates().await;
        assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_outage_serves_stale_then_fallback() {
        let stub = Arc::new(StubRates::default());
        stub.down.store(true, Ordering::SeqCst);
        let svc = CurrencyService::new(stub.clone(), Duration::ZERO);

        let table = svc.rates().await;
        assert_eq!(table.source, RateOrigin::Fallback);
        assert_eq!(table.rates["USD"], dec!(41.50));

        stub.down.store(false, Ordering::SeqCst);
        assert_eq!(svc.rates().await.source, RateOrigin::Live);

        stub.down.store(true, Ordering::SeqCst);
        let stale = svc.rates().await;
        assert_eq!(stale.source, RateOrigin::Cached);
        assert_eq!(stale.rates["USD"], dec!(40));
    }

    #[tokio::test]
    async fn test_convert() {
        let svc = CurrencyService::new(Arc::new(StubRates::default()), Duration::from_secs(60));

        let c = svc.convert(dec!(100), "usd", "UAH").await.unwrap();
        assert_eq!(c.result, dec!(4000.00));

        let c = svc.convert(dec!(99), "UAH", "EUR").await.unwrap();
        assert_eq!(c.result, dec!(2.25));

        let c = svc.convert(dec!(10), "EUR", "USD").await.unwrap();
        assert_eq!(c.result, dec!(11.00));

        assert!(matches!(
            svc.convert(dec!(1), "UAH", "JPY").await,
            Err(CurrencyError::Unsupported(_))
        ));
        assert!(matches!(
            svc.convert(dec!(0), "UAH", "USD").await,
            Err(CurrencyError::InvalidAmount)
        ));
    }

    #[tokio::test]
    async fn test_partial_feed_keeps_every_supported_code() {
        let svc = CurrencyService::new(Arc::new(StubRates::default()), Duration::ZERO);

        // The feed carries USD and EUR only
        let table = svc.rates().await;
        assert_eq!(table.source, RateOrigin::Live);
        assert_eq!(table.rates["GBP"], dec!(52.80));
        assert_eq!(table.rates["PLN"], dec!(10.45));

        let c = svc.convert(dec!(10), "UAH", "GBP").await.unwrap();
        assert_eq!(c.result, dec!(0.19));
        assert!(svc.price_in(9900, "PLN").await.is_ok());
    }

    #[tokio::test]
    async fn test_partial_feed_prefers_previous_rate() {
        let svc = CurrencyService::new(Arc::new(StubRates::default()), Duration::ZERO);
        *svc.cache.write().await = Some(CachedRates {
            table: RateTable {
                base: BASE_CURRENCY,
                rates: [("GBP".to_string(), dec!(50))].into_iter().collect(),
                source: RateOrigin::Live,
                fetched_at: None,
            },
            loaded_at: Instant::now(),
        });

        let table = svc.refresh().await;
        assert_eq!(table.rates["GBP"], dec!(50));
        assert_eq!(table.rates["USD"], dec!(40));
    }

    #[tokio::test]
    async fn test_overflowing_amount_is_rejected() {
        let svc = CurrencyService::new(Arc::new(StubRates::default()), Duration::from_secs(60));
        assert!(matches!(
            svc.convert(Decimal::MAX, "USD", "UAH").await,
            Err(CurrencyError::OutOfRange)
        ));
        assert!(svc.convert(Decimal::MAX, "UAH", "USD").await.is_ok());
    }

    #[tokio::test]
    async fn test_price_in() {
        let svc = CurrencyService::new(Arc::new(StubRates::default()), Duration::from_secs(60));
        assert_eq!(svc.price_in(24900, "UAH").await.unwrap(), dec!(249.00));
        assert_eq!(svc.price_in(24900, "usd").await.unwrap(), dec!(6.23));
    }
}
