use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::core::services::payments::PaymentSettings;
use crate::core::services::{
    AuthService, CreditLedger, CurrencyService, GenerationService, PaymentService,
};
use crate::core::traits::{PaymentGateway, RateSource, TextGenerator};
use crate::ratelimit::{
    FixedWindowLimiter, RateLimiter, SlidingWindowLimiter, TokenBucketLimiter,
};
use crate::upstream::{GeminiClient, NbuClient, SpcClient};

/// Outside services the state talks to
pub struct Upstreams {
    pub generator: Arc<dyn TextGenerator>,
    pub rates: Arc<dyn RateSource>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl Upstreams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            generator: Arc::new(GeminiClient::new(
                &config.llm_base_url,
                &config.llm_model,
                &config.llm_api_key,
                config.llm_timeout_secs,
            )),
            rates: Arc::new(NbuClient::new(&config.nbu_url)),
            gateway: Arc::new(SpcClient::new(
                &config.payment_base_url,
                &config.payment_secret,
            )),
        }
    }
}

pub struct Limiters {
    /// Login and registration, per IP
    pub auth: FixedWindowLimiter,
    /// Content generation, per user
    pub ai: SlidingWindowLimiter,
    /// Everything else under /api, per IP
    pub api: TokenBucketLimiter,
}

impl Default for Limiters {
    fn default() -> Self {
        Self {
            auth: FixedWindowLimiter::new(10, Duration::from_secs(15 * 60)),
            ai: SlidingWindowLimiter::new(10, Duration::from_secs(60)),
            api: TokenBucketLimiter::new(60, 1.0),
        }
    }
}

impl Limiters {
    pub fn all(&self) -> [&dyn RateLimiter; 3] {
        [&self.auth, &self.ai, &self.api]
    }
}

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db_pool: SqlitePool,
    pub auth: AuthService,
    pub ledger: CreditLedger,
    pub currency: Arc<CurrencyService>,
    pub payments: PaymentService,
    pub generation: GenerationService,
    pub limiters: Limiters,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, sqlx::Error> {
        let db_pool = crate::core::db::init_db(&config.database_url).await?;
        let upstreams = Upstreams::from_config(&config);
        Ok(Self::with_upstreams(config, db_pool, upstreams, Limiters::default()))
    }

    pub fn with_upstreams(
        config: Config,
        db_pool: SqlitePool,
        upstreams: Upstreams,
        limiters: Limiters,
    ) -> Self {
        let ledger = CreditLedger::new(db_pool.clone());
        let currency = Arc::new(CurrencyService::new(
            upstreams.rates,
            Duration::from_secs(config.currency_ttl_secs),
        ));

        let auth = AuthService::new(
            db_pool.clone(),
            config.jwt_secret.clone(),
            config.jwt_expiry_hours,
            config.bcrypt_cost,
            config.signup_bonus_credits,
        );

        let payments = PaymentService::new(
            db_pool.clone(),
            upstreams.gateway,
            currency.clone(),
            PaymentSettings {
                merchant_id: config.payment_merchant_id.clone(),
                secret: config.payment_secret.clone(),
                public_base_url: config.public_base_url.clone(),
            },
        );

        let generation =
            GenerationService::new(db_pool.clone(), ledger.clone(), upstreams.generator);

        if !config.payments_configured() {
            tracing::warn!("Payment processor credentials missing; checkout is disabled");
        }
        if config.llm_api_key.is_empty() {
            tracing::warn!("LLM_API_KEY not set; generation will serve fallback content");
        }

        Self {
            config,
            db_pool,
            auth,
            ledger,
            currency,
            payments,
            generation,
            limiters,
        }
    }
}
