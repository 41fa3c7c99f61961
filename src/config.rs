//! Runtime configuration
//! Every flag can also be supplied through its environment variable.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:astrology.db")]
    pub database_url: String,

    /// Directory containing static frontend files (for production)
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, env = "JWT_EXPIRY_HOURS", default_value_t = 168)]
    pub jwt_expiry_hours: i64,

    #[arg(long, env = "BCRYPT_COST", default_value_t = 12)]
    pub bcrypt_cost: u32,

    /// Credits granted to every new account
    #[arg(long, env = "SIGNUP_BONUS_CREDITS", default_value_t = 3)]
    pub signup_bonus_credits: i64,

    /// Without a key every generation is served from fallback content
    #[arg(long, env = "LLM_API_KEY", default_value = "", hide_env_values = true)]
    pub llm_api_key: String,

    #[arg(long, env = "LLM_MODEL", default_value = "gemini-1.5-flash")]
    pub llm_model: String,

    #[arg(
        long,
        env = "LLM_BASE_URL",
        default_value = "https://generativelanguage.googleapis.com"
    )]
    pub llm_base_url: String,

    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value_t = 60)]
    pub llm_timeout_secs: u64,

    #[arg(long, env = "PAYMENT_MERCHANT_ID", default_value = "")]
    pub payment_merchant_id: String,

    #[arg(long, env = "PAYMENT_SECRET", default_value = "", hide_env_values = true)]
    pub payment_secret: String,

    #[arg(
        long,
        env = "PAYMENT_BASE_URL",
        default_value = "https://api.spc-pay.example/v1"
    )]
    pub payment_base_url: String,

    /// Externally reachable origin, used for payment callback and return URLs
    #[arg(long, env = "PUBLIC_BASE_URL", default_value = "http://localhost:3000")]
    pub public_base_url: String,

    #[arg(
        long,
        env = "NBU_URL",
        default_value = "https://bank.gov.ua/NBUStatService/v1/statdirectory/exchange?json"
    )]
    pub nbu_url: String,

    #[arg(long, env = "CURRENCY_TTL_SECS", default_value_t = 3600)]
    pub currency_ttl_secs: u64,

    #[arg(long, env = "PENDING_PAYMENT_TTL_HOURS", default_value_t = 24)]
    pub pending_payment_ttl_hours: i64,
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.trim().is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }
        if self.jwt_expiry_hours <= 0 {
            return Err("JWT_EXPIRY_HOURS must be positive".to_string());
        }
        if self.currency_ttl_secs == 0 {
            return Err("CURRENCY_TTL_SECS must be positive".to_string());
        }
        if self.pending_payment_ttl_hours <= 0 {
            return Err("PENDING_PAYMENT_TTL_HOURS must be positive".to_string());
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err("BCRYPT_COST must be between 4 and 31".to_string());
        }
        if self.signup_bonus_credits < 0 {
            return Err("SIGNUP_BONUS_CREDITS must not be negative".to_string());
        }
        Ok(())
    }

    pub fn payments_configured(&self) -> bool {
        !self.payment_merchant_id.is_empty() && !self.payment_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["astrology-server", "--jwt-secret", "s3cret"]);
        assert_eq!(config.jwt_expiry_hours, 168);
        assert_eq!(config.signup_bonus_credits, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_blank_secret() {
        let config = Config::parse_from(["astrology-server", "--jwt-secret", "  "]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let config = Config::parse_from([
            "astrology-server",
            "--jwt-secret",
            "x",
            "--currency-ttl-secs",
            "0",
        ]);
        assert!(config.validate().is_err());
    }
}
