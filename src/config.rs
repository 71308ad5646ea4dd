//! Configuration module
//!
//! Loads configuration from environment variables.

use chrono::Duration;
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// How long a completed idempotency record is replayable
    pub idempotency_ttl_secs: i64,

    /// TTL for read-path cache entries
    pub cache_ttl_secs: i64,

    /// Maximum entries per read-path cache
    pub cache_capacity: usize,

    /// How long an FX quote offer stays open
    pub quote_offer_ttl_secs: i64,

    /// Whether payment submissions must carry a payload signature
    pub require_payment_signature: bool,

    /// Risk threshold: payments above this amount are declined
    pub risk_decline_over: rust_decimal::Decimal,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let idempotency_ttl_secs = env::var("IDEMPOTENCY_TTL_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("IDEMPOTENCY_TTL_SECS"))?;

        let cache_ttl_secs = env::var("CACHE_TTL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("CACHE_TTL_SECS"))?;

        let cache_capacity = env::var("CACHE_CAPACITY")
            .unwrap_or_else(|_| "1024".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("CACHE_CAPACITY"))?;

        let quote_offer_ttl_secs = env::var("QUOTE_OFFER_TTL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("QUOTE_OFFER_TTL_SECS"))?;

        let require_payment_signature = env::var("REQUIRE_PAYMENT_SIGNATURE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("REQUIRE_PAYMENT_SIGNATURE"))?;

        let risk_decline_over = env::var("RISK_DECLINE_OVER")
            .unwrap_or_else(|_| "50000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("RISK_DECLINE_OVER"))?;

        Ok(Self {
            host,
            port,
            environment,
            idempotency_ttl_secs,
            cache_ttl_secs,
            cache_capacity,
            quote_offer_ttl_secs,
            require_payment_signature,
            risk_decline_over,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::seconds(self.idempotency_ttl_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::seconds(self.cache_ttl_secs)
    }

    pub fn quote_offer_ttl(&self) -> Duration {
        Duration::seconds(self.quote_offer_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: "development".to_string(),
            idempotency_ttl_secs: 86_400,
            cache_ttl_secs: 300,
            cache_capacity: 1024,
            quote_offer_ttl_secs: 300,
            require_payment_signature: false,
            risk_decline_over: rust_decimal::Decimal::new(50_000, 0),
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
