//! Configuration for the price estimator

use core_config::{
    env_flag, env_or_default, env_parse, ConfigError, Environment, FromEnv, PricingApiConfig,
};
use domain_pricing::{
    currency_or_default, DEFAULT_BATCH_SIZE, DEFAULT_CACHE_CAPACITY, DEFAULT_CONCURRENCY,
    DEFAULT_CURRENCY,
};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub api: PricingApiConfig,
    /// Maximum number of queries per pricing API request
    pub batch_size: usize,
    /// Maximum number of batches in flight
    pub concurrency: usize,
    pub cache_enabled: bool,
    pub cache_capacity: u64,
    pub currency: String,
}

/// Printable view of the configuration, API key redacted
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    pub environment: &'static str,
    pub endpoint: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub batch_size: usize,
    pub concurrency: usize,
    pub cache_enabled: bool,
    pub cache_capacity: u64,
    pub currency: String,
}

impl Config {
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            environment: if self.environment.is_production() {
                "production"
            } else {
                "development"
            },
            endpoint: self.api.graphql_url(),
            api_key: self.api.redacted_api_key(),
            timeout_secs: self.api.timeout.as_secs(),
            max_retries: self.api.max_retries,
            batch_size: self.batch_size,
            concurrency: self.concurrency,
            cache_enabled: self.cache_enabled,
            cache_capacity: self.cache_capacity,
            currency: self.currency.clone(),
        }
    }
}

fn positive(key: &str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            details: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        let currency = env_or_default("PRICING_CURRENCY", DEFAULT_CURRENCY);

        Ok(Config {
            environment: Environment::from_env(),
            api: PricingApiConfig::from_env()?,
            batch_size: positive(
                "PRICING_BATCH_SIZE",
                env_parse("PRICING_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            )?,
            concurrency: positive(
                "PRICING_CONCURRENCY",
                env_parse("PRICING_CONCURRENCY", DEFAULT_CONCURRENCY)?,
            )?,
            cache_enabled: env_flag("PRICING_CACHE_ENABLED", true)?,
            cache_capacity: env_parse("PRICING_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?,
            currency: currency_or_default(&currency).to_uppercase(),
        })
    }
}
