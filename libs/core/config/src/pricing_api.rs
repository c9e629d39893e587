use crate::{env_optional, env_parse, env_required, ConfigError, FromEnv};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_PRICING_ENDPOINT: &str = "https://pricing.api.infracost.io";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 4;

/// Connection settings for the remote pricing API
#[derive(Clone)]
pub struct PricingApiConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Per-call timeout, applied to every attempt
    pub timeout: Duration,
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
}

impl PricingApiConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// URL of the GraphQL endpoint
    pub fn graphql_url(&self) -> String {
        format!("{}/graphql", self.endpoint.trim_end_matches('/'))
    }

    /// API key with everything but the first four characters masked
    pub fn redacted_api_key(&self) -> String {
        let visible: String = self.api_key.chars().take(4).collect();
        format!("{}****", visible)
    }
}

impl fmt::Debug for PricingApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PricingApiConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.redacted_api_key())
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl FromEnv for PricingApiConfig {
    /// Reads:
    /// - PRICING_API_KEY: required
    /// - PRICING_API_ENDPOINT: defaults to the public pricing API
    /// - PRICING_API_TIMEOUT_SECS: defaults to 30
    /// - PRICING_API_MAX_RETRIES: defaults to 4
    fn from_env() -> Result<Self, ConfigError> {
        let api_key = env_required("PRICING_API_KEY")?;
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar("PRICING_API_KEY".to_string()));
        }

        let endpoint = env_optional("PRICING_API_ENDPOINT")
            .unwrap_or_else(|| DEFAULT_PRICING_ENDPOINT.to_string());

        let timeout_secs: u64 = env_parse("PRICING_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PRICING_API_TIMEOUT_SECS".to_string(),
                details: "timeout must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            endpoint,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
            max_retries: env_parse("PRICING_API_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
        })
    }
}
