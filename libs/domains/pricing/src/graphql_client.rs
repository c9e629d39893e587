//! GraphQL Pricing API Client
//!
//! Posts batches of price queries to `{endpoint}/graphql` and returns one raw
//! JSON result per query. Transient failures are retried with exponential
//! backoff; the last error is returned once retries run out.

use async_trait::async_trait;
use core_config::PricingApiConfig;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::QueryClient;
use crate::error::{PricingError, PricingResult};
use crate::query::PriceQuery;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 100;

/// Pricing API client over HTTP
pub struct GraphQlPricingClient {
    client: Client,
    config: PricingApiConfig,
    trace_id: Uuid,
}

impl GraphQlPricingClient {
    pub fn new(config: PricingApiConfig) -> PricingResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_HOST)
            .user_agent(user_agent())
            .build()?;

        Ok(Self {
            client,
            config,
            trace_id: Uuid::new_v4(),
        })
    }

    pub fn config(&self) -> &PricingApiConfig {
        &self.config
    }

    /// One POST, no retries
    async fn post_queries(&self, queries: &[PriceQuery]) -> PricingResult<Vec<Value>> {
        let url = self.config.graphql_url();
        debug!(
            url = %url,
            trace_id = %self.trace_id,
            queries = queries.len(),
            "POST request to pricing API"
        );

        let response = self
            .client
            .post(&url)
            .headers(request_headers(&self.config.api_key)?)
            .json(queries)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(PricingError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        decode_results(&body)
    }
}

#[async_trait]
impl QueryClient for GraphQlPricingClient {
    async fn send(&self, queries: &[PriceQuery]) -> PricingResult<Vec<Value>> {
        if queries.is_empty() {
            debug!("Skipping GraphQL request as no queries have been specified");
            return Ok(Vec::new());
        }

        let mut attempt: u32 = 0;
        loop {
            match self.post_queries(queries).await {
                Ok(results) => {
                    if attempt > 0 {
                        debug!(
                            attempt = attempt + 1,
                            "Pricing API request succeeded after retries"
                        );
                    }
                    return Ok(results);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Pricing API request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Keys issued by the hosted service (`ics` prefix) are bearer tokens;
/// anything else goes in `X-Api-Key`.
fn auth_header(api_key: &str) -> (HeaderName, String) {
    if api_key.starts_with("ics") {
        (reqwest::header::AUTHORIZATION, format!("Bearer {}", api_key))
    } else {
        (HeaderName::from_static("x-api-key"), api_key.to_string())
    }
}

fn request_headers(api_key: &str) -> PricingResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let (name, value) = auth_header(api_key);
    let mut value = HeaderValue::from_str(&value).map_err(|e| {
        PricingError::InvalidInput(format!("API key is not a valid header value: {}", e))
    })?;
    value.set_sensitive(true);
    headers.insert(name, value);

    Ok(headers)
}

/// Delay before retry number `attempt + 1`: 1s, 2s, 4s, ... capped at 30s
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    INITIAL_BACKOFF.saturating_mul(factor).min(MAX_BACKOFF)
}

/// The pricing API answers a batch with a JSON array, one element per query
fn decode_results(body: &[u8]) -> PricingResult<Vec<Value>> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| PricingError::Decode(e.to_string()))?;

    match value {
        Value::Array(results) => Ok(results),
        other => Err(PricingError::Decode(format!(
            "expected a JSON array of results, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
