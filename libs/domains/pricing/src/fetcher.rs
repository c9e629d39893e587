//! Price Fetcher
//!
//! Drives batching and resolution over a whole resource tree and picks the
//! matched price out of every payload.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::batch::{batch_requests, DEFAULT_BATCH_SIZE};
use crate::error::PricingResult;
use crate::missing::MissingPriceTracker;
use crate::models::Resource;
use crate::query::{currency_or_default, QueryResult};
use crate::resolver::QueryResolver;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// The price picked for a cost component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceMatch {
    pub price_hash: String,
    /// Decimal string in the requested currency
    pub unit_price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_length: Option<String>,
}

/// Outcome of pricing one cost component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentPrice {
    pub resource_name: String,
    pub resource_type: String,
    pub component_name: String,
    pub price: Option<PriceMatch>,
}

pub struct PriceFetcher {
    resolver: QueryResolver,
    batch_size: usize,
    concurrency: usize,
    missing: Arc<MissingPriceTracker>,
}

impl PriceFetcher {
    pub fn new(resolver: QueryResolver) -> Self {
        Self {
            resolver,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            missing: Arc::new(MissingPriceTracker::new()),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Maximum number of batches in flight at once
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Components left without a price by the most recent `populate_prices`
    pub fn missing_prices(&self) -> &MissingPriceTracker {
        &self.missing
    }

    /// Price every cost component of `resources`, in tree order.
    ///
    /// Components without a matching price come back with `price: None` and
    /// are recorded as missing; the record from any previous run is cleared
    /// first. A failed pricing API call fails the run.
    pub async fn populate_prices(
        &self,
        resources: &[Resource],
        currency: &str,
    ) -> PricingResult<Vec<ComponentPrice>> {
        let currency = currency_or_default(currency);
        self.missing.clear();
        let batches = batch_requests(resources, self.batch_size, currency);

        info!(
            resources = resources.len(),
            batches = batches.len(),
            batch_size = self.batch_size,
            currency = currency,
            "Resolving prices"
        );

        let resolved: Vec<Vec<QueryResult<'_>>> = stream::iter(batches)
            .map(|batch| self.resolver.resolve(batch))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let prices: Vec<ComponentPrice> = resolved
            .iter()
            .flatten()
            .map(|result| {
                let price = extract_price(result, currency);
                if price.is_none() {
                    self.missing.record(&result.key);
                }
                ComponentPrice {
                    resource_name: result.key.resource.name.clone(),
                    resource_type: result.key.resource.resource_type.clone(),
                    component_name: result.key.component.name.clone(),
                    price,
                }
            })
            .collect();

        let found = prices.iter().filter(|p| p.price.is_some()).count();
        info!(
            components = prices.len(),
            found = found,
            missing = prices.len() - found,
            "Resolved prices"
        );

        Ok(prices)
    }
}

/// Pick the first price of the first product from a pricing API payload
pub fn extract_price(result: &QueryResult<'_>, currency: &str) -> Option<PriceMatch> {
    let resource = &result.key.resource.name;
    let component = &result.key.component.name;

    let products = result
        .result
        .pointer("/data/products")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let Some(product) = products.first() else {
        debug!(resource = %resource, component = %component, "No products found");
        return None;
    };
    if products.len() > 1 {
        warn!(
            resource = %resource,
            component = %component,
            products = products.len(),
            "Multiple products found, using the first product"
        );
    }

    let prices = product
        .get("prices")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let Some(price) = prices.first() else {
        debug!(resource = %resource, component = %component, "No prices found");
        return None;
    };
    if prices.len() > 1 {
        warn!(
            resource = %resource,
            component = %component,
            prices = prices.len(),
            "Multiple prices found, using the first price"
        );
    }

    let unit_price = match price.get(currency) {
        Some(Value::String(amount)) => amount.clone(),
        Some(Value::Number(amount)) => amount.to_string(),
        _ => {
            debug!(
                resource = %resource,
                component = %component,
                currency = currency,
                "Price has no amount in the requested currency"
            );
            return None;
        }
    };

    Some(PriceMatch {
        price_hash: price
            .get("priceHash")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        unit_price,
        term_length: price
            .get("termLength")
            .and_then(Value::as_str)
            .filter(|term| !term.is_empty())
            .map(str::to_string),
    })
}
