//! Estimate command
//!
//! Loads a resource tree and prices it, optionally several times over one
//! shared cache.

use domain_pricing::{
    currency_or_default, BoundedPriceCache, ComponentPrice, PriceCache, PriceFetcher,
    QueryClient, QueryResolver, Resource,
};
use eyre::{Result, WrapErr};
use serde::Serialize;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::config::Config;

/// Options of one `estimate` invocation, already merged over the configuration
#[derive(Debug, Clone)]
pub struct EstimateOptions {
    pub input: PathBuf,
    pub currency: String,
    pub batch_size: usize,
    pub concurrency: usize,
    pub cache_capacity: Option<u64>,
    pub repeat: NonZeroUsize,
}

impl EstimateOptions {
    pub fn new(
        config: &Config,
        input: PathBuf,
        currency: Option<String>,
        batch_size: Option<NonZeroUsize>,
        no_cache: bool,
        repeat: NonZeroUsize,
    ) -> Self {
        let cache_enabled = config.cache_enabled && !no_cache;
        let currency = match currency {
            Some(code) => currency_or_default(&code).to_uppercase(),
            None => config.currency.clone(),
        };
        Self {
            input,
            currency,
            batch_size: batch_size.map_or(config.batch_size, NonZeroUsize::get),
            concurrency: config.concurrency,
            cache_capacity: cache_enabled.then_some(config.cache_capacity),
            repeat,
        }
    }
}

/// Result of the last run
#[derive(Debug, Serialize)]
pub struct EstimateReport {
    pub currency: String,
    pub prices: Vec<ComponentPrice>,
    pub missing_components: Vec<String>,
    pub missing_resources: BTreeMap<String, usize>,
}

/// Read a JSON array of resources
pub fn load_resources(path: &Path) -> Result<Vec<Resource>> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    let resources: Vec<Resource> = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("Failed to parse resources from {}", path.display()))?;
    Ok(resources)
}

pub async fn run(
    options: &EstimateOptions,
    client: Arc<dyn QueryClient>,
) -> Result<EstimateReport> {
    let resources = load_resources(&options.input)?;
    info!(
        input = %options.input.display(),
        resources = resources.len(),
        "Loaded resources"
    );

    let cache = options
        .cache_capacity
        .map(|capacity| Arc::new(BoundedPriceCache::new(capacity)));

    let mut resolver = QueryResolver::new(client);
    if let Some(cache) = &cache {
        resolver = resolver.with_cache(cache.clone());
    }

    let mut report = None;
    for run in 1..=options.repeat.get() {
        let fetcher = PriceFetcher::new(resolver.clone())
            .with_batch_size(options.batch_size)
            .with_concurrency(options.concurrency);

        let start = Instant::now();
        let prices = fetcher.populate_prices(&resources, &options.currency).await?;

        info!(
            run = run,
            components = prices.len(),
            cache_entries = cache.as_ref().map(|c| c.entry_count()),
            duration_ms = start.elapsed().as_millis() as u64,
            "Estimate run complete"
        );

        let missing = fetcher.missing_prices();
        report = Some(EstimateReport {
            currency: options.currency.clone(),
            prices,
            missing_components: missing.missing_components(),
            missing_resources: missing.missing_resources(),
        });
    }

    report.ok_or_else(|| eyre::eyre!("Estimate ran zero times"))
}
