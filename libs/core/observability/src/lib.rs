//! Observability utilities for price query resolution.
//!
//! This crate provides:
//! - Prometheus recorder installation and text rendering
//! - Metric recorders for cache lookups, deduplication and pricing API calls
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, render_metrics, PriceQueryMetrics};
//!
//! init_metrics()?;
//!
//! PriceQueryMetrics::record_cache_lookup(12, 3);
//! PriceQueryMetrics::record_network_call(3);
//!
//! println!("{}", render_metrics());
//! ```

pub mod pricing;

pub use pricing::{BatchTimer, CacheOutcome, PriceQueryMetrics};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::info;

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus metrics recorder.
///
/// The first successful call installs the global recorder; later calls
/// return the same handle.
pub fn init_metrics() -> Result<&'static PrometheusHandle, BuildError> {
    METRICS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new().install_recorder()?;

        info!("Prometheus metrics recorder initialized");
        register_metric_descriptions();

        Ok(handle)
    })
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Render all recorded metrics in the Prometheus exposition format
pub fn render_metrics() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

/// Register metric descriptions for documentation
fn register_metric_descriptions() {
    use metrics::describe_counter;
    use metrics::describe_gauge;
    use metrics::describe_histogram;

    describe_counter!(
        "price_query_cache_lookups_total",
        "Price query cache lookups by outcome (hit or miss)"
    );
    describe_counter!(
        "price_query_deduplicated_total",
        "Cache misses collapsed into an earlier identical query in the same batch"
    );
    describe_counter!(
        "price_query_network_queries_total",
        "Price queries sent to the pricing API"
    );
    describe_counter!(
        "price_query_network_calls_total",
        "Round trips made to the pricing API"
    );
    describe_counter!(
        "price_query_short_responses_total",
        "Pricing API responses with fewer results than queries sent"
    );
    describe_counter!(
        "price_query_batches_total",
        "Resolved price query batches by status"
    );
    describe_histogram!(
        "price_query_batch_duration_seconds",
        "Time spent resolving one batch of price queries"
    );
    describe_gauge!(
        "price_query_cache_entries",
        "Entries currently held by the price cache"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_idempotent_and_renders_recorded_metrics() {
        let first = init_metrics().unwrap();
        let second = init_metrics().unwrap();
        assert!(std::ptr::eq(first, second));

        PriceQueryMetrics::record_cache_lookup(3, 1);
        PriceQueryMetrics::record_network_call(1);

        let rendered = render_metrics();
        assert!(rendered.contains("price_query_cache_lookups_total"));
        assert!(rendered.contains("price_query_network_queries_total"));
    }
}
