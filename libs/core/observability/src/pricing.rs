//! Metrics for price query batching, deduplication and caching.

use metrics::{counter, gauge, histogram};
use std::time::Instant;
use strum::{Display, IntoStaticStr};

/// Result of a single cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum CacheOutcome {
    Hit,
    Miss,
}

/// Price query metrics recorder
pub struct PriceQueryMetrics;

impl PriceQueryMetrics {
    // =========================================================================
    // Cache
    // =========================================================================

    /// Record the hit/miss split of one batch's cache partition
    pub fn record_cache_lookup(hits: usize, misses: usize) {
        Self::record_cache_outcome(CacheOutcome::Hit, hits);
        Self::record_cache_outcome(CacheOutcome::Miss, misses);
    }

    fn record_cache_outcome(outcome: CacheOutcome, count: usize) {
        let outcome: &'static str = outcome.into();
        counter!("price_query_cache_lookups_total", "outcome" => outcome).increment(count as u64);
    }

    /// Set the number of entries held by the cache
    pub fn set_cache_entries(count: u64) {
        gauge!("price_query_cache_entries").set(count as f64);
    }

    // =========================================================================
    // Network
    // =========================================================================

    /// Record misses that were folded into an earlier identical query
    pub fn record_deduplicated(count: usize) {
        if count > 0 {
            counter!("price_query_deduplicated_total").increment(count as u64);
        }
    }

    /// Record one round trip carrying `queries` price queries
    pub fn record_network_call(queries: usize) {
        counter!("price_query_network_calls_total").increment(1);
        counter!("price_query_network_queries_total").increment(queries as u64);
    }

    /// Record a response that came back with fewer results than requested
    pub fn record_short_response(sent: usize, received: usize) {
        counter!("price_query_short_responses_total").increment(1);

        tracing::warn!(
            sent = sent,
            received = received,
            "Pricing API returned fewer results than queries sent"
        );
    }

    // =========================================================================
    // Batches
    // =========================================================================

    pub fn record_batch_resolved(queries: usize, duration_secs: f64) {
        counter!("price_query_batches_total", "status" => "resolved").increment(1);
        histogram!("price_query_batch_duration_seconds").record(duration_secs);

        tracing::debug!(
            queries = queries,
            duration_secs = duration_secs,
            "Price query batch resolved"
        );
    }

    pub fn record_batch_failed(error: &str) {
        counter!("price_query_batches_total", "status" => "failed").increment(1);

        tracing::error!(error = error, "Price query batch failed");
    }
}

/// Timer guard for batch resolution.
///
/// Records the duration when `stop()` is called or when dropped.
pub struct BatchTimer {
    start: Instant,
    queries: usize,
    stopped: bool,
}

impl BatchTimer {
    /// Start timing a batch of `queries` price queries
    pub fn start(queries: usize) -> Self {
        Self {
            start: Instant::now(),
            queries,
            stopped: false,
        }
    }

    /// Stop the timer and record the duration. Returns duration in milliseconds.
    pub fn stop(&mut self) -> u64 {
        if self.stopped {
            return 0;
        }
        self.stopped = true;

        let duration = self.start.elapsed();
        PriceQueryMetrics::record_batch_resolved(self.queries, duration.as_secs_f64());

        duration.as_millis() as u64
    }

    /// Drop the timer without recording, used when the batch failed
    pub fn discard(mut self) {
        self.stopped = true;
    }
}

impl Drop for BatchTimer {
    fn drop(&mut self) {
        if !self.stopped {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_outcome_labels() {
        assert_eq!(CacheOutcome::Hit.to_string(), "hit");
        let miss: &'static str = CacheOutcome::Miss.into();
        assert_eq!(miss, "miss");
    }

    #[test]
    fn test_batch_timer_records_once() {
        let mut timer = BatchTimer::start(4);
        timer.stop();
        assert_eq!(timer.stop(), 0);
    }

    #[test]
    fn test_recorders_accept_any_counts() {
        PriceQueryMetrics::record_cache_lookup(0, 0);
        PriceQueryMetrics::record_deduplicated(2);
        PriceQueryMetrics::record_short_response(3, 2);
        PriceQueryMetrics::set_cache_entries(10);
        BatchTimer::start(1).discard();
    }
}
