//! Query resolution engine.
//!
//! Resolves one batch with at most one call to the pricing API:
//!
//! 1. fingerprint every query
//! 2. serve what the cache already holds
//! 3. collapse identical misses onto their first occurrence
//! 4. send the remaining unique queries in a single request
//! 5. cache what came back and fan each payload out to every slot that asked
//!    for it
//!
//! The output always has one result per input pair, in input order.

use observability::{BatchTimer, PriceQueryMetrics};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::batch::BatchRequest;
use crate::cache::{CacheEntry, PriceCache};
use crate::client::QueryClient;
use crate::error::{PricingError, PricingResult};
use crate::fingerprint::{fingerprint, Fingerprint};
use crate::query::QueryResult;

/// Resolves batches against a pricing API client and an optional shared cache
#[derive(Clone)]
pub struct QueryResolver {
    client: Arc<dyn QueryClient>,
    cache: Option<Arc<dyn PriceCache>>,
}

impl QueryResolver {
    /// Resolver without a cache: every query goes to the network
    pub fn new(client: Arc<dyn QueryClient>) -> Self {
        Self {
            client,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn PriceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&Arc<dyn PriceCache>> {
        self.cache.as_ref()
    }

    /// Resolve every query of `batch`.
    ///
    /// Fails only when the pricing API call fails, in which case nothing is
    /// written to the cache. Queries the API returned no result for resolve to
    /// a null payload.
    pub async fn resolve<'a>(
        &self,
        batch: BatchRequest<'a>,
    ) -> PricingResult<Vec<QueryResult<'a>>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let fingerprints: Vec<Fingerprint> = batch
            .queries()
            .iter()
            .enumerate()
            .map(|(index, query)| {
                let (fp, ok) = fingerprint(query);
                if !ok {
                    debug!(index = index, "Failed to fingerprint price query, using sentinel");
                }
                fp
            })
            .collect();

        self.resolve_fingerprinted(batch, fingerprints).await
    }

    /// Resolve a non-empty batch whose fingerprints are already known, one per
    /// query in input order.
    async fn resolve_fingerprinted<'a>(
        &self,
        batch: BatchRequest<'a>,
        fingerprints: Vec<Fingerprint>,
    ) -> PricingResult<Vec<QueryResult<'a>>> {
        let (keys, queries) = batch.into_parts();
        let mut timer = BatchTimer::start(queries.len());

        let mut results: Vec<QueryResult<'a>> = keys
            .into_iter()
            .zip(queries)
            .map(|(key, query)| QueryResult::pending(key, query))
            .collect();

        let misses = self.fill_from_cache(&fingerprints, &mut results);

        // Position in `unique` of the query each miss is answered by
        let mut unique: Vec<usize> = Vec::new();
        let mut first_seen: HashMap<Fingerprint, usize> = HashMap::new();
        let answered_by: Vec<usize> = misses
            .iter()
            .map(|&index| {
                *first_seen.entry(fingerprints[index]).or_insert_with(|| {
                    unique.push(index);
                    unique.len() - 1
                })
            })
            .collect();
        PriceQueryMetrics::record_deduplicated(misses.len() - unique.len());

        let payloads = if unique.is_empty() {
            Vec::new()
        } else {
            let to_send: Vec<_> = unique.iter().map(|&i| results[i].query.clone()).collect();
            PriceQueryMetrics::record_network_call(to_send.len());

            match self.client.send(&to_send).await {
                Ok(payloads) => payloads,
                Err(e) => {
                    timer.discard();
                    PriceQueryMetrics::record_batch_failed(&e.to_string());
                    return Err(e);
                }
            }
        };

        if payloads.len() < unique.len() {
            PriceQueryMetrics::record_short_response(unique.len(), payloads.len());
        }

        if let Some(cache) = self.cache.as_ref().filter(|_| !payloads.is_empty()) {
            // Sentinel payloads stay out of the cache so a collision cannot
            // outlive this batch.
            for (&index, payload) in unique.iter().zip(&payloads) {
                let fp = fingerprints[index];
                if !fp.is_sentinel() {
                    cache.put(fp, CacheEntry::new(payload.clone()));
                }
            }
            PriceQueryMetrics::set_cache_entries(cache.entry_count());
        }

        for (&index, &slot) in misses.iter().zip(&answered_by) {
            let payload = payloads.get(slot).cloned().unwrap_or(Value::Null);
            results[index].fill(payload);
        }

        if let Some(index) = results.iter().position(|r| !r.is_filled()) {
            return Err(PricingError::Internal(format!(
                "query {} of the batch was left unresolved",
                index
            )));
        }

        timer.stop();
        Ok(results)
    }

    /// Fill every slot the cache can answer and return the indices of the rest,
    /// in input order.
    fn fill_from_cache(
        &self,
        fingerprints: &[Fingerprint],
        results: &mut [QueryResult<'_>],
    ) -> Vec<usize> {
        let Some(cache) = &self.cache else {
            PriceQueryMetrics::record_cache_lookup(0, fingerprints.len());
            return (0..fingerprints.len()).collect();
        };

        let mut misses = Vec::new();
        for (index, &fp) in fingerprints.iter().enumerate() {
            match cache.get(fp) {
                Some(entry) => {
                    debug!(fingerprint = %fp, "Using cached price query result");
                    results[index].fill(entry.result);
                }
                None => misses.push(index),
            }
        }

        let hits = fingerprints.len() - misses.len();
        debug!(
            hits = hits,
            total = fingerprints.len(),
            "{}/{} queries were built from cache",
            hits,
            fingerprints.len()
        );
        PriceQueryMetrics::record_cache_lookup(hits, misses.len());

        misses
    }
}
