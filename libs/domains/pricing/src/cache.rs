//! Bounded, fingerprint-keyed cache of pricing API results.
//!
//! Entries are evicted by capacity only. `captured_at` is recorded for
//! persistence and diagnostics but is never compared against the clock on
//! read: a cached price stays valid until capacity pressure evicts it.

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fingerprint::Fingerprint;

pub const DEFAULT_CACHE_CAPACITY: u64 = 1000;

/// A resolved pricing payload and the moment it was fetched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub result: Value,
    pub captured_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(result: Value) -> Self {
        Self {
            result,
            captured_at: Utc::now(),
        }
    }

    /// How long ago the entry was fetched
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.captured_at
    }
}

/// Flat record for persisting cache contents outside the process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedCacheEntry {
    pub fingerprint: Fingerprint,
    pub payload: Value,
    pub captured_at: DateTime<Utc>,
}

/// Shared price cache capability.
///
/// `get` and `put` are individually atomic and safe to call from any number
/// of concurrent resolutions.
#[cfg_attr(test, mockall::automock)]
pub trait PriceCache: Send + Sync {
    fn get(&self, fingerprint: Fingerprint) -> Option<CacheEntry>;

    fn put(&self, fingerprint: Fingerprint, entry: CacheEntry);

    /// Approximate number of entries held
    fn entry_count(&self) -> u64;
}

/// In-memory cache with a fixed entry capacity.
///
/// Backed by moka: new keys must win a frequency-based admission check
/// against the eviction victim, so keys read repeatedly outlive keys seen
/// once.
#[derive(Clone)]
pub struct BoundedPriceCache {
    inner: Cache<Fingerprint, CacheEntry>,
    capacity: u64,
}

impl BoundedPriceCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::builder().max_capacity(capacity).build(),
            capacity,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Apply pending eviction and admission bookkeeping now
    pub fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks();
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Export all entries
    pub fn snapshot(&self) -> Vec<PersistedCacheEntry> {
        self.inner
            .iter()
            .map(|(fingerprint, entry)| PersistedCacheEntry {
                fingerprint: *fingerprint,
                payload: entry.result,
                captured_at: entry.captured_at,
            })
            .collect()
    }

    /// Re-import persisted entries, keeping their capture times.
    /// Sentinel fingerprints are skipped. Returns the number imported.
    pub fn restore(&self, entries: impl IntoIterator<Item = PersistedCacheEntry>) -> usize {
        let mut restored = 0;
        for entry in entries {
            if entry.fingerprint.is_sentinel() {
                continue;
            }
            self.inner.insert(
                entry.fingerprint,
                CacheEntry {
                    result: entry.payload,
                    captured_at: entry.captured_at,
                },
            );
            restored += 1;
        }
        restored
    }
}

impl Default for BoundedPriceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl PriceCache for BoundedPriceCache {
    fn get(&self, fingerprint: Fingerprint) -> Option<CacheEntry> {
        self.inner.get(&fingerprint)
    }

    fn put(&self, fingerprint: Fingerprint, entry: CacheEntry) {
        self.inner.insert(fingerprint, entry);
    }

    fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
