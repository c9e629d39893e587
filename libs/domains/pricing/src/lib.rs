//! Pricing Domain
//!
//! Resolves cloud resource cost components into prices with as few pricing
//! API round trips as possible: queries are batched, identical queries are
//! sent once and results are cached by content fingerprint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ PriceFetcher │  ← Whole resource tree, price extraction, missing prices
//! └──────┬───────┘
//!        │ batch_requests()
//! ┌──────▼────────┐     ┌──────────────────┐
//! │ QueryResolver │ ──▶ │ PriceCache       │  ← Fingerprint → payload
//! └──────┬────────┘     └──────────────────┘
//!        │ one call per batch
//! ┌──────▼───────┐
//! │ QueryClient  │  ← Trait + GraphQL implementation
//! └──────────────┘
//! ```

pub mod batch;
pub mod cache;
pub mod client;
pub mod error;
pub mod fetcher;
pub mod fingerprint;
pub mod graphql_client;
pub mod missing;
pub mod models;
pub mod query;
pub mod resolver;

// Re-export commonly used types
pub use batch::{batch_requests, BatchRequest, DEFAULT_BATCH_SIZE};
pub use cache::{
    BoundedPriceCache, CacheEntry, PersistedCacheEntry, PriceCache, DEFAULT_CACHE_CAPACITY,
};
pub use client::QueryClient;
pub use error::{PricingError, PricingResult};
pub use fetcher::{
    extract_price, ComponentPrice, PriceFetcher, PriceMatch, DEFAULT_CONCURRENCY,
};
pub use fingerprint::{fingerprint, Fingerprint};
pub use graphql_client::GraphQlPricingClient;
pub use missing::MissingPriceTracker;
pub use models::{AttributeFilter, CostComponent, PriceFilter, ProductFilter, Resource};
pub use query::{currency_or_default, OriginKey, PriceQuery, QueryResult, DEFAULT_CURRENCY};
pub use resolver::QueryResolver;
