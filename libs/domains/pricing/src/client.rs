use async_trait::async_trait;
use serde_json::Value;

use crate::error::PricingResult;
use crate::query::PriceQuery;

/// Remote pricing service, one round trip per call.
///
/// On success the returned payloads line up with `queries` by position. Any
/// failure fails the whole call; there are no partial results.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn send(&self, queries: &[PriceQuery]) -> PricingResult<Vec<Value>>;
}
