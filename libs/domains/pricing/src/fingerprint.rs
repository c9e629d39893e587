//! Content fingerprints for price queries.
//!
//! A fingerprint is the first eight bytes of a SHA-256 digest over a version
//! tag and the canonical JSON encoding of the value. Struct fields encode in
//! declaration order and unset filter fields are omitted, so equal content
//! always yields the same fingerprint, in every process.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::PricingResult;
use crate::query::PriceQuery;

/// Bumped whenever the canonical encoding changes, invalidating persisted keys
const FINGERPRINT_VERSION: &[u8] = b"price-query/v1";

/// Content identity of a price query, used for cache keys and deduplication
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Substituted when a query cannot be hashed
    pub const SENTINEL: Fingerprint = Fingerprint(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub fn is_sentinel(self) -> bool {
        self == Self::SENTINEL
    }

    /// Fingerprint any serializable value
    pub fn of<T: Serialize + ?Sized>(value: &T) -> PricingResult<Self> {
        let encoded = serde_json::to_vec(value)?;

        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_VERSION);
        hasher.update([0u8]);
        hasher.update(&encoded);
        let digest = hasher.finalize();

        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        Ok(Self(u64::from_be_bytes(prefix)))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Fingerprint a price query.
///
/// Returns the fingerprint and `true`, or the sentinel and `false` when the
/// query could not be encoded. Callers log the degradation and carry on.
pub fn fingerprint(query: &PriceQuery) -> (Fingerprint, bool) {
    match Fingerprint::of(query) {
        Ok(fingerprint) => (fingerprint, true),
        Err(_) => (Fingerprint::SENTINEL, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttributeFilter, PriceFilter, ProductFilter};
    use std::collections::HashMap;

    fn disk_filter(region: &str) -> ProductFilter {
        ProductFilter {
            vendor_name: Some("azure".into()),
            service: Some("Storage".into()),
            product_family: Some("Storage".into()),
            region: Some(region.into()),
            attribute_filters: vec![AttributeFilter::exact("skuName", "P10 LRS")],
            ..Default::default()
        }
    }

    #[test]
    fn test_equal_content_has_equal_fingerprint() {
        let a = PriceQuery::new(&disk_filter("westeurope"), None, "USD");
        let b = PriceQuery::new(&disk_filter("westeurope"), None, "USD");

        let (fa, ok_a) = fingerprint(&a);
        let (fb, ok_b) = fingerprint(&b);
        assert!(ok_a && ok_b);
        assert_eq!(fa, fb);
        assert!(!fa.is_sentinel());
    }

    #[test]
    fn test_fingerprint_is_sensitive_to_every_part_of_the_query() {
        let base = fingerprint(&PriceQuery::new(&disk_filter("westeurope"), None, "USD")).0;

        let other_region =
            fingerprint(&PriceQuery::new(&disk_filter("northeurope"), None, "USD")).0;
        let other_currency =
            fingerprint(&PriceQuery::new(&disk_filter("westeurope"), None, "EUR")).0;
        let price = PriceFilter {
            purchase_option: Some("Consumption".into()),
            ..Default::default()
        };
        let with_price =
            fingerprint(&PriceQuery::new(&disk_filter("westeurope"), Some(&price), "USD")).0;

        assert_ne!(base, other_region);
        assert_ne!(base, other_currency);
        assert_ne!(base, with_price);
    }

    #[test]
    fn test_fingerprint_is_stable_across_runs() {
        // Pinned: persisted cache entries depend on this value not drifting.
        // Changing the query document or filter encoding must bump
        // FINGERPRINT_VERSION.
        let product = ProductFilter {
            vendor_name: Some("aws".into()),
            service: Some("AmazonEC2".into()),
            sku: Some("DZH318Z0BQ4L".into()),
            ..Default::default()
        };
        let (fp, ok) = fingerprint(&PriceQuery::new(&product, None, "USD"));

        assert!(ok);
        assert_eq!(fp.to_string(), "d7033219000dd52b");
        assert_eq!(fp.value(), 15493282226041115947);
    }

    #[test]
    fn test_fingerprint_of_plain_value_is_stable() {
        let value = serde_json::json!({ "sku": "DZH318Z0BQ4L" });
        assert_eq!(Fingerprint::of(&value).unwrap().to_string(), "fc93e369c17a2b1e");
    }

    #[test]
    fn test_unencodable_value_is_an_error() {
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys cannot be JSON object keys");

        assert!(Fingerprint::of(&map).is_err());
    }

    #[test]
    fn test_sentinel() {
        assert!(Fingerprint::SENTINEL.is_sentinel());
        assert_eq!(Fingerprint::default(), Fingerprint::SENTINEL);
        assert_eq!(Fingerprint::new(255).to_string(), "00000000000000ff");
    }
}
