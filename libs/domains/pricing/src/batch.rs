//! Splits a resource tree into fixed-size batches of price queries.

use crate::error::{PricingError, PricingResult};
use crate::models::Resource;
use crate::query::{OriginKey, PriceQuery};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Ordered (origin key, query) pairs resolved together in one engine call
#[derive(Debug, Clone, Default)]
pub struct BatchRequest<'a> {
    keys: Vec<OriginKey<'a>>,
    queries: Vec<PriceQuery>,
}

impl<'a> BatchRequest<'a> {
    /// Pair up keys and queries by position. Both must have the same length.
    pub fn new(keys: Vec<OriginKey<'a>>, queries: Vec<PriceQuery>) -> PricingResult<Self> {
        if keys.len() != queries.len() {
            return Err(PricingError::InvalidInput(format!(
                "batch has {} keys but {} queries",
                keys.len(),
                queries.len()
            )));
        }
        Ok(Self { keys, queries })
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            queries: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, key: OriginKey<'a>, query: PriceQuery) {
        self.keys.push(key);
        self.queries.push(query);
    }

    pub fn keys(&self) -> &[OriginKey<'a>] {
        &self.keys
    }

    pub fn queries(&self) -> &[PriceQuery] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn into_parts(self) -> (Vec<OriginKey<'a>>, Vec<PriceQuery>) {
        (self.keys, self.queries)
    }
}

/// Build batches of at most `batch_size` queries over every cost component in
/// `resources`.
///
/// Each resource contributes its own components first, then the components of
/// its sub-resources in pre-order. Batches are contiguous; only the last may be
/// short. A batch size of zero is treated as one.
pub fn batch_requests<'a>(
    resources: &'a [Resource],
    batch_size: usize,
    currency: &str,
) -> Vec<BatchRequest<'a>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::new();
    let mut current = BatchRequest::with_capacity(batch_size);

    for resource in resources {
        let owners = std::iter::once(resource).chain(resource.flattened_sub_resources());
        for owner in owners {
            for component in &owner.cost_components {
                current.push(
                    OriginKey::new(owner, component),
                    PriceQuery::for_component(component, currency),
                );

                if current.len() == batch_size {
                    batches.push(std::mem::replace(
                        &mut current,
                        BatchRequest::with_capacity(batch_size),
                    ));
                }
            }
        }
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CostComponent, ProductFilter};

    fn component(name: &str) -> CostComponent {
        CostComponent {
            name: name.to_string(),
            unit: "hours".to_string(),
            product_filter: ProductFilter {
                vendor_name: Some("aws".into()),
                sku: Some(name.to_string()),
                ..Default::default()
            },
            price_filter: None,
        }
    }

    fn resource(name: &str, components: &[&str]) -> Resource {
        Resource {
            name: name.to_string(),
            resource_type: "aws_instance".to_string(),
            cost_components: components.iter().map(|c| component(c)).collect(),
            sub_resources: Vec::new(),
        }
    }

    fn component_names(batch: &BatchRequest<'_>) -> Vec<String> {
        batch
            .keys()
            .iter()
            .map(|k| format!("{}/{}", k.resource.name, k.component.name))
            .collect()
    }

    #[test]
    fn test_batches_are_contiguous_with_short_tail() {
        let resources = vec![
            resource("web", &["c1", "c2", "c3"]),
            resource("db", &["c4", "c5"]),
        ];

        let batches = batch_requests(&resources, 2, "USD");

        let sizes: Vec<usize> = batches.iter().map(BatchRequest::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(component_names(&batches[0]), vec!["web/c1", "web/c2"]);
        assert_eq!(component_names(&batches[1]), vec!["web/c3", "db/c4"]);
        assert_eq!(component_names(&batches[2]), vec!["db/c5"]);

        for batch in &batches {
            assert_eq!(batch.keys().len(), batch.queries().len());
            for (key, query) in batch.keys().iter().zip(batch.queries()) {
                assert_eq!(query, &PriceQuery::for_component(key.component, "USD"));
            }
        }
    }

    #[test]
    fn test_nested_sub_resources_follow_their_parent() {
        let mut volume = resource("root_block_device", &["storage"]);
        volume.sub_resources = vec![resource("snapshot", &["snapshot_storage"])];
        let mut instance = resource("web", &["compute", "cpu_credits"]);
        instance.sub_resources = vec![volume, resource("ebs_block_device", &["iops"])];
        let resources = vec![instance, resource("eip", &["address"])];

        let batches = batch_requests(&resources, 100, "USD");

        assert_eq!(batches.len(), 1);
        assert_eq!(
            component_names(&batches[0]),
            vec![
                "web/compute",
                "web/cpu_credits",
                "root_block_device/storage",
                "snapshot/snapshot_storage",
                "ebs_block_device/iops",
                "eip/address",
            ]
        );
    }

    #[test]
    fn test_origin_keys_point_into_the_input_tree() {
        let mut parent = resource("web", &["compute"]);
        parent.sub_resources = vec![resource("disk", &["storage"])];
        let resources = vec![parent];

        let batches = batch_requests(&resources, 10, "USD");
        let keys = batches[0].keys();

        assert!(std::ptr::eq(keys[0].resource, &resources[0]));
        assert!(std::ptr::eq(keys[1].resource, &resources[0].sub_resources[0]));
        assert!(std::ptr::eq(
            keys[1].component,
            &resources[0].sub_resources[0].cost_components[0]
        ));
    }

    #[test]
    fn test_empty_input_builds_no_batches() {
        assert!(batch_requests(&[], 10, "USD").is_empty());

        let no_components = vec![resource("bare", &[])];
        assert!(batch_requests(&no_components, 10, "USD").is_empty());
    }

    #[test]
    fn test_zero_batch_size_is_clamped_to_one() {
        let resources = vec![resource("web", &["c1", "c2"])];
        let batches = batch_requests(&resources, 0, "USD");

        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 1));
    }

    #[test]
    fn test_currency_flows_into_queries() {
        let resources = vec![resource("web", &["c1"])];
        let batches = batch_requests(&resources, 10, "EUR");

        assert!(batches[0].queries()[0].query.contains("EUR"));
    }

    #[test]
    fn test_new_rejects_mismatched_lengths() {
        let resources = vec![resource("web", &["c1"])];
        let key = OriginKey::new(&resources[0], &resources[0].cost_components[0]);

        let err = BatchRequest::new(vec![key], Vec::new()).unwrap_err();
        assert!(matches!(err, PricingError::InvalidInput(_)));

        let query = PriceQuery::for_component(key.component, "USD");
        let batch = BatchRequest::new(vec![key], vec![query]).unwrap();
        let (keys, queries) = batch.into_parts();
        assert_eq!((keys.len(), queries.len()), (1, 1));
    }
}
