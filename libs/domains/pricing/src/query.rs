//! Price queries and the keys tying them back to cost components.

use serde::Serialize;
use serde_json::Value;

use crate::models::{CostComponent, PriceFilter, ProductFilter, Resource};

pub const DEFAULT_CURRENCY: &str = "USD";

/// Returns `currency`, or the default currency when it is blank
pub fn currency_or_default(currency: &str) -> &str {
    let trimmed = currency.trim();
    if trimmed.is_empty() {
        DEFAULT_CURRENCY
    } else {
        trimmed
    }
}

/// GraphQL variables of a price query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryVariables {
    pub product_filter: ProductFilter,
    pub price_filter: Option<PriceFilter>,
}

/// A single GraphQL price lookup, sent to the pricing API as-is
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PriceQuery {
    pub query: String,
    pub variables: QueryVariables,
}

impl PriceQuery {
    /// Build the query selecting the price hash, the price in `currency` and
    /// the term length of every price matching the filters.
    pub fn new(product: &ProductFilter, price: Option<&PriceFilter>, currency: &str) -> Self {
        let currency = currency_or_default(currency);

        let query = format!(
            r#"
		query($productFilter: ProductFilter!, $priceFilter: PriceFilter) {{
			products(filter: $productFilter) {{
				prices(filter: $priceFilter) {{
					priceHash
					{}
					termLength
				}}
			}}
		}}
	"#,
            currency
        );

        Self {
            query,
            variables: QueryVariables {
                product_filter: product.clone(),
                price_filter: price.cloned(),
            },
        }
    }

    /// Build the query for a cost component's filters
    pub fn for_component(component: &CostComponent, currency: &str) -> Self {
        Self::new(
            &component.product_filter,
            component.price_filter.as_ref(),
            currency,
        )
    }
}

/// Ties a query back to the resource and cost component it was built for
#[derive(Debug, Clone, Copy)]
pub struct OriginKey<'a> {
    pub resource: &'a Resource,
    pub component: &'a CostComponent,
}

impl<'a> OriginKey<'a> {
    pub fn new(resource: &'a Resource, component: &'a CostComponent) -> Self {
        Self {
            resource,
            component,
        }
    }

    /// True when both keys point at the same resource and component instances
    pub fn same_origin(&self, other: &OriginKey<'_>) -> bool {
        std::ptr::eq(self.resource, other.resource) && std::ptr::eq(self.component, other.component)
    }
}

/// Resolved payload for one (origin key, query) pair of a batch
#[derive(Debug, Clone)]
pub struct QueryResult<'a> {
    pub key: OriginKey<'a>,
    pub query: PriceQuery,
    pub result: Value,
    filled: bool,
}

impl<'a> QueryResult<'a> {
    pub(crate) fn pending(key: OriginKey<'a>, query: PriceQuery) -> Self {
        Self {
            key,
            query,
            result: Value::Null,
            filled: false,
        }
    }

    pub(crate) fn fill(&mut self, result: Value) {
        self.result = result;
        self.filled = true;
    }

    /// Whether the slot holds a resolved payload. Always true once returned
    /// from the resolver.
    pub fn is_filled(&self) -> bool {
        self.filled
    }

    /// True when the pricing API had nothing for this query (short response)
    pub fn is_empty(&self) -> bool {
        self.result.is_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm_filter() -> ProductFilter {
        ProductFilter {
            vendor_name: Some("azure".into()),
            service: Some("Virtual Machines".into()),
            region: Some("westeurope".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_currency_defaults_to_usd() {
        assert_eq!(currency_or_default(""), "USD");
        assert_eq!(currency_or_default("  "), "USD");
        assert_eq!(currency_or_default("EUR"), "EUR");
    }

    #[test]
    fn test_query_selects_requested_currency() {
        let query = PriceQuery::new(&vm_filter(), None, "EUR");
        assert!(query.query.contains("priceHash"));
        assert!(query.query.contains("EUR"));
        assert!(query.query.contains("termLength"));
        assert!(!query.query.contains("USD"));

        let default = PriceQuery::new(&vm_filter(), None, "");
        assert!(default.query.contains("USD"));
    }

    #[test]
    fn test_query_serializes_null_price_filter() {
        let query = PriceQuery::new(&vm_filter(), None, "USD");
        let json = serde_json::to_value(&query).unwrap();

        assert_eq!(json["variables"]["productFilter"]["vendorName"], "azure");
        assert!(json["variables"]["priceFilter"].is_null());
        assert!(json["query"].as_str().unwrap().contains("products(filter: $productFilter)"));
    }

    #[test]
    fn test_equal_content_builds_equal_queries() {
        let price = PriceFilter {
            purchase_option: Some("Consumption".into()),
            ..Default::default()
        };
        let a = PriceQuery::new(&vm_filter(), Some(&price), "USD");
        let b = PriceQuery::new(&vm_filter().clone(), Some(&price.clone()), "USD");
        assert_eq!(a, b);
    }

    #[test]
    fn test_origin_key_identity() {
        let resource = Resource {
            name: "vm".into(),
            cost_components: vec![CostComponent::default(), CostComponent::default()],
            ..Default::default()
        };
        let first = OriginKey::new(&resource, &resource.cost_components[0]);
        let second = OriginKey::new(&resource, &resource.cost_components[1]);

        assert!(first.same_origin(&first));
        assert!(!first.same_origin(&second));
    }
}
