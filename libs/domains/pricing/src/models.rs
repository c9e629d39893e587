use serde::{Deserialize, Serialize};

/// Selects the product a price belongs to.
///
/// Serialized in the pricing API's camelCase shape; unset fields are omitted so
/// two filters with the same content always encode the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_filters: Vec<AttributeFilter>,
}

/// Matches one product attribute by exact value or regex
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_regex: Option<String>,
}

impl AttributeFilter {
    pub fn exact(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            value_regex: None,
        }
    }

    pub fn regex(key: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            value_regex: Some(pattern.into()),
        }
    }
}

/// Selects one price of a product (purchase option, unit, term, usage tier)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_option: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        rename = "description_regex",
        skip_serializing_if = "Option::is_none"
    )]
    pub description_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_usage_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_usage_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_length: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_purchase_option: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_offering_class: Option<String>,
}

/// A single billable line of a resource (e.g. "Compute (pay as you go)")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostComponent {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    pub product_filter: ProductFilter,
    #[serde(default)]
    pub price_filter: Option<PriceFilter>,
}

/// A cost-bearing entity, possibly owning nested sub-resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub resource_type: String,
    #[serde(default)]
    pub cost_components: Vec<CostComponent>,
    #[serde(default)]
    pub sub_resources: Vec<Resource>,
}

impl Resource {
    /// All nested sub-resources in pre-order: each child, then its own children
    pub fn flattened_sub_resources(&self) -> Vec<&Resource> {
        let mut flattened = Vec::with_capacity(self.sub_resources.len());
        for sub_resource in &self.sub_resources {
            flattened.push(sub_resource);
            flattened.extend(sub_resource.flattened_sub_resources());
        }
        flattened
    }

    /// Number of cost components across this resource and all sub-resources
    pub fn cost_component_count(&self) -> usize {
        self.cost_components.len()
            + self
                .sub_resources
                .iter()
                .map(Resource::cost_component_count)
                .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> Resource {
        Resource {
            name: name.to_string(),
            resource_type: "azurerm_managed_disk".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_flattened_sub_resources_is_pre_order() {
        let mut child_a = leaf("a");
        child_a.sub_resources = vec![leaf("a.1"), leaf("a.2")];
        let root = Resource {
            name: "root".to_string(),
            resource_type: "azurerm_linux_virtual_machine".to_string(),
            sub_resources: vec![child_a, leaf("b")],
            ..Default::default()
        };

        let names: Vec<&str> = root
            .flattened_sub_resources()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "a.1", "a.2", "b"]);
    }

    #[test]
    fn test_product_filter_serializes_camel_case_without_empty_fields() {
        let filter = ProductFilter {
            vendor_name: Some("azure".into()),
            product_family: Some("Compute".into()),
            attribute_filters: vec![AttributeFilter::regex("skuName", "^D2 v2$")],
            ..Default::default()
        };

        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "vendorName": "azure",
                "productFamily": "Compute",
                "attributeFilters": [{ "key": "skuName", "value_regex": "^D2 v2$" }]
            })
        );
    }

    #[test]
    fn test_price_filter_keeps_description_regex_name() {
        let filter = PriceFilter {
            purchase_option: Some("Consumption".into()),
            description_regex: Some("/Hours/".into()),
            ..Default::default()
        };

        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["purchaseOption"], "Consumption");
        assert_eq!(json["description_regex"], "/Hours/");
    }

    #[test]
    fn test_resource_deserializes_with_defaults() {
        let resource: Resource = serde_json::from_value(serde_json::json!({
            "name": "azurerm_public_ip.main",
            "resource_type": "azurerm_public_ip",
            "cost_components": [{
                "name": "IP address (static, regional)",
                "product_filter": { "vendorName": "azure", "region": "westeurope" }
            }]
        }))
        .unwrap();

        assert_eq!(resource.cost_components.len(), 1);
        assert!(resource.cost_components[0].price_filter.is_none());
        assert!(resource.sub_resources.is_empty());
        assert_eq!(resource.cost_component_count(), 1);
    }
}
