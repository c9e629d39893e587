use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use crate::query::OriginKey;

#[derive(Debug, Default)]
struct MissingPrices {
    /// `<resource_type>.<component slug>` → occurrences
    components: HashMap<String, usize>,
    /// resource type → names of resources with a missing price
    resources: BTreeMap<String, BTreeSet<String>>,
}

/// Collects the cost components whose price could not be found.
///
/// Safe to share between concurrently resolving batches.
#[derive(Debug, Default)]
pub struct MissingPriceTracker {
    inner: RwLock<MissingPrices>,
}

impl MissingPriceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, key: &OriginKey<'_>) {
        let component_key = format!(
            "{}.{}",
            key.resource.resource_type,
            component_slug(&key.component.name)
        );

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *inner.components.entry(component_key).or_default() += 1;
        inner
            .resources
            .entry(key.resource.resource_type.clone())
            .or_default()
            .insert(key.resource.name.clone());
    }

    /// Every missing component key, once per occurrence, sorted
    pub fn missing_components(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);

        let mut keys: Vec<String> = inner
            .components
            .iter()
            .flat_map(|(key, &count)| std::iter::repeat(key.clone()).take(count))
            .collect();
        keys.sort();
        keys
    }

    /// Number of distinct resources with a missing price, per resource type
    pub fn missing_resources(&self) -> BTreeMap<String, usize> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .resources
            .iter()
            .map(|(resource_type, names)| (resource_type.clone(), names.len()))
            .collect()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.components.clear();
        inner.resources.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .components
            .is_empty()
    }
}

/// "Compute (on-demand, foo)" → "compute", "Data Storage" → "data_storage"
fn component_slug(name: &str) -> String {
    let base = match name.find('(') {
        Some(open) => &name[..open],
        None => name,
    };
    base.trim().to_lowercase().replace(' ', "_")
}
