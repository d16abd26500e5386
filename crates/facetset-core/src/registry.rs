//! Ordered, persistent collection of built facets
//!
//! Every mutator returns a new registry. Facets are held behind `Arc`, so a
//! new registry copies only the name table and shares every untouched facet
//! with its parent.

use crate::index::FacetIndex;
use crate::ordered::OrderedMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct FacetRegistry {
    facets: Arc<OrderedMap<String, Arc<FacetIndex>>>,
}

impl FacetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// New registry with `facet` bound to its name, overwriting in place
    pub fn with_facet(&self, facet: FacetIndex) -> Self {
        let mut facets = (*self.facets).clone();
        facets.insert(facet.name().to_string(), Arc::new(facet));
        Self { facets: Arc::new(facets) }
    }

    /// New registry without `name`; unchanged if `name` is absent
    pub fn without_facet(&self, name: &str) -> Self {
        if !self.facets.contains_key(name) {
            return self.clone();
        }
        let mut facets = (*self.facets).clone();
        facets.remove(name);
        Self { facets: Arc::new(facets) }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<FacetIndex>> {
        self.facets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.facets.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.facets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<FacetIndex>)> {
        self.facets.iter().map(|(name, facet)| (name.as_str(), facet))
    }

    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// Whether both registries are the same snapshot, not merely equal
    pub fn same_snapshot(&self, other: &FacetRegistry) -> bool {
        Arc::ptr_eq(&self.facets, &other.facets)
    }
}

/// Same names in the same order, with structurally equal facets
impl PartialEq for FacetRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.same_snapshot(other) || self.facets == other.facets
    }
}
