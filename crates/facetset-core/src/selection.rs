//! Selections and the persistent selection set
//!
//! A [`Selection`] is a value: two selections with the same facet name and the
//! same accepted values are the same selection, whatever order the values were
//! given in. That equality drives deduplication in [`SelectionSet`] and keys
//! the matched-id cache.

use crate::ordered::OrderedMap;
use facetset_types::FacetValue;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A facet narrowed to a set of accepted values
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selection {
    facet: String,
    values: BTreeSet<FacetValue>,
}

impl Selection {
    pub fn new<I, V>(facet: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FacetValue>,
    {
        Self { facet: facet.into(), values: values.into_iter().map(Into::into).collect() }
    }

    pub fn facet(&self) -> &str {
        &self.facet
    }

    pub fn values(&self) -> &BTreeSet<FacetValue> {
        &self.values
    }
}

/// Insertion-ordered, duplicate-free set of selections.
///
/// Cheap to clone; every mutator returns a new set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    selections: Arc<Vec<Selection>>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `selection`; a selection already present leaves the set unchanged
    pub fn with(&self, selection: Selection) -> Self {
        if self.contains(&selection) {
            return self.clone();
        }
        let mut selections = (*self.selections).clone();
        selections.push(selection);
        Self { selections: Arc::new(selections) }
    }

    /// Remove the selection equal to `selection`, if present
    pub fn without(&self, selection: &Selection) -> Self {
        self.filtered(|s| s != selection)
    }

    /// Remove every selection on `facet`
    pub fn without_facet(&self, facet: &str) -> Self {
        self.filtered(|s| s.facet != facet)
    }

    pub fn cleared(&self) -> Self {
        Self::default()
    }

    fn filtered(&self, keep: impl Fn(&Selection) -> bool) -> Self {
        if self.selections.iter().all(&keep) {
            return self.clone();
        }
        let selections: Vec<Selection> = self.selections.iter().filter(|s| keep(*s)).cloned().collect();
        Self { selections: Arc::new(selections) }
    }

    pub fn contains(&self, selection: &Selection) -> bool {
        self.selections.contains(selection)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selection> {
        self.selections.iter()
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Facet name → union of the values selected on it, in first-selection order
    pub fn values_by_facet(&self) -> OrderedMap<String, BTreeSet<FacetValue>> {
        let mut selected: OrderedMap<String, BTreeSet<FacetValue>> = OrderedMap::new();
        for selection in self.selections.iter() {
            selected
                .get_or_insert_with(selection.facet.clone(), BTreeSet::new)
                .extend(selection.values.iter().cloned());
        }
        selected
    }
}
