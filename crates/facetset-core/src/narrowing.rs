//! Narrowing engine
//!
//! Resolves the active selections to the set of matched documents and
//! restricts every requested facet to that set:
//!
//! - a selection matches the union of its values' documents (OR within a facet)
//! - the selection set matches the intersection over all selections (AND across)
//! - no selections match the whole dataset
//! - `for_ids` further intersects the matched set
//!
//! When nothing narrows (no selections, no `for_ids`) facets are returned
//! as built. Otherwise each value keeps only matched documents and values left
//! empty are dropped; a facet left with no values is still reported.

use crate::cache::MatchCache;
use crate::dataset::KeyedDataset;
use crate::error::{FacetError, Result};
use crate::index::FacetIndex;
use crate::ordered::OrderedMap;
use crate::registry::FacetRegistry;
use crate::selection::{Selection, SelectionSet};
use facetset_types::FacetValue;
use roaring::RoaringBitmap;
use std::sync::Arc;
use tracing::{instrument, trace, warn};

/// Optional restrictions applied on top of the active selections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrowingQuery {
    for_ids: Option<Vec<FacetValue>>,
    for_fields: Option<Vec<String>>,
}

impl NarrowingQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only count documents with these ids
    pub fn for_ids<I, V>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FacetValue>,
    {
        self.for_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Only report these facets, in this order
    pub fn for_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.for_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn ids(&self) -> Option<&[FacetValue]> {
        self.for_ids.as_deref()
    }

    pub fn fields(&self) -> Option<&[String]> {
        self.for_fields.as_deref()
    }
}

/// Facet value → positions, restricted to matched documents
pub type NarrowedFacet = OrderedMap<FacetValue, RoaringBitmap>;

/// Borrowed view over one facet set snapshot
pub(crate) struct NarrowingEngine<'a, D> {
    pub(crate) dataset: &'a KeyedDataset<D>,
    pub(crate) registry: &'a FacetRegistry,
    pub(crate) selections: &'a SelectionSet,
    pub(crate) cache: &'a MatchCache,
}

impl<D> NarrowingEngine<'_, D> {
    /// Positions matched by one selection against the unfiltered registry
    pub(crate) fn selection_positions(&self, selection: &Selection) -> Arc<RoaringBitmap> {
        self.cache.get_or_compute(selection, || match self.registry.get(selection.facet()) {
            Some(facet) => facet.matching(selection.values()),
            None => RoaringBitmap::new(),
        })
    }

    /// Intersection over every active selection, or the whole dataset
    pub(crate) fn selected_positions(&self) -> RoaringBitmap {
        let mut selections = self.selections.iter();
        let Some(first) = selections.next() else {
            return self.dataset.all_positions().clone();
        };

        let mut matched = (*self.selection_positions(first)).clone();
        for selection in selections {
            if matched.is_empty() {
                trace!("Selection intersection exhausted");
                break;
            }
            matched &= &*self.selection_positions(selection);
        }
        matched
    }

    /// Matched positions, or `None` when nothing narrows the dataset
    pub(crate) fn narrowing_positions(&self, query: &NarrowingQuery) -> Option<RoaringBitmap> {
        let selected = (!self.selections.is_empty()).then(|| self.selected_positions());

        match (selected, query.ids()) {
            (None, None) => None,
            (Some(selected), None) => Some(selected),
            (None, Some(ids)) => Some(self.dataset.positions_of(ids)),
            (Some(selected), Some(ids)) => Some(selected & self.dataset.positions_of(ids)),
        }
    }

    /// Requested facets in output order; repeated names are reported once
    pub(crate) fn requested_facets(&self, query: &NarrowingQuery) -> Result<Vec<&Arc<FacetIndex>>> {
        let Some(fields) = query.fields() else {
            return Ok(self.registry.iter().map(|(_, facet)| facet).collect());
        };

        let mut requested: Vec<&Arc<FacetIndex>> = Vec::with_capacity(fields.len());
        for name in fields {
            let facet = self.registry.get(name).ok_or_else(|| {
                warn!(facet = %name, "Narrowing requested an unknown facet");
                FacetError::unknown_facet(name.as_str())
            })?;
            if !requested.iter().any(|f| Arc::ptr_eq(f, facet)) {
                requested.push(facet);
            }
        }
        Ok(requested)
    }

    #[instrument(skip_all, fields(selections = self.selections.len()))]
    pub(crate) fn narrowed_facets(
        &self,
        query: &NarrowingQuery,
    ) -> Result<OrderedMap<String, NarrowedFacet>> {
        let facets = self.requested_facets(query)?;
        let matched = self.narrowing_positions(query);

        trace!(
            facets = facets.len(),
            matched = matched.as_ref().map(RoaringBitmap::len),
            "Narrowing facets"
        );

        Ok(facets
            .into_iter()
            .map(|facet| (facet.name().to_string(), narrow_facet(facet, matched.as_ref())))
            .collect())
    }
}

/// Restrict `facet` to `matched`, dropping values with no documents left
pub fn narrow_facet(facet: &FacetIndex, matched: Option<&RoaringBitmap>) -> NarrowedFacet {
    match matched {
        None => facet.iter().map(|(value, positions)| (value.clone(), positions.clone())).collect(),
        Some(matched) => facet
            .iter()
            .filter_map(|(value, positions)| {
                let narrowed = positions & matched;
                (!narrowed.is_empty()).then(|| (value.clone(), narrowed))
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FacetOptions, MissingValues};
    use crate::path::FieldPath;
    use serde_json::{Value, json};

    struct Fixture {
        dataset: KeyedDataset<Value>,
        registry: FacetRegistry,
        cache: MatchCache,
    }

    impl Fixture {
        fn new() -> Self {
            let dataset = KeyedDataset::new(
                vec![
                    json!({"id": 1, "type": "a", "tags": ["x", "y"]}),
                    json!({"id": 2, "type": "b", "tags": ["y", "z"]}),
                    json!({"id": 3, "type": "b", "tags": []}),
                ],
                "id".into(),
            )
            .unwrap();
            let type_facet = FacetIndex::build(
                "type",
                &dataset,
                &FieldPath::parse("type"),
                FacetOptions::default(),
                MissingValues::Skip,
            )
            .unwrap();
            let tags_facet = FacetIndex::build(
                "tags",
                &dataset,
                &FieldPath::parse("tags"),
                FacetOptions::multi_value(),
                MissingValues::Skip,
            )
            .unwrap();
            let registry = FacetRegistry::new().with_facet(type_facet).with_facet(tags_facet);
            Self { dataset, registry, cache: MatchCache::new(16) }
        }

        fn engine<'a>(&'a self, selections: &'a SelectionSet) -> NarrowingEngine<'a, Value> {
            NarrowingEngine {
                dataset: &self.dataset,
                registry: &self.registry,
                selections,
                cache: &self.cache,
            }
        }
    }

    fn members(bitmap: &RoaringBitmap) -> Vec<u32> {
        bitmap.iter().collect()
    }

    #[test]
    fn test_no_selections_match_everything() {
        let fixture = Fixture::new();
        let selections = SelectionSet::new();
        let engine = fixture.engine(&selections);
        assert_eq!(members(&engine.selected_positions()), vec![0, 1, 2]);
        assert!(engine.narrowing_positions(&NarrowingQuery::new()).is_none());
    }

    #[test]
    fn test_or_within_and_across() {
        let fixture = Fixture::new();
        let selections = SelectionSet::new()
            .with(Selection::new("tags", ["x", "z"]))
            .with(Selection::new("type", ["b"]));
        let engine = fixture.engine(&selections);
        assert_eq!(members(&engine.selected_positions()), vec![1]);
    }

    #[test]
    fn test_unknown_values_match_nothing() {
        let fixture = Fixture::new();
        let selections = SelectionSet::new().with(Selection::new("tags", ["nope"]));
        let engine = fixture.engine(&selections);
        assert!(engine.selected_positions().is_empty());

        let narrowed = engine.narrowed_facets(&NarrowingQuery::new()).unwrap();
        assert_eq!(narrowed.len(), 2);
        assert!(narrowed.get("type").unwrap().is_empty());
        assert!(narrowed.get("tags").unwrap().is_empty());
    }

    #[test]
    fn test_for_ids_without_selections() {
        let fixture = Fixture::new();
        let selections = SelectionSet::new();
        let engine = fixture.engine(&selections);
        let query = NarrowingQuery::new().for_ids([3, 42]);

        let narrowed = engine.narrowed_facets(&query).unwrap();
        let type_facet = narrowed.get("type").unwrap();
        assert_eq!(type_facet.len(), 1);
        assert_eq!(members(type_facet.get(&FacetValue::from("b")).unwrap()), vec![2]);
        assert!(narrowed.get("tags").unwrap().is_empty());
    }

    #[test]
    fn test_for_ids_intersects_selections() {
        let fixture = Fixture::new();
        let selections = SelectionSet::new().with(Selection::new("type", ["b"]));
        let engine = fixture.engine(&selections);
        let matched = engine.narrowing_positions(&NarrowingQuery::new().for_ids([1, 2])).unwrap();
        assert_eq!(members(&matched), vec![1]);
    }

    #[test]
    fn test_for_fields_orders_and_validates() {
        let fixture = Fixture::new();
        let selections = SelectionSet::new();
        let engine = fixture.engine(&selections);

        let narrowed =
            engine.narrowed_facets(&NarrowingQuery::new().for_fields(["tags", "type", "tags"])).unwrap();
        assert_eq!(narrowed.keys().cloned().collect::<Vec<_>>(), vec!["tags", "type"]);

        let err = engine.narrowed_facets(&NarrowingQuery::new().for_fields(["colour"])).unwrap_err();
        assert_eq!(err.category(), "unknown_facet");
    }

    #[test]
    fn test_selection_results_are_cached() {
        let fixture = Fixture::new();
        let selections = SelectionSet::new().with(Selection::new("tags", ["y"]));
        let engine = fixture.engine(&selections);
        engine.selected_positions();
        engine.selected_positions();
        let stats = fixture.cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn test_narrow_facet_drops_empty_values() {
        let fixture = Fixture::new();
        let tags = fixture.registry.get("tags").unwrap();
        let matched: RoaringBitmap = [1u32].into_iter().collect();
        let narrowed = narrow_facet(tags, Some(&matched));
        assert_eq!(narrowed.keys().cloned().collect::<Vec<_>>(), vec![FacetValue::from("y"), FacetValue::from("z")]);
        assert_eq!(narrow_facet(tags, None).len(), 3);
    }
}
