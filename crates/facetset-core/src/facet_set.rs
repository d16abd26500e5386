//! The persistent faceted-navigation value
//!
//! A [`FacetSet`] pairs a keyed dataset with a facet registry, a selection set
//! and the matched-id cache of that registry. Every operation returns a new
//! `FacetSet`; the receiver is never modified, so older snapshots stay valid
//! and can be shared freely across threads.

use crate::cache::{CacheStats, MatchCache};
use crate::config::FacetSetConfig;
use crate::dataset::{IdSet, KeyedDataset};
use crate::error::{FacetError, Result};
use crate::index::{FacetIndex, FacetOptions};
use crate::narrowing::{NarrowingEngine, NarrowingQuery};
use crate::ordered::OrderedMap;
use crate::path::{Classifier, Document, FieldPath};
use crate::registry::FacetRegistry;
use crate::selection::{Selection, SelectionSet};
use facetset_types::FacetValue;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Facet value → ids of the documents under it
pub type FacetIds = OrderedMap<FacetValue, IdSet>;

/// Facet name → narrowed facet
pub type NarrowedFacets = OrderedMap<String, FacetIds>;

pub struct FacetSet<D> {
    dataset: Arc<KeyedDataset<D>>,
    registry: FacetRegistry,
    selections: SelectionSet,
    cache: Arc<MatchCache>,
    config: Arc<FacetSetConfig>,
}

impl<D> Clone for FacetSet<D> {
    fn clone(&self) -> Self {
        Self {
            dataset: Arc::clone(&self.dataset),
            registry: self.registry.clone(),
            selections: self.selections.clone(),
            cache: Arc::clone(&self.cache),
            config: Arc::clone(&self.config),
        }
    }
}

impl<D: Document + fmt::Debug> FacetSet<D> {
    /// Index `documents` by their `"id"` field
    pub fn new(documents: Vec<D>) -> Result<Self> {
        Self::with_config(documents, FacetSetConfig::default())
    }

    /// Index `documents` by the field at `id_field`
    pub fn with_id_field(documents: Vec<D>, id_field: impl Into<String>) -> Result<Self> {
        Self::with_config(documents, FacetSetConfig::default().with_id_field(id_field))
    }

    pub fn with_config(documents: Vec<D>, config: FacetSetConfig) -> Result<Self> {
        config.validate()?;
        let dataset = KeyedDataset::new(documents, FieldPath::parse(&config.id_field))?;
        Ok(Self {
            dataset: Arc::new(dataset),
            registry: FacetRegistry::new(),
            selections: SelectionSet::new(),
            cache: Arc::new(MatchCache::new(config.cache_capacity)),
            config: Arc::new(config),
        })
    }

    /// Facet on the field at `path`, named after the joined path
    pub fn add_field_facet(&self, path: impl Into<FieldPath>, options: FacetOptions) -> Result<Self> {
        let path = path.into();
        let name = path.to_string();
        self.add_facet(&name, &path, options)
    }

    /// Facet on the field at `path` under an explicit name
    pub fn add_named_field_facet(
        &self,
        name: &str,
        path: impl Into<FieldPath>,
        options: FacetOptions,
    ) -> Result<Self> {
        self.add_facet(name, &path.into(), options)
    }
}

impl<D> FacetSet<D> {
    /// Build a facet from `classifier` and bind it to `name`, replacing any
    /// facet of the same name. Selections are kept; the matched-id cache is not.
    #[instrument(skip_all, fields(facet = %name))]
    pub fn add_facet<C>(&self, name: &str, classifier: &C, options: FacetOptions) -> Result<Self>
    where
        C: Classifier<D> + ?Sized,
    {
        let facet =
            FacetIndex::build(name, &self.dataset, classifier, options, self.config.missing_values)?;
        let registry = self.registry.with_facet(facet);
        debug!(facets = registry.len(), "Facet added");
        Ok(self.with_registry(registry, self.selections.clone()))
    }

    /// Drop the facet `name` and every selection on it. Absent names are a no-op.
    pub fn remove_facet(&self, name: &str) -> Self {
        if !self.registry.contains(name) {
            return self.clone();
        }
        let registry = self.registry.without_facet(name);
        let selections = self.selections.without_facet(name);
        debug!(facet = %name, facets = registry.len(), "Facet removed");
        self.with_registry(registry, selections)
    }

    /// Narrow `name` to `values`. Fails with `UnknownFacet` if `name` is not registered.
    pub fn add_selection<I, V>(&self, name: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<FacetValue>,
    {
        if !self.registry.contains(name) {
            warn!(facet = %name, "Selection on unknown facet");
            return Err(FacetError::unknown_facet(name));
        }
        let selections = self.selections.with(Selection::new(name, values));
        debug!(selections = selections.len(), "Selection added");
        Ok(self.with_selections(selections))
    }

    /// Remove the selection equal to (`name`, `values`); anything else is a no-op
    pub fn remove_selection<I, V>(&self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FacetValue>,
    {
        let selections = self.selections.without(&Selection::new(name, values));
        self.with_selections(selections)
    }

    /// Drop all selections on `name`, or every selection when `name` is `None`
    pub fn reset_selections(&self, name: Option<&str>) -> Self {
        let selections = match name {
            Some(name) => self.selections.without_facet(name),
            None => self.selections.cleared(),
        };
        self.with_selections(selections)
    }

    /// Every requested facet restricted to the matched documents
    pub fn facets_after_selections(&self, query: &NarrowingQuery) -> Result<NarrowedFacets> {
        let narrowed = self.engine().narrowed_facets(query)?;
        Ok(narrowed.map_values(|_, facet| facet.map_values(|_, positions| self.dataset.id_set(positions.clone()))))
    }

    /// Distinct values left in every requested facet, in facet order
    pub fn facet_values_after_selections(
        &self,
        query: &NarrowingQuery,
    ) -> Result<OrderedMap<String, Vec<FacetValue>>> {
        let narrowed = self.engine().narrowed_facets(query)?;
        Ok(narrowed.map_values(|_, facet| facet.keys().cloned().collect()))
    }

    /// Matched document count per remaining value
    pub fn facet_counts_after_selections(
        &self,
        query: &NarrowingQuery,
    ) -> Result<OrderedMap<String, OrderedMap<FacetValue, u64>>> {
        let narrowed = self.engine().narrowed_facets(query)?;
        Ok(narrowed.map_values(|_, facet| facet.map_values(|_, positions| positions.len())))
    }

    /// Ids matched by the active selections; every id when there are none
    pub fn selected_ids(&self) -> IdSet {
        self.dataset.id_set(self.engine().selected_positions())
    }

    /// Documents matched by the active selections, in dataset order
    pub fn selected_items(&self) -> Vec<&D> {
        let positions = self.engine().selected_positions();
        positions.iter().filter_map(|p| self.dataset.at(p)).collect()
    }

    /// Facet name → union of values selected on it
    pub fn selected_values(&self) -> OrderedMap<String, BTreeSet<FacetValue>> {
        self.selections.values_by_facet()
    }

    /// Documents in `ids`, in dataset order
    pub fn documents_for(&self, ids: &IdSet) -> Vec<&D> {
        self.dataset.documents_for(ids)
    }

    pub fn dataset(&self) -> &KeyedDataset<D> {
        &self.dataset
    }

    pub fn facets(&self) -> &FacetRegistry {
        &self.registry
    }

    pub fn facet(&self, name: &str) -> Option<&FacetIndex> {
        self.registry.get(name).map(|facet| &**facet)
    }

    pub fn selections(&self) -> &SelectionSet {
        &self.selections
    }

    pub fn config(&self) -> &FacetSetConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn engine(&self) -> NarrowingEngine<'_, D> {
        NarrowingEngine {
            dataset: &self.dataset,
            registry: &self.registry,
            selections: &self.selections,
            cache: &self.cache,
        }
    }

    /// New snapshot over a changed registry, with a fresh cache
    fn with_registry(&self, registry: FacetRegistry, selections: SelectionSet) -> Self {
        Self {
            dataset: Arc::clone(&self.dataset),
            registry,
            selections,
            cache: Arc::new(MatchCache::new(self.config.cache_capacity)),
            config: Arc::clone(&self.config),
        }
    }

    /// New snapshot over the same registry, sharing its cache
    fn with_selections(&self, selections: SelectionSet) -> Self {
        Self { selections, ..self.clone() }
    }
}

impl<D> fmt::Debug for FacetSet<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacetSet")
            .field("documents", &self.dataset.len())
            .field("facets", &self.registry.names().collect::<Vec<_>>())
            .field("selections", &self.selections)
            .finish()
    }
}
