#![deny(clippy::all)]
#![allow(missing_docs)]
//! Core functionality for faceted navigation over keyed datasets.
//!
//! A [`FacetSet`] indexes a collection of documents by one or more facets,
//! keeps a set of active selections, and answers which documents match and
//! which facet values remain once those selections are applied. Every
//! operation produces a new snapshot; earlier snapshots are never modified.

/// Matched-id cache shared by snapshots of one facet registry
pub mod cache;
/// Configuration from code, serde or the environment
pub mod config;
/// Documents keyed by a unique id, and id sets over them
pub mod dataset;
pub mod error;
/// The persistent faceted-navigation value
pub mod facet_set;
/// Built facet indexes
pub mod index;
/// Selection resolution and facet narrowing
pub mod narrowing;
pub mod ordered;
/// Field paths, document access and classifiers
pub mod path;
/// Name → facet index registry
pub mod registry;
/// Selections and the selection set
pub mod selection;

pub use cache::{CacheStats, MatchCache};
pub use config::FacetSetConfig;
pub use dataset::{DocumentKeys, IdSet, KeyedDataset, Position};
pub use error::{BoxError, FacetError, Result};
pub use facet_set::{FacetIds, FacetSet, NarrowedFacets};
pub use facetset_types::FacetValue;
pub use index::{FacetIndex, FacetOptions, MissingValues};
pub use narrowing::{NarrowedFacet, NarrowingQuery, narrow_facet};
pub use ordered::OrderedMap;
pub use path::{Classifier, Document, FieldPath, FnClassifier, from_fn};
pub use registry::FacetRegistry;
pub use selection::{Selection, SelectionSet};
