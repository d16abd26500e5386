//! Facetset Types
//!
//! This crate defines the value type that documents are classified into by
//! `facetset-core`. Keeping it separate lets document adapters depend on the
//! value type without pulling in the engine.

#![deny(clippy::all)]
#![deny(missing_docs)]

mod value;
pub use value::FacetValue;
