//! Error types for facet set construction, facet building and selection
//!
//! Every error aborts the operation that raised it. Snapshots handed out
//! before the failing call are never touched, so a caller can fix its input
//! and retry from any earlier value.

use facetset_types::FacetValue;
use thiserror::Error;

/// Boxed error returned by user-supplied classifiers
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for all facet set operations
#[derive(Error, Debug)]
pub enum FacetError {
    /// A document has no value, or a null value, under the configured id field
    #[error(
        "every indexed document must have an id; looking for ids under `{id_field}`, \
         which is not present in document: {document}"
    )]
    MissingIdentifier { id_field: String, document: String },

    /// Two documents resolve to the same id
    #[error("multiple documents share the id {id} under `{id_field}`")]
    DuplicateIdentifier { id_field: String, id: FacetValue },

    /// An operation referenced a facet that is not in the registry
    #[error("no such facet: {name}")]
    UnknownFacet { name: String },

    /// A classifier failed while building a facet
    #[error("classifier for facet `{facet}` failed on document {id}: {source}")]
    ClassifierFailure {
        facet: String,
        id: FacetValue,
        #[source]
        source: BoxError,
    },

    /// A classifier produced no value and the facet rejects missing values
    #[error("classifier for facet `{facet}` produced no value for document {id}")]
    MissingFacetValue { facet: String, id: FacetValue },

    /// Documents are addressed by `u32` positions
    #[error("dataset of {len} documents exceeds the supported maximum of {max}")]
    DatasetTooLarge { len: usize, max: u64 },

    /// Invalid configuration value
    #[error("configuration error: {setting}: {message}")]
    Configuration { setting: String, message: String },
}

impl FacetError {
    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            FacetError::MissingIdentifier { .. } => "missing_identifier",
            FacetError::DuplicateIdentifier { .. } => "duplicate_identifier",
            FacetError::UnknownFacet { .. } => "unknown_facet",
            FacetError::ClassifierFailure { .. } => "classifier_failure",
            FacetError::MissingFacetValue { .. } => "missing_facet_value",
            FacetError::DatasetTooLarge { .. } => "dataset_too_large",
            FacetError::Configuration { .. } => "configuration",
        }
    }

    /// Whether the error came from building the keyed dataset
    pub fn is_dataset_error(&self) -> bool {
        matches!(
            self,
            FacetError::MissingIdentifier { .. }
                | FacetError::DuplicateIdentifier { .. }
                | FacetError::DatasetTooLarge { .. }
        )
    }

    pub fn unknown_facet(name: impl Into<String>) -> Self {
        FacetError::UnknownFacet { name: name.into() }
    }
}

/// Result type for facet set operations
pub type Result<T> = std::result::Result<T, FacetError>;
