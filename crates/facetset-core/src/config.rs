//! Facet set configuration
//!
//! Defaults can be overridden programmatically, deserialised from any serde
//! format, or read from `FACETSET_*` environment variables.

use crate::error::{FacetError, Result};
use crate::index::MissingValues;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration applied when a facet set is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacetSetConfig {
    /// Dot-separated path of the id field
    pub id_field: String,
    /// Policy for documents a classifier yields no value for, unless a facet overrides it
    pub missing_values: MissingValues,
    /// Maximum cached selections per registry snapshot; 0 disables the cache
    pub cache_capacity: usize,
}

impl Default for FacetSetConfig {
    fn default() -> Self {
        Self { id_field: "id".to_string(), missing_values: MissingValues::Skip, cache_capacity: 1024 }
    }
}

impl FacetSetConfig {
    /// Create configuration from environment variables
    pub fn from_environment() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset or unparseable values keep their default
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let id_field = lookup("FACETSET_ID_FIELD").unwrap_or(defaults.id_field);

        let missing_values = match lookup("FACETSET_MISSING_VALUES") {
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                warn!(error = %err, "Ignoring FACETSET_MISSING_VALUES");
                defaults.missing_values
            }),
            None => defaults.missing_values,
        };

        let cache_capacity = match lookup("FACETSET_CACHE_CAPACITY") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, "Ignoring FACETSET_CACHE_CAPACITY");
                defaults.cache_capacity
            }),
            None => defaults.cache_capacity,
        };

        Self { id_field, missing_values, cache_capacity }
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn with_missing_values(mut self, missing_values: MissingValues) -> Self {
        self.missing_values = missing_values;
        self
    }

    pub fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id_field.trim().is_empty() {
            return Err(FacetError::Configuration {
                setting: "id_field".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
