#![allow(dead_code)]

use facetset_core::{FacetOptions, FacetSet, FacetValue, IdSet};
use serde_json::{Value, json};

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn tagged_documents() -> Vec<Value> {
    vec![
        json!({"id": 1, "type": "a", "tags": ["x", "y"]}),
        json!({"id": 2, "type": "b", "tags": ["y", "z"]}),
        json!({"id": 3, "type": "b", "tags": []}),
    ]
}

pub fn tagged_facet_set() -> FacetSet<Value> {
    FacetSet::new(tagged_documents())
        .unwrap()
        .add_field_facet("type", FacetOptions::default())
        .unwrap()
        .add_field_facet("tags", FacetOptions::multi_value())
        .unwrap()
}

pub fn int_ids(ids: &IdSet) -> Vec<i64> {
    ids.iter().filter_map(FacetValue::as_integer).collect()
}
