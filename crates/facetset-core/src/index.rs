//! Facet index construction
//!
//! Replaces the per-field `FieldIndexer` of the fact store with value → bitmap
//! indices built once from an arbitrary classifier.

use crate::dataset::KeyedDataset;
use crate::error::{FacetError, Result};
use crate::ordered::OrderedMap;
use crate::path::Classifier;
use facetset_types::FacetValue;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, instrument};

/// What to do with documents whose classifier produces no value.
///
/// Use `Null` to keep every document in a single-value facet, with undefined
/// results grouped under a value of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValues {
    /// Leave the document out of the facet
    #[default]
    Skip,
    /// Index the document under `FacetValue::Null`
    Null,
    /// Fail the facet build
    Reject,
}

impl FromStr for MissingValues {
    type Err = FacetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "null" => Ok(Self::Null),
            "reject" => Ok(Self::Reject),
            other => Err(FacetError::Configuration {
                setting: "missing_values".to_string(),
                message: format!("expected skip, null or reject, got `{other}`"),
            }),
        }
    }
}

/// Options recognised when adding a facet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FacetOptions {
    /// Index each element of an array result separately
    #[serde(default)]
    pub multi_value: bool,
    /// Overrides the configured missing-value policy
    #[serde(default)]
    pub missing: Option<MissingValues>,
}

impl FacetOptions {
    pub fn multi_value() -> Self {
        Self { multi_value: true, missing: None }
    }

    pub fn with_missing(mut self, missing: MissingValues) -> Self {
        self.missing = Some(missing);
        self
    }
}

/// A built facet: distinct value → positions of the documents classified under it.
///
/// Values iterate in the order they were first seen while scanning the
/// dataset. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetIndex {
    name: String,
    multi_value: bool,
    values: OrderedMap<FacetValue, RoaringBitmap>,
}

impl FacetIndex {
    /// Classify every document of `dataset`.
    ///
    /// A classifier error aborts the build with `ClassifierFailure`; nothing is
    /// registered for the facet.
    #[instrument(skip_all, fields(facet = %name, multi_value = options.multi_value))]
    pub fn build<D, C>(
        name: &str,
        dataset: &KeyedDataset<D>,
        classifier: &C,
        options: FacetOptions,
        default_missing: MissingValues,
    ) -> Result<Self>
    where
        C: Classifier<D> + ?Sized,
    {
        let missing = options.missing.unwrap_or(default_missing);
        let mut values: OrderedMap<FacetValue, RoaringBitmap> = OrderedMap::new();
        let mut skipped = 0usize;

        for (position, document) in dataset.iter() {
            let result = classifier.classify(document).map_err(|source| {
                FacetError::ClassifierFailure {
                    facet: name.to_string(),
                    id: id_at(dataset, position),
                    source,
                }
            })?;

            let result = match result {
                Some(FacetValue::Null) if options.multi_value => None,
                other => other,
            };

            let result = match (result, missing) {
                (Some(value), _) => value,
                (None, MissingValues::Skip) => {
                    skipped += 1;
                    continue;
                }
                (None, MissingValues::Null) => FacetValue::Null,
                (None, MissingValues::Reject) => {
                    return Err(FacetError::MissingFacetValue {
                        facet: name.to_string(),
                        id: id_at(dataset, position),
                    });
                }
            };

            match result {
                FacetValue::Array(elements) if options.multi_value => {
                    for element in elements {
                        values.get_or_insert_with(element, RoaringBitmap::new).insert(position);
                    }
                }
                value => {
                    values.get_or_insert_with(value, RoaringBitmap::new).insert(position);
                }
            }
        }

        debug!(
            facet = %name,
            distinct_values = values.len(),
            skipped,
            "Facet index built"
        );

        Ok(Self { name: name.to_string(), multi_value: options.multi_value, values })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_multi_value(&self) -> bool {
        self.multi_value
    }

    /// Number of distinct values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, value: &FacetValue) -> Option<&RoaringBitmap> {
        self.values.get(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FacetValue, &RoaringBitmap)> {
        self.values.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &FacetValue> {
        self.values.keys()
    }

    /// Union of the positions under any of `selected`; unknown values add nothing
    pub fn matching<'a, I>(&self, selected: I) -> RoaringBitmap
    where
        I: IntoIterator<Item = &'a FacetValue>,
    {
        let mut matched = RoaringBitmap::new();
        for value in selected {
            if let Some(positions) = self.values.get(value) {
                matched |= positions;
            }
        }
        matched
    }

    /// Every position classified under at least one value
    pub fn covered(&self) -> RoaringBitmap {
        self.matching(self.values.keys())
    }
}

fn id_at<D>(dataset: &KeyedDataset<D>, position: u32) -> FacetValue {
    dataset.keys().id(position).cloned().unwrap_or(FacetValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{Document, FieldPath, from_fn};
    use serde_json::{Value, json};

    fn dataset() -> KeyedDataset<Value> {
        KeyedDataset::new(
            vec![
                json!({"id": 1, "type": "a", "tags": ["x", "y"]}),
                json!({"id": 2, "type": "b", "tags": ["y", "z"]}),
                json!({"id": 3, "type": "b", "tags": []}),
            ],
            "id".into(),
        )
        .unwrap()
    }

    fn positions(index: &FacetIndex, value: impl Into<FacetValue>) -> Vec<u32> {
        index.get(&value.into()).map(|b| b.iter().collect()).unwrap_or_default()
    }

    #[test]
    fn test_single_value_facet() {
        let data = dataset();
        let index = FacetIndex::build(
            "type",
            &data,
            &FieldPath::parse("type"),
            FacetOptions::default(),
            MissingValues::Skip,
        )
        .unwrap();

        assert_eq!(index.values().cloned().collect::<Vec<_>>(), vec![FacetValue::from("a"), FacetValue::from("b")]);
        assert_eq!(positions(&index, "a"), vec![0]);
        assert_eq!(positions(&index, "b"), vec![1, 2]);
        assert_eq!(index.covered().len(), 3);
    }

    #[test]
    fn test_multi_value_facet_expands_arrays() {
        let data = dataset();
        let index = FacetIndex::build(
            "tags",
            &data,
            &FieldPath::parse("tags"),
            FacetOptions::multi_value(),
            MissingValues::Skip,
        )
        .unwrap();

        let values: Vec<FacetValue> = index.values().cloned().collect();
        assert_eq!(values, vec![FacetValue::from("x"), FacetValue::from("y"), FacetValue::from("z")]);
        assert_eq!(positions(&index, "y"), vec![0, 1]);
        // empty tag list contributes nothing
        assert!(!index.covered().contains(2));
    }

    #[test]
    fn test_single_value_facet_keeps_arrays_atomic() {
        let data = dataset();
        let index = FacetIndex::build(
            "tags",
            &data,
            &FieldPath::parse("tags"),
            FacetOptions::default(),
            MissingValues::Skip,
        )
        .unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(positions(&index, vec!["x", "y"]), vec![0]);
        assert_eq!(positions(&index, FacetValue::Array(vec![])), vec![2]);
        assert!(index.get(&FacetValue::from("x")).is_none());
    }

    #[test]
    fn test_duplicate_elements_collapse() {
        let data = KeyedDataset::new(vec![json!({"id": 1, "t": ["q", "q"]})], "id".into()).unwrap();
        let index = FacetIndex::build("t", &data, &FieldPath::parse("t"), FacetOptions::multi_value(), MissingValues::Skip)
            .unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(positions(&index, "q"), vec![0]);
    }

    fn single_field(documents: Vec<Value>) -> KeyedDataset<Value> {
        KeyedDataset::new(documents, "id".into()).unwrap()
    }

    #[test]
    fn test_multi_value_null_follows_missing_policy() {
        let data = single_field(vec![json!({"id": 1, "t": null}), json!({"id": 2, "t": ["a"]})]);
        let t = FieldPath::parse("t");

        let skipped = FacetIndex::build("t", &data, &t, FacetOptions::multi_value(), MissingValues::Skip).unwrap();
        assert_eq!(skipped.values().cloned().collect::<Vec<_>>(), vec![FacetValue::from("a")]);
        assert!(!skipped.covered().contains(0));

        let nulls = FacetIndex::build("t", &data, &t, FacetOptions::multi_value(), MissingValues::Null).unwrap();
        assert_eq!(positions(&nulls, FacetValue::Null), vec![0]);
        assert_eq!(positions(&nulls, "a"), vec![1]);

        let err = FacetIndex::build("t", &data, &t, FacetOptions::multi_value(), MissingValues::Reject)
            .unwrap_err();
        assert_eq!(err.category(), "missing_facet_value");
    }

    #[test]
    fn test_multi_value_scalar_is_one_value() {
        let data = single_field(vec![json!({"id": 1, "t": "a"}), json!({"id": 2, "t": ["a", "b"]})]);
        let index =
            FacetIndex::build("t", &data, &FieldPath::parse("t"), FacetOptions::multi_value(), MissingValues::Skip)
                .unwrap();

        assert_eq!(index.values().cloned().collect::<Vec<_>>(), vec![FacetValue::from("a"), FacetValue::from("b")]);
        assert_eq!(positions(&index, "a"), vec![0, 1]);
        assert_eq!(positions(&index, "b"), vec![1]);
    }

    #[test]
    fn test_missing_value_policies() {
        let data = dataset();
        let colour = FieldPath::parse("colour");

        let skipped =
            FacetIndex::build("colour", &data, &colour, FacetOptions::default(), MissingValues::Skip).unwrap();
        assert!(skipped.is_empty());

        let nulls = FacetIndex::build(
            "colour",
            &data,
            &colour,
            FacetOptions::default().with_missing(MissingValues::Null),
            MissingValues::Skip,
        )
        .unwrap();
        assert_eq!(positions(&nulls, FacetValue::Null), vec![0, 1, 2]);

        let err = FacetIndex::build("colour", &data, &colour, FacetOptions::default(), MissingValues::Reject)
            .unwrap_err();
        match err {
            FacetError::MissingFacetValue { facet, id } => {
                assert_eq!(facet, "colour");
                assert_eq!(id, FacetValue::Integer(1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_classifier_failure_names_document() {
        let data = dataset();
        let classifier = |doc: &Value| {
            if doc["id"] == json!(2) { Err("cannot classify") } else { Ok(Some(FacetValue::Boolean(true))) }
        };
        let err =
            FacetIndex::build("flag", &data, &classifier, FacetOptions::default(), MissingValues::Skip).unwrap_err();
        match err {
            FacetError::ClassifierFailure { facet, id, source } => {
                assert_eq!(facet, "flag");
                assert_eq!(id, FacetValue::Integer(2));
                assert_eq!(source.to_string(), "cannot classify");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_custom_classifier_and_matching() {
        let data = dataset();
        let tag_count = from_fn(|doc: &Value| {
            doc.lookup(&"tags".into())
                .and_then(|tags| tags.as_array().map(|t| FacetValue::Integer(t.len() as i64)))
        });
        let index =
            FacetIndex::build("tag_count", &data, &tag_count, FacetOptions::default(), MissingValues::Skip).unwrap();
        assert_eq!(positions(&index, 2), vec![0, 1]);

        let matched = index.matching(&[FacetValue::Integer(0), FacetValue::Integer(7)]);
        assert_eq!(matched.iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_missing_values_from_str() {
        assert_eq!("Reject".parse::<MissingValues>().unwrap(), MissingValues::Reject);
        assert!("sometimes".parse::<MissingValues>().is_err());
    }
}
