//! Field access and document classification
//!
//! A [`FieldPath`] names a (possibly nested) field. Any type implementing
//! [`Document`] can resolve a path to a [`FacetValue`]. A [`Classifier`] turns
//! a document into the value it is indexed under; a field path is the most
//! common classifier, closures cover everything else.

use crate::error::BoxError;
use facetset_types::FacetValue;
use std::fmt;

/// Dot-separated path into a document, e.g. `person.favorite_things`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { segments: segments.into_iter().map(Into::into).collect() }
    }

    /// Split on `.`
    pub fn parse(path: &str) -> Self {
        Self::new(path.split('.'))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// An empty path resolves to the whole document
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<String> for FieldPath {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl From<&String> for FieldPath {
    fn from(path: &String) -> Self {
        Self::parse(path)
    }
}

impl From<Vec<String>> for FieldPath {
    fn from(segments: Vec<String>) -> Self {
        Self { segments }
    }
}

impl From<&[&str]> for FieldPath {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for FieldPath {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments)
    }
}

/// Something a [`FieldPath`] can be resolved against
pub trait Document {
    /// Resolve `path`, or `None` when any segment is absent
    fn lookup(&self, path: &FieldPath) -> Option<FacetValue>;
}

impl Document for serde_json::Value {
    fn lookup(&self, path: &FieldPath) -> Option<FacetValue> {
        let mut current = self;
        for segment in path.segments() {
            current = match current {
                serde_json::Value::Object(members) => members.get(segment)?,
                serde_json::Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        FacetValue::try_from(current).ok()
    }
}

impl Document for FacetValue {
    fn lookup(&self, path: &FieldPath) -> Option<FacetValue> {
        let mut current = self;
        for segment in path.segments() {
            current = match current {
                FacetValue::Object(members) => members.get(segment)?,
                FacetValue::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }
}

/// Produces the classification value of a document.
///
/// `Ok(None)` means the document has no value for this facet; what happens
/// then is decided by the facet's missing-value policy.
pub trait Classifier<D: ?Sized> {
    fn classify(&self, document: &D) -> Result<Option<FacetValue>, BoxError>;
}

impl<D, F, E> Classifier<D> for F
where
    D: ?Sized,
    F: Fn(&D) -> Result<Option<FacetValue>, E>,
    E: Into<BoxError>,
{
    fn classify(&self, document: &D) -> Result<Option<FacetValue>, BoxError> {
        self(document).map_err(Into::into)
    }
}

impl<D: Document + ?Sized> Classifier<D> for FieldPath {
    fn classify(&self, document: &D) -> Result<Option<FacetValue>, BoxError> {
        Ok(document.lookup(self))
    }
}

/// Classifier over an infallible function, see [`from_fn`]
#[derive(Debug, Clone, Copy)]
pub struct FnClassifier<F>(F);

impl<D, F> Classifier<D> for FnClassifier<F>
where
    D: ?Sized,
    F: Fn(&D) -> Option<FacetValue>,
{
    fn classify(&self, document: &D) -> Result<Option<FacetValue>, BoxError> {
        Ok((self.0)(document))
    }
}

/// Wrap a function that cannot fail
pub fn from_fn<D, F>(f: F) -> FnClassifier<F>
where
    D: ?Sized,
    F: Fn(&D) -> Option<FacetValue>,
{
    FnClassifier(f)
}
