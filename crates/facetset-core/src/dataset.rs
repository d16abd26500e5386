//! Keyed dataset: documents addressed by unique id
//!
//! Construction resolves every document's id, rejects missing and duplicate
//! ids, and assigns each document a dense `u32` position in input order.
//! Facets and id sets store positions in roaring bitmaps; [`IdSet`] turns
//! them back into ids on the way out.

use crate::error::{FacetError, Result};
use crate::path::{Document, FieldPath};
use ahash::AHashMap;
use facetset_types::FacetValue;
use roaring::RoaringBitmap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Position of a document within its dataset
pub type Position = u32;

/// Id table shared by a dataset and every id set derived from it
#[derive(Debug, Default)]
pub struct DocumentKeys {
    ids: Vec<FacetValue>,
    positions: AHashMap<FacetValue, Position>,
}

impl DocumentKeys {
    pub fn id(&self, position: Position) -> Option<&FacetValue> {
        self.ids.get(position as usize)
    }

    pub fn position(&self, id: &FacetValue) -> Option<Position> {
        self.positions.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[FacetValue] {
        &self.ids
    }
}

/// Immutable mapping from unique id to document
pub struct KeyedDataset<D> {
    id_field: FieldPath,
    keys: Arc<DocumentKeys>,
    documents: Vec<D>,
    all: RoaringBitmap,
}

impl<D: Document + fmt::Debug> KeyedDataset<D> {
    /// Index `documents` by the value under `id_field`.
    ///
    /// Fails on the first document without an id (or with a null id) and on
    /// the first repeated id. Nothing is returned on failure.
    #[instrument(skip_all, fields(id_field = %id_field, documents = documents.len()))]
    pub fn new(documents: Vec<D>, id_field: FieldPath) -> Result<Self> {
        if documents.len() > Position::MAX as usize {
            return Err(FacetError::DatasetTooLarge {
                len: documents.len(),
                max: u64::from(Position::MAX),
            });
        }

        let mut ids = Vec::with_capacity(documents.len());
        let mut positions = AHashMap::with_capacity(documents.len());

        for (position, document) in (0..).zip(&documents) {
            let id = match document.lookup(&id_field) {
                Some(id) if !id.is_null() => id,
                _ => {
                    return Err(FacetError::MissingIdentifier {
                        id_field: id_field.to_string(),
                        document: format!("{document:?}"),
                    });
                }
            };

            if positions.contains_key(&id) {
                return Err(FacetError::DuplicateIdentifier { id_field: id_field.to_string(), id });
            }

            positions.insert(id.clone(), position);
            ids.push(id);
        }

        let all: RoaringBitmap = (0..ids.len() as Position).collect();
        debug!(documents = ids.len(), "Keyed dataset built");

        Ok(Self { id_field, keys: Arc::new(DocumentKeys { ids, positions }), documents, all })
    }
}

impl<D> KeyedDataset<D> {
    pub fn id_field(&self) -> &FieldPath {
        &self.id_field
    }

    pub fn keys(&self) -> &Arc<DocumentKeys> {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &FacetValue) -> Option<&D> {
        self.keys.position(id).and_then(|p| self.at(p))
    }

    pub fn at(&self, position: Position) -> Option<&D> {
        self.documents.get(position as usize)
    }

    /// Documents with their positions, in input order
    pub fn iter(&self) -> impl Iterator<Item = (Position, &D)> {
        (0..).zip(self.documents.iter())
    }

    /// Every position in the dataset
    pub fn all_positions(&self) -> &RoaringBitmap {
        &self.all
    }

    /// Positions of the given ids; ids not in the dataset are dropped
    pub fn positions_of<'a, I>(&self, ids: I) -> RoaringBitmap
    where
        I: IntoIterator<Item = &'a FacetValue>,
    {
        ids.into_iter().filter_map(|id| self.keys.position(id)).collect()
    }

    pub fn id_set(&self, members: RoaringBitmap) -> IdSet {
        IdSet::new(Arc::clone(&self.keys), members)
    }

    /// Documents in `ids`, in dataset order
    pub fn documents_for(&self, ids: &IdSet) -> Vec<&D> {
        ids.positions().iter().filter_map(|p| self.at(p)).collect()
    }
}

impl<D: fmt::Debug> fmt::Debug for KeyedDataset<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedDataset")
            .field("id_field", &self.id_field)
            .field("documents", &self.documents.len())
            .finish()
    }
}

/// Read-only set of document ids.
///
/// Iterates in dataset order. Two sets are equal when they hold the same ids.
#[derive(Clone)]
pub struct IdSet {
    keys: Arc<DocumentKeys>,
    members: RoaringBitmap,
}

impl IdSet {
    pub(crate) fn new(keys: Arc<DocumentKeys>, members: RoaringBitmap) -> Self {
        Self { keys, members }
    }

    pub fn len(&self) -> usize {
        self.members.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &FacetValue) -> bool {
        self.keys.position(id).is_some_and(|p| self.members.contains(p))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FacetValue> + '_ {
        self.members.iter().filter_map(|p| self.keys.id(p))
    }

    pub fn to_vec(&self) -> Vec<FacetValue> {
        self.iter().cloned().collect()
    }

    pub fn intersection(&self, other: &IdSet) -> IdSet {
        IdSet::new(Arc::clone(&self.keys), &self.members & &other.members)
    }

    /// Underlying document positions
    pub fn positions(&self) -> &RoaringBitmap {
        &self.members
    }
}

impl PartialEq for IdSet {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.keys, &other.keys) {
            return self.members == other.members;
        }
        self.len() == other.len() && self.iter().all(|id| other.contains(id))
    }
}

impl Eq for IdSet {}

impl fmt::Debug for IdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
