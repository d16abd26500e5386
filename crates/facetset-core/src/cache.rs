//! Matched-id cache for selections
//!
//! Memoises the positions each selection resolves to against one registry
//! snapshot. Every `FacetSet` derived from the same registry shares one cache;
//! adding or removing a facet starts a fresh one. Lookups go through a
//! `DashMap`, so snapshots shared across threads can read and fill it
//! concurrently. The cache never changes results, only how often they are
//! recomputed.

use crate::selection::Selection;
use dashmap::DashMap;
use roaring::RoaringBitmap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

#[derive(Debug)]
struct CacheEntry {
    positions: Arc<RoaringBitmap>,
    last_access: u64,
}

/// Bounded, least-recently-used cache keyed by selection
#[derive(Debug)]
pub struct MatchCache {
    entries: DashMap<Selection, CacheEntry>,
    capacity: usize,
    access_counter: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MatchCache {
    /// A capacity of 0 disables caching
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity(capacity.min(1024)),
            capacity,
            access_counter: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached positions for `selection`, computing and storing them on a miss
    pub fn get_or_compute(
        &self,
        selection: &Selection,
        compute: impl FnOnce() -> RoaringBitmap,
    ) -> Arc<RoaringBitmap> {
        if self.capacity == 0 {
            return Arc::new(compute());
        }

        let access = self.access_counter.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(mut entry) = self.entries.get_mut(selection) {
            entry.last_access = access;
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(facet = %selection.facet(), "Selection cache hit");
            return Arc::clone(&entry.positions);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(facet = %selection.facet(), "Selection cache miss");

        let positions = Arc::new(compute());
        if self.entries.len() >= self.capacity {
            self.evict_lru();
        }
        self.entries.insert(
            selection.clone(),
            CacheEntry { positions: Arc::clone(&positions), last_access: access },
        );
        positions
    }

    pub fn contains(&self, selection: &Selection) -> bool {
        self.entries.contains_key(selection)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            capacity: self.capacity,
            size: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn evict_lru(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().last_access)
            .map(|entry| entry.key().clone());

        if let Some(selection) = oldest {
            self.entries.remove(&selection);
            trace!(facet = %selection.facet(), "Selection cache eviction");
        }
    }
}

/// Cache statistics for monitoring and debugging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub capacity: usize,
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}
