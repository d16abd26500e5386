//! Insertion-ordered map used for facets, facet values and query output

use ahash::AHashMap;
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;

/// A map that iterates in insertion order.
///
/// Entries live in a `Vec`; an `AHashMap` maps each key to its slot.
/// Overwriting a key keeps its original position. Removal shifts later
/// entries down.
#[derive(Clone)]
pub struct OrderedMap<K, V> {
    entries: Vec<(K, V)>,
    slots: AHashMap<K, usize>,
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self { entries: Vec::new(), slots: AHashMap::new() }
    }
}

impl<K, V> OrderedMap<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity), slots: AHashMap::with_capacity(capacity) }
    }

    /// Insert or overwrite, returning the previous value
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&slot) = self.slots.get(&key) {
            return Some(std::mem::replace(&mut self.entries[slot].1, value));
        }
        self.slots.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.slots.remove(key)?;
        let (_, value) = self.entries.remove(slot);
        for (k, _) in &self.entries[slot..] {
            if let Some(s) = self.slots.get_mut::<K>(k) {
                *s -= 1;
            }
        }
        Some(value)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.slots.get(key).map(|&slot| &self.entries[slot].1)
    }

    /// Mutable access, or insert the value produced by `default`
    pub fn get_or_insert_with(&mut self, key: K, default: impl FnOnce() -> V) -> &mut V {
        let slot = match self.slots.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = self.entries.len();
                self.slots.insert(key.clone(), slot);
                self.entries.push((key, default()));
                slot
            }
        };
        &mut self.entries[slot].1
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Keep only entries for which `keep` returns true, preserving order
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) {
        self.entries.retain(|(k, v)| keep(k, v));
        self.slots.clear();
        for (slot, (k, _)) in self.entries.iter().enumerate() {
            self.slots.insert(k.clone(), slot);
        }
    }

    /// Map every value, keeping keys and order
    pub fn map_values<W>(&self, mut f: impl FnMut(&K, &V) -> W) -> OrderedMap<K, W> {
        self.iter().map(|(k, v)| (k.clone(), f(k, v))).collect()
    }
}

impl<K, V> FromIterator<(K, V)> for OrderedMap<K, V>
where
    K: Hash + Eq + Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut map = Self::with_capacity(iter.size_hint().0);
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<K, V> IntoIterator for OrderedMap<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Equal when both hold the same entries in the same order
impl<K: PartialEq, V: PartialEq> PartialEq for OrderedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Eq, V: Eq> Eq for OrderedMap<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for OrderedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter().map(|(k, v)| (k, v))).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iterates_in_insertion_order() {
        let mut map = OrderedMap::new();
        map.insert("b", 1);
        map.insert("a", 2);
        map.insert("c", 3);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut map = OrderedMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        assert_eq!(map.insert("a", 10), Some(1));
        assert_eq!(map.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>(), vec![("a", 10), ("b", 2)]);
    }

    #[test]
    fn test_remove_reindexes_later_entries() {
        let mut map: OrderedMap<String, i32> =
            [("a", 1), ("b", 2), ("c", 3)].into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        assert_eq!(map.remove("a"), Some(1));
        assert_eq!(map.remove("missing"), None);
        assert_eq!(map.get("c"), Some(&3));
        assert_eq!(map.get("b"), Some(&2));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_remove_from_the_middle_keeps_slots_consistent() {
        let mut map: OrderedMap<String, i32> =
            ["a", "b", "c", "d"].into_iter().zip(1..).map(|(k, v)| (k.to_string(), v)).collect();
        assert_eq!(map.remove("b"), Some(2));

        assert_eq!(map.keys().map(String::as_str).collect::<Vec<_>>(), vec!["a", "c", "d"]);
        assert_eq!((map.get("c"), map.get("d")), (Some(&3), Some(&4)));

        // overwrite after removal lands on the shifted slot
        assert_eq!(map.insert("d".to_string(), 40), Some(4));
        map.insert("b".to_string(), 20);
        assert_eq!(
            map.iter().map(|(k, v)| (k.as_str(), *v)).collect::<Vec<_>>(),
            vec![("a", 1), ("c", 3), ("d", 40), ("b", 20)]
        );
    }

    #[test]
    fn test_retain_and_get_or_insert() {
        let mut map = OrderedMap::new();
        for i in 0..6 {
            *map.get_or_insert_with(i % 3, || 0) += 1;
        }
        assert_eq!(map.get(&0), Some(&2));
        map.retain(|k, _| *k != 1);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(map.get(&2), Some(&2));
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let a: OrderedMap<i32, i32> = [(1, 1), (2, 2)].into_iter().collect();
        let b: OrderedMap<i32, i32> = [(2, 2), (1, 1)].into_iter().collect();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
