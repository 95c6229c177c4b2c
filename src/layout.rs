use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, BuildHasherDefault, Hash};

use xxhash_rust::xxh3::Xxh3;

/// Hasher used by the unordered layout.
pub type KeyHasher = BuildHasherDefault<Xxh3>;

/// The minimal associative-container surface the staging map needs.
///
/// Implemented for `BTreeMap` (ordered) and `HashMap` (unordered). The only
/// behavioral difference a caller can observe is which entry `pop_first`
/// hands out.
pub trait EntryMap<K, T>: Default {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains_key(&self, key: &K) -> bool;

    fn get_mut(&mut self, key: &K) -> Option<&mut T>;

    /// Insert, returning the previous value for `key` if any.
    fn insert(&mut self, key: K, value: T) -> Option<T>;

    fn remove(&mut self, key: &K) -> Option<T>;

    /// Remove and return the entry at the head of iteration order.
    fn pop_first(&mut self) -> Option<(K, T)>;

    fn clear(&mut self);
}

impl<K: Ord, T> EntryMap<K, T> for BTreeMap<K, T> {
    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn contains_key(&self, key: &K) -> bool {
        BTreeMap::contains_key(self, key)
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut T> {
        BTreeMap::get_mut(self, key)
    }

    fn insert(&mut self, key: K, value: T) -> Option<T> {
        BTreeMap::insert(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Option<T> {
        BTreeMap::remove(self, key)
    }

    // Lowest key first.
    fn pop_first(&mut self) -> Option<(K, T)> {
        BTreeMap::pop_first(self)
    }

    fn clear(&mut self) {
        BTreeMap::clear(self)
    }
}

impl<K, T, S> EntryMap<K, T> for HashMap<K, T, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher + Default,
{
    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn contains_key(&self, key: &K) -> bool {
        HashMap::contains_key(self, key)
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut T> {
        HashMap::get_mut(self, key)
    }

    fn insert(&mut self, key: K, value: T) -> Option<T> {
        HashMap::insert(self, key, value)
    }

    fn remove(&mut self, key: &K) -> Option<T> {
        HashMap::remove(self, key)
    }

    // Whatever the table yields first; no order is implied.
    fn pop_first(&mut self) -> Option<(K, T)> {
        let key = self.keys().next()?.clone();
        HashMap::remove_entry(self, &key)
    }

    fn clear(&mut self) {
        HashMap::clear(self)
    }
}

/// Selects the container backing a staging map's complete and incomplete
/// entries.
///
/// ```text
///   Ordered    BTreeMap<K, _>            K: Ord                popitem → lowest key
///   Unordered  HashMap<K, _, KeyHasher>  K: Hash + Eq + Clone  popitem → table head
/// ```
pub trait Layout<K> {
    type Map<T>: EntryMap<K, T>;

    /// Human-readable layout name, used in logs.
    const NAME: &'static str;
}

/// Keys kept in ascending order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ordered;

/// Keys kept in an xxh3-hashed table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unordered;

impl<K: Ord> Layout<K> for Ordered {
    type Map<T> = BTreeMap<K, T>;

    const NAME: &'static str = "ordered";
}

impl<K: Hash + Eq + Clone> Layout<K> for Unordered {
    type Map<T> = HashMap<K, T, KeyHasher>;

    const NAME: &'static str = "unordered";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain<M: EntryMap<u64, &'static str>>(mut map: M) -> Vec<u64> {
        let mut keys = Vec::new();
        while let Some((k, _)) = map.pop_first() {
            keys.push(k);
        }
        keys
    }

    #[test]
    fn test_ordered_pop_first_is_lowest() {
        let mut map: <Ordered as Layout<u64>>::Map<&'static str> = Default::default();
        for (k, v) in [(30, "c"), (10, "a"), (20, "b")] {
            EntryMap::insert(&mut map, k, v);
        }
        assert_eq!(drain(map), vec![10, 20, 30]);
    }

    #[test]
    fn test_unordered_pop_first_drains_everything() {
        let mut map: <Unordered as Layout<u64>>::Map<&'static str> = Default::default();
        for k in 0..50 {
            assert!(EntryMap::insert(&mut map, k, "v").is_none());
        }
        let mut keys = drain(map);
        keys.sort();
        assert_eq!(keys, (0..50).collect::<Vec<_>>());
    }
}
