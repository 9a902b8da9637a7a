//! Copy-on-write sharded hash map
//!
//! The persistent map underneath every store structure. Entries are spread
//! over a fixed number of FxHashMap shards, each behind its own `Arc`. A
//! mutation clones the shard table (one pointer per shard) and only the
//! shards it touches; every other shard stays shared with the previous value.
//!
//! # Design
//!
//! - Immutable: every mutator returns a new map, the receiver never changes
//! - Canonical empty: a map with no entries holds no shard table at all, so
//!   all empty maps are pointer-equal
//! - No-op detection: removing absent keys or inserting an equal value hands
//!   back a clone of the receiver (pointer-equal to it)
//! - Bulk edits go through [`MapEditor`], which copies each shard at most once

use rustc_hash::{FxHashMap, FxHasher};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

const SHARD_BITS: u32 = 5;

/// Number of shards per map
pub const SHARD_COUNT: usize = 1 << SHARD_BITS;

type Shard<K, V> = FxHashMap<K, V>;

#[inline]
fn shard_index<Q: Hash + ?Sized>(key: &Q) -> usize {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    // High bits: FxHash mixes them best
    (hasher.finish() >> (64 - SHARD_BITS)) as usize
}

/// Persistent hash map with shard-level structural sharing
pub struct SharedMap<K, V> {
    shards: Option<Arc<[Arc<Shard<K, V>>]>>,
    len: usize,
}

impl<K, V> Clone for SharedMap<K, V> {
    fn clone(&self) -> Self {
        SharedMap {
            shards: self.shards.clone(),
            len: self.len,
        }
    }
}

impl<K, V> Default for SharedMap<K, V> {
    fn default() -> Self {
        SharedMap {
            shards: None,
            len: 0,
        }
    }
}

impl<K, V> SharedMap<K, V> {
    /// The canonical empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the map is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether both maps are the same value instance
    ///
    /// `true` implies equality; `false` says nothing.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.shards, &other.shards) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Iterate over all entries in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.shard_slice().iter().flat_map(|shard| shard.iter())
    }

    /// Iterate over all keys in unspecified order
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    /// Iterate over all values in unspecified order
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    fn shard_slice(&self) -> &[Arc<Shard<K, V>>] {
        self.shards.as_deref().unwrap_or(&[])
    }
}

impl<K, V> SharedMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Look up a key
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shards
            .as_ref()
            .and_then(|shards| shards[shard_index(key)].get(key))
    }

    /// Check if a key is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Map with `key` bound to `value`
    ///
    /// Returns the receiver unchanged if `key` is already bound to an equal value.
    pub fn insert(&self, key: K, value: V) -> Self
    where
        V: PartialEq,
    {
        if self.get(&key) == Some(&value) {
            return self.clone();
        }
        let mut editor = self.edit();
        editor.insert(key, value);
        editor.build()
    }

    /// Map without `key`; the receiver unchanged if absent
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut editor = self.edit();
        editor.remove(key);
        editor.build()
    }

    /// Map without any of `keys`; the receiver unchanged if none are present
    pub fn remove_all<'a, Q, I>(&self, keys: I) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized + 'a,
        I: IntoIterator<Item = &'a Q>,
    {
        let mut editor = self.edit();
        for key in keys {
            editor.remove(key);
        }
        editor.build()
    }

    /// Start a batch of edits against this map
    pub fn edit(&self) -> MapEditor<K, V> {
        let shards = match &self.shards {
            Some(shards) => shards.to_vec(),
            None => (0..SHARD_COUNT)
                .map(|_| Arc::new(Shard::default()))
                .collect(),
        };
        MapEditor {
            origin: self.clone(),
            shards,
            len: self.len,
            changed: false,
        }
    }
}

impl<K, V> FromIterator<(K, V)> for SharedMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut editor = SharedMap::new().edit();
        for (key, value) in iter {
            editor.insert(key, value);
        }
        editor.build()
    }
}

impl<K, V> PartialEq for SharedMap<K, V>
where
    K: Hash + Eq,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        match (&self.shards, &other.shards) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                // Keys hash to the same shard in both maps, so shards line up
                Arc::ptr_eq(a, b)
                    || a
                        .iter()
                        .zip(b.iter())
                        .all(|(x, y)| Arc::ptr_eq(x, y) || x == y)
            }
            _ => false,
        }
    }
}

impl<K: Hash + Eq, V: Eq> Eq for SharedMap<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for SharedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Batch editor for a [`SharedMap`]
///
/// Each shard is copied on its first write and mutated in place afterwards.
/// [`MapEditor::build`] returns the original map if nothing changed.
pub struct MapEditor<K, V> {
    origin: SharedMap<K, V>,
    shards: Vec<Arc<Shard<K, V>>>,
    len: usize,
    changed: bool,
}

impl<K, V> MapEditor<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Look up a key, seeing edits made so far
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.shards[shard_index(key)].get(key)
    }

    /// Bind `key` to `value`, returning the previous value
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let shard = Arc::make_mut(&mut self.shards[shard_index(&key)]);
        let previous = shard.insert(key, value);
        if previous.is_none() {
            self.len += 1;
        }
        self.changed = true;
        previous
    }

    /// Unbind `key`, returning the previous value
    ///
    /// Shards that do not hold `key` are left untouched.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = shard_index(key);
        if !self.shards[index].contains_key(key) {
            return None;
        }
        let previous = Arc::make_mut(&mut self.shards[index]).remove(key);
        self.len -= 1;
        self.changed = true;
        previous
    }

    /// Number of entries after the edits so far
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the edited map is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Finish editing
    pub fn build(self) -> SharedMap<K, V> {
        if !self.changed {
            return self.origin;
        }
        if self.len == 0 {
            return SharedMap::new();
        }
        SharedMap {
            shards: Some(Arc::from(self.shards)),
            len: self.len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(n: usize) -> SharedMap<String, usize> {
        (0..n).map(|i| (format!("k{i}"), i)).collect()
    }

    fn shared_shards(a: &SharedMap<String, usize>, b: &SharedMap<String, usize>) -> usize {
        a.shard_slice()
            .iter()
            .zip(b.shard_slice())
            .filter(|(x, y)| Arc::ptr_eq(x, y))
            .count()
    }

    #[test]
    fn test_insert_and_get() {
        let map = SharedMap::new().insert("a".to_string(), 1);
        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.get("b"), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_insert_does_not_touch_receiver() {
        let before = map_of(10);
        let after = before.insert("new".to_string(), 99);
        assert_eq!(before.len(), 10);
        assert!(!before.contains_key("new"));
        assert_eq!(after.len(), 11);
    }

    #[test]
    fn test_insert_equal_value_returns_same_instance() {
        let map = map_of(10);
        let again = map.insert("k3".to_string(), 3);
        assert!(again.ptr_eq(&map));

        let changed = map.insert("k3".to_string(), 4);
        assert!(!changed.ptr_eq(&map));
        assert_eq!(changed.get("k3"), Some(&4));
        assert_eq!(changed.len(), 10);
    }

    #[test]
    fn test_update_shares_untouched_shards() {
        let map = map_of(1000);
        let updated = map.insert("k500".to_string(), 0);
        assert_eq!(shared_shards(&map, &updated), SHARD_COUNT - 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let map = map_of(5);
        assert!(map.remove("missing").ptr_eq(&map));
        assert!(map.remove_all(["x", "y"]).ptr_eq(&map));
    }

    #[test]
    fn test_remove_to_empty_is_canonical() {
        let map = map_of(3);
        let emptied = map.remove_all(["k0", "k1", "k2"]);
        assert!(emptied.is_empty());
        assert!(emptied.ptr_eq(&SharedMap::new()));
        assert_eq!(emptied.iter().count(), 0);
    }

    #[test]
    fn test_equality_ignores_history() {
        let a = map_of(50);
        let b = map_of(51).remove("k50");
        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);
        assert_ne!(a, b.insert("k0".to_string(), 7));
    }

    #[test]
    fn test_editor_copies_each_shard_once() {
        let map = map_of(100);
        let mut editor = map.edit();
        for i in 0..100 {
            editor.insert(format!("k{i}"), i * 2);
        }
        assert_eq!(editor.len(), 100);
        let doubled = editor.build();
        assert_eq!(doubled.get("k7"), Some(&14));
        assert_eq!(map.get("k7"), Some(&7));
    }

    #[test]
    fn test_editor_without_changes_returns_origin() {
        let map = map_of(4);
        let editor = map.edit();
        assert!(editor.build().ptr_eq(&map));
    }
}
