//! Secondary indices over derived keys
//!
//! A [`BucketIndex`] groups records under zero, one or many keys computed by
//! a key-extraction function. The store keeps four of them:
//! - by type: every record under its table tag
//! - by trace: child records under the parent record they trace to
//! - by scope: connections under each ordered endpoint pair they join
//! - by long name: records under their display name
//!
//! Each bucket is an [`IdentityMap`], so updates share structure the same way
//! the primary map does.

use smallvec::SmallVec;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use modelbase_core::Record;
use rustc_hash::FxHashMap;

use crate::identity_map::IdentityMap;
use crate::shared_map::SharedMap;

/// Keys derived from one record (most records yield zero or one)
pub type IndexKeys<K> = SmallVec<[K; 2]>;

/// Key-extraction function
pub type KeyExtractor<K> = fn(&Record) -> IndexKeys<K>;

/// Immutable multi-valued index from derived key to records
#[derive(Clone)]
pub struct BucketIndex<K> {
    extractor: KeyExtractor<K>,
    buckets: SharedMap<K, IdentityMap>,
}

impl<K> BucketIndex<K>
where
    K: Hash + Eq + Clone,
{
    /// An empty index using `extractor`
    pub fn empty(extractor: KeyExtractor<K>) -> Self {
        BucketIndex {
            extractor,
            buckets: SharedMap::new(),
        }
    }

    /// Build an index over a batch of records
    ///
    /// Two passes: group records by key, then build one identity map per key.
    pub fn value_of<'a, I>(extractor: KeyExtractor<K>, records: I) -> Self
    where
        I: IntoIterator<Item = &'a Arc<Record>>,
    {
        let mut groups: FxHashMap<K, Vec<Arc<Record>>> = FxHashMap::default();
        for record in records {
            for key in extractor(record) {
                groups.entry(key).or_default().push(Arc::clone(record));
            }
        }

        BucketIndex {
            extractor,
            buckets: groups
                .into_iter()
                .map(|(key, members)| (key, IdentityMap::from_records(members)))
                .collect(),
        }
    }

    /// Records indexed under `key`
    pub fn get<Q>(&self, key: &Q) -> impl Iterator<Item = &Arc<Record>> + '_
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.buckets
            .get(key)
            .into_iter()
            .flat_map(|bucket| bucket.iter())
    }

    /// The whole bucket for `key`, if any record is indexed under it
    pub fn bucket<Q>(&self, key: &Q) -> Option<&IdentityMap>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.buckets.get(key)
    }

    /// Keys the extractor derives for `record`
    pub fn keys_of(&self, record: &Record) -> IndexKeys<K> {
        (self.extractor)(record)
    }

    /// Index with `old` replaced by `new`
    ///
    /// `old` is removed from every key it was filed under before `new` is filed
    /// under its current keys; the two key sets may differ.
    pub fn replace(&self, old: Option<&Record>, new: &Arc<Record>) -> Self {
        let new_keys = self.keys_of(new);
        let mut editor = self.buckets.edit();

        if let Some(old) = old {
            for key in self.keys_of(old) {
                if new_keys.contains(&key) {
                    continue;
                }
                let Some(bucket) = editor.get(&key) else {
                    continue;
                };
                let remaining = bucket.remove(old.id());
                if remaining.is_empty() {
                    editor.remove(&key);
                } else if !remaining.ptr_eq(bucket) {
                    editor.insert(key, remaining);
                }
            }
        }

        for key in new_keys {
            let bucket = editor.get(&key).cloned().unwrap_or_default();
            let updated = bucket.put(Arc::clone(new));
            if !updated.ptr_eq(&bucket) {
                editor.insert(key, updated);
            }
        }

        BucketIndex {
            extractor: self.extractor,
            buckets: editor.build(),
        }
    }

    /// Index without `records`, using each record's keys to find its buckets
    pub fn remove_records<'a, I>(&self, records: I) -> Self
    where
        I: IntoIterator<Item = &'a Arc<Record>>,
    {
        let mut by_key: FxHashMap<K, Vec<&str>> = FxHashMap::default();
        for record in records {
            for key in self.keys_of(record) {
                by_key.entry(key).or_default().push(record.id());
            }
        }
        self.remove_from_buckets(by_key)
    }

    /// Index without `ids`, searching every bucket
    ///
    /// Buckets that become empty are dropped.
    pub fn remove_all<'a, I>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let ids: HashSet<&str> = ids.into_iter().collect();
        let mut by_key: FxHashMap<K, Vec<&str>> = FxHashMap::default();
        for (key, bucket) in self.buckets.iter() {
            let present: Vec<&str> = ids.iter().copied().filter(|id| bucket.contains(id)).collect();
            if !present.is_empty() {
                by_key.insert(key.clone(), present);
            }
        }
        self.remove_from_buckets(by_key)
    }

    fn remove_from_buckets(&self, by_key: FxHashMap<K, Vec<&str>>) -> Self {
        let mut editor = self.buckets.edit();
        for (key, ids) in by_key {
            let Some(bucket) = editor.get(&key) else {
                continue;
            };
            let remaining = bucket.remove_all(ids);
            if remaining.is_empty() {
                editor.remove(&key);
            } else if !remaining.ptr_eq(bucket) {
                editor.insert(key, remaining);
            }
        }
        BucketIndex {
            extractor: self.extractor,
            buckets: editor.build(),
        }
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.buckets.len()
    }

    /// All keys in unspecified order
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.buckets.keys()
    }

    /// Whether both indices are the same value instance
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.buckets.ptr_eq(&other.buckets)
    }
}

impl<K: Hash + Eq> PartialEq for BucketIndex<K> {
    fn eq(&self, other: &Self) -> bool {
        self.buckets == other.buckets
    }
}

impl<K: fmt::Debug> fmt::Debug for BucketIndex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketIndex")
            .field("buckets", &self.buckets)
            .finish()
    }
}
