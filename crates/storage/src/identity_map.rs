//! Identifier → record map
//!
//! The primary structure of a store and the building block of every index.
//! A thin typed layer over [`SharedMap`] keyed by record identifier.

use std::fmt;
use std::sync::Arc;

use modelbase_core::Record;

use crate::shared_map::SharedMap;

/// Immutable map from identifier to record
#[derive(Clone, Default, PartialEq, Eq)]
pub struct IdentityMap {
    entries: SharedMap<String, Arc<Record>>,
}

impl IdentityMap {
    /// The canonical empty map
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a map from a batch of records
    ///
    /// Later records replace earlier ones with the same identifier.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Arc<Record>>,
    {
        IdentityMap {
            entries: records
                .into_iter()
                .map(|record| (record.id().to_string(), record))
                .collect(),
        }
    }

    /// Look up a record by identifier
    pub fn get(&self, id: &str) -> Option<&Arc<Record>> {
        self.entries.get(id)
    }

    /// Check if an identifier is present
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Map with `record` stored under its identifier
    ///
    /// Returns the same instance if an equal record is already stored.
    pub fn put(&self, record: Arc<Record>) -> Self {
        IdentityMap {
            entries: self.entries.insert(record.id().to_string(), record),
        }
    }

    /// Map without `id`; the same instance if absent
    pub fn remove(&self, id: &str) -> Self {
        IdentityMap {
            entries: self.entries.remove(id),
        }
    }

    /// Map without any of `ids`; the same instance if none are present
    pub fn remove_all<'a, I>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        IdentityMap {
            entries: self.entries.remove_all(ids),
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All records in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Record>> + '_ {
        self.entries.values()
    }

    /// All identifiers in unspecified order
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Whether both maps are the same value instance
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.entries.ptr_eq(&other.entries)
    }
}

impl fmt::Debug for IdentityMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.ids().collect();
        ids.sort_unstable();
        f.debug_struct("IdentityMap").field("ids", &ids).finish()
    }
}
