//! Reverse reference index and cascade walk
//!
//! Maps each referenced identifier to the records that reference it,
//! partitioned by the referencing record's type, so callers can ask "which
//! functions reference item X" without filtering.
//!
//! # Loading
//!
//! [`ReverseReferenceIndex::load`] walks every record's reference fields once.
//! A record holding a reference whose target is missing, or present with the
//! wrong type, goes into a dangling set kept apart from the index, so no
//! identifier is reserved. The dangling set seeds a cascade that computes
//! every record that has to go to restore integrity; those records are
//! removed from the index and reported to the caller.
//!
//! # Cascade
//!
//! The reference graph may contain cycles (an item can end up contained by
//! its own descendant). [`ReverseReferenceIndex::cascade`] is an explicit
//! worklist over identifiers with the seed set doubling as the visited set;
//! an identifier is queued only the first time it is added.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use modelbase_core::{Record, RecordType};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::identity_map::IdentityMap;
use crate::shared_map::{MapEditor, SharedMap};

/// Set of record identifiers
pub type IdSet = FxHashSet<String>;

/// Records referencing one target, by referencing type
#[derive(Clone, Default, PartialEq, Eq)]
struct Referrers {
    by_type: BTreeMap<RecordType, IdentityMap>,
}

impl Referrers {
    fn iter(&self) -> impl Iterator<Item = &Arc<Record>> + '_ {
        self.by_type.values().flat_map(|bucket| bucket.iter())
    }
}

/// Result of building the index from a batch of records
#[derive(Debug, Clone)]
pub struct LoadedReferences {
    /// Index over the surviving records
    pub index: ReverseReferenceIndex,
    /// Records removed because a reference could not be resolved, directly
    /// or through a chain of references
    pub pruned: BTreeSet<String>,
}

/// Immutable index from target identifier to referencing records
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ReverseReferenceIndex {
    targets: SharedMap<String, Referrers>,
}

impl ReverseReferenceIndex {
    /// An empty index
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the index over `records`, pruning what cannot be resolved
    pub fn load(records: &IdentityMap) -> LoadedReferences {
        let mut raw: FxHashMap<&str, BTreeMap<RecordType, Vec<Arc<Record>>>> =
            FxHashMap::default();
        let mut doomed = IdSet::default();
        for record in records.iter() {
            for (field, target) in record.references() {
                match records.get(target) {
                    Some(found) if found.record_type() == field.target => {}
                    _ => {
                        doomed.insert(record.id().to_string());
                        continue;
                    }
                }
                raw.entry(target)
                    .or_default()
                    .entry(record.record_type())
                    .or_default()
                    .push(Arc::clone(record));
            }
        }

        let index = ReverseReferenceIndex {
            targets: raw
                .into_iter()
                .map(|(target, by_type)| {
                    let referrers = Referrers {
                        by_type: by_type
                            .into_iter()
                            .map(|(t, members)| (t, IdentityMap::from_records(members)))
                            .collect(),
                    };
                    (target.to_string(), referrers)
                })
                .collect(),
        };

        if doomed.is_empty() {
            return LoadedReferences {
                index,
                pruned: BTreeSet::new(),
            };
        }
        index.cascade(&mut doomed);

        let doomed_records: Vec<Arc<Record>> = doomed
            .iter()
            .filter_map(|id| records.get(id))
            .cloned()
            .collect();
        let index = index.remove_all(doomed_records.iter());

        LoadedReferences {
            index,
            pruned: doomed.into_iter().collect(),
        }
    }

    /// Every record referencing `target`
    pub fn find<'a>(&'a self, target: &str) -> impl Iterator<Item = &'a Arc<Record>> + 'a {
        self.targets
            .get(target)
            .into_iter()
            .flat_map(|referrers| referrers.iter())
    }

    /// Records of `record_type` referencing `target`
    pub fn find_typed<'a>(
        &'a self,
        target: &str,
        record_type: RecordType,
    ) -> impl Iterator<Item = &'a Arc<Record>> + 'a {
        self.targets
            .get(target)
            .and_then(|referrers| referrers.by_type.get(&record_type))
            .into_iter()
            .flat_map(|bucket| bucket.iter())
    }

    /// Whether anything references `target`
    pub fn is_referenced(&self, target: &str) -> bool {
        self.targets.contains_key(target)
    }

    /// Number of distinct referenced identifiers
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Extend `doomed` with everything that transitively references it
    pub fn cascade(&self, doomed: &mut IdSet) {
        let mut worklist: Vec<String> = doomed.iter().cloned().collect();
        while let Some(id) = worklist.pop() {
            for referrer in self.find(&id) {
                if doomed.insert(referrer.id().to_string()) {
                    worklist.push(referrer.id().to_string());
                }
            }
        }
    }

    /// Index with `old` replaced by `new`
    pub fn replace(&self, old: Option<&Record>, new: &Arc<Record>) -> Self {
        let mut editor = self.targets.edit();
        if let Some(old) = old {
            for (_, target) in old.references() {
                if !new.references_target(target) {
                    detach(&mut editor, target, old);
                }
            }
        }
        for (_, target) in new.references() {
            attach(&mut editor, target, new);
        }
        ReverseReferenceIndex {
            targets: editor.build(),
        }
    }

    /// Index without `records`
    ///
    /// Drops both the references the records hold and the entries keyed by
    /// their identifiers. Callers remove a cascade-closed set, so every record
    /// referencing a removed one is in `records` as well.
    pub fn remove_all<'a, I>(&self, records: I) -> Self
    where
        I: IntoIterator<Item = &'a Arc<Record>>,
    {
        let mut editor = self.targets.edit();
        let mut removed: Vec<&str> = Vec::new();
        for record in records {
            for (_, target) in record.references() {
                detach(&mut editor, target, record);
            }
            removed.push(record.id());
        }
        for id in removed {
            editor.remove(id);
        }
        ReverseReferenceIndex {
            targets: editor.build(),
        }
    }
}

fn attach(editor: &mut MapEditor<String, Referrers>, target: &str, record: &Arc<Record>) {
    let mut referrers = editor.get(target).cloned().unwrap_or_default();
    let bucket = referrers.by_type.entry(record.record_type()).or_default();
    let updated = bucket.put(Arc::clone(record));
    if updated.ptr_eq(bucket) {
        return;
    }
    *bucket = updated;
    editor.insert(target.to_string(), referrers);
}

fn detach(editor: &mut MapEditor<String, Referrers>, target: &str, record: &Record) {
    let Some(referrers) = editor.get(target) else {
        return;
    };
    let Some(bucket) = referrers.by_type.get(&record.record_type()) else {
        return;
    };
    let remaining = bucket.remove(record.id());
    if remaining.ptr_eq(bucket) {
        return;
    }

    let mut referrers = referrers.clone();
    if remaining.is_empty() {
        referrers.by_type.remove(&record.record_type());
    } else {
        referrers.by_type.insert(record.record_type(), remaining);
    }
    if referrers.by_type.is_empty() {
        editor.remove(target);
    } else {
        editor.insert(target.to_string(), referrers);
    }
}

impl fmt::Debug for ReverseReferenceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<(&str, Vec<&str>)> = self
            .targets
            .iter()
            .map(|(target, referrers)| {
                let mut ids: Vec<&str> = referrers.iter().map(|r| r.id()).collect();
                ids.sort_unstable();
                (target.as_str(), ids)
            })
            .collect();
        entries.sort_unstable();
        f.debug_map().entries(entries).finish()
    }
}
