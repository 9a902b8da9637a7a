//! The record store
//!
//! A [`RecordStore`] is one immutable value holding the identity map, four
//! secondary indices and the reverse reference index, all derived from the
//! same record set. Every transition builds all six structures together, so
//! no query can observe an index that disagrees with the identity map.
//!
//! # Integrity
//!
//! - `add` rejects a record whose references do not resolve to a stored
//!   record of the expected type; the store comes back unchanged
//! - `remove` takes the cascade closure with it
//! - `load` prunes dangling records and reports their identifiers
//!
//! None of these are errors. Callers that care compare the result with the
//! receiver (`ptr_eq`) or inspect the pruned set.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use modelbase_core::{Record, RecordType, Timestamp};
use tracing::{debug, trace, warn};

use crate::bucket_index::BucketIndex;
use crate::identity_map::IdentityMap;
use crate::keys::{long_name_keys, scope_keys, trace_keys, type_keys, ScopeKey};
use crate::reverse_index::{IdSet, LoadedReferences, ReverseReferenceIndex};

/// Record count from which `load` builds the secondary indices in parallel
pub const DEFAULT_PARALLEL_LOAD_THRESHOLD: usize = 4096;

/// Result of loading a batch of records
#[derive(Debug, Clone)]
pub struct Loaded {
    /// Store over the records that passed the integrity check
    pub store: RecordStore,
    /// Identifiers dropped because their references could not be resolved
    pub pruned: BTreeSet<String>,
}

/// Immutable, referentially consistent record store
#[derive(Clone)]
pub struct RecordStore {
    records: IdentityMap,
    by_type: BucketIndex<RecordType>,
    by_trace: BucketIndex<String>,
    by_scope: BucketIndex<ScopeKey>,
    by_long_name: BucketIndex<String>,
    references: ReverseReferenceIndex,
}

impl Default for RecordStore {
    fn default() -> Self {
        RecordStore {
            records: IdentityMap::empty(),
            by_type: BucketIndex::empty(type_keys),
            by_trace: BucketIndex::empty(trace_keys),
            by_scope: BucketIndex::empty(scope_keys),
            by_long_name: BucketIndex::empty(long_name_keys),
            references: ReverseReferenceIndex::empty(),
        }
    }
}

impl RecordStore {
    /// The empty store
    pub fn empty() -> Self {
        Self::default()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Store over `records`, dropping any that fail the integrity check
    pub fn value_of<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Arc<Record>>,
    {
        Self::load(records).store
    }

    /// Store over `records`, reporting what failed the integrity check
    pub fn load<I>(records: I) -> Loaded
    where
        I: IntoIterator<Item = Arc<Record>>,
    {
        Self::load_with_threshold(records, DEFAULT_PARALLEL_LOAD_THRESHOLD)
    }

    /// [`RecordStore::load`] with an explicit parallel build threshold
    ///
    /// Batches of at least `parallel_threshold` records build their secondary
    /// indices on the rayon pool. A threshold of 0 always builds in parallel.
    pub fn load_with_threshold<I>(records: I, parallel_threshold: usize) -> Loaded
    where
        I: IntoIterator<Item = Arc<Record>>,
    {
        let mut records = IdentityMap::from_records(records);
        let LoadedReferences { index, pruned } = ReverseReferenceIndex::load(&records);

        if !pruned.is_empty() {
            warn!(
                target: "modelbase::store",
                count = pruned.len(),
                ids = ?pruned,
                "Pruned records with unresolved references"
            );
            records = records.remove_all(pruned.iter().map(String::as_str));
        }

        let members: Vec<&Arc<Record>> = records.iter().collect();
        let build_type = || BucketIndex::value_of(type_keys, members.iter().copied());
        let build_trace = || BucketIndex::value_of(trace_keys, members.iter().copied());
        let build_scope = || BucketIndex::value_of(scope_keys, members.iter().copied());
        let build_name = || BucketIndex::value_of(long_name_keys, members.iter().copied());

        let ((by_type, by_trace), (by_scope, by_long_name)) =
            if members.len() >= parallel_threshold {
                debug!(
                    target: "modelbase::store",
                    records = members.len(),
                    "Building indices in parallel"
                );
                rayon::join(
                    || rayon::join(build_type, build_trace),
                    || rayon::join(build_scope, build_name),
                )
            } else {
                ((build_type(), build_trace()), (build_scope(), build_name()))
            };

        Loaded {
            store: RecordStore {
                records,
                by_type,
                by_trace,
                by_scope,
                by_long_name,
                references: index,
            },
            pruned,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Record `id` if it exists with type `record_type`
    pub fn get(&self, id: &str, record_type: RecordType) -> Option<&Arc<Record>> {
        self.records
            .get(id)
            .filter(|record| record.record_type() == record_type)
    }

    /// Record `id` whatever its type
    pub fn get_any_type(&self, id: &str) -> Option<&Arc<Record>> {
        self.records.get(id)
    }

    /// Check if a record with this identifier is stored
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains(id)
    }

    /// Every record of one type
    pub fn find_by_type(&self, record_type: RecordType) -> impl Iterator<Item = &Arc<Record>> + '_ {
        self.by_type.get(&record_type)
    }

    /// Records whose `trace` names `parent_id`
    pub fn find_by_trace<'a>(
        &'a self,
        parent_id: &str,
    ) -> impl Iterator<Item = &'a Arc<Record>> + 'a {
        self.by_trace.get(parent_id)
    }

    /// Connections joining `from` and `to`, in either orientation
    pub fn find_by_scope<'a>(
        &'a self,
        from: &str,
        to: &str,
    ) -> impl Iterator<Item = &'a Arc<Record>> + 'a {
        self.by_scope.get(&ScopeKey::new(from, to))
    }

    /// Records whose display name is exactly `name`
    pub fn find_by_long_name<'a>(
        &'a self,
        name: &str,
    ) -> impl Iterator<Item = &'a Arc<Record>> + 'a {
        self.by_long_name.get(name)
    }

    /// Records holding a reference to `id`
    pub fn find_reverse<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Arc<Record>> + 'a {
        self.references.find(id)
    }

    /// Records of `record_type` holding a reference to `id`
    pub fn find_reverse_typed<'a>(
        &'a self,
        id: &str,
        record_type: RecordType,
    ) -> impl Iterator<Item = &'a Arc<Record>> + 'a {
        self.references.find_typed(id, record_type)
    }

    /// Every record in unspecified order
    pub fn stream(&self) -> impl Iterator<Item = &Arc<Record>> + '_ {
        self.records.iter()
    }

    /// Every record sorted by identifier
    pub fn sorted_records(&self) -> Vec<Arc<Record>> {
        let mut records: Vec<Arc<Record>> = self.records.iter().cloned().collect();
        records.sort_unstable_by(|a, b| a.id().cmp(b.id()));
        records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The primary identifier map
    pub fn identity_map(&self) -> &IdentityMap {
        &self.records
    }

    /// Whether both stores are the same value instance
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.records.ptr_eq(&other.records)
    }

    /// Whether every reference of `record` resolves in this store
    pub fn resolves(&self, record: &Record) -> bool {
        record.references().all(|(field, target)| {
            self.records
                .get(target)
                .is_some_and(|found| found.record_type() == field.target)
        })
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Store with `record` added or revised
    ///
    /// The receiver comes back unchanged when a reference does not resolve,
    /// when the identifier is held by a record of another type, or when an
    /// equal record is already stored.
    pub fn add(&self, record: impl Into<Arc<Record>>) -> Self {
        let record = record.into();

        if !self.resolves(&record) {
            trace!(
                target: "modelbase::store",
                id = record.id(),
                record_type = %record.record_type(),
                "Rejected record with unresolved reference"
            );
            return self.clone();
        }

        let old = self.records.get(record.id());
        if let Some(old) = old {
            if old.record_type() != record.record_type() {
                trace!(
                    target: "modelbase::store",
                    id = record.id(),
                    stored = %old.record_type(),
                    offered = %record.record_type(),
                    "Rejected record changing type"
                );
                return self.clone();
            }
            if **old == *record {
                return self.clone();
            }
        }
        let old = old.map(|r| r.as_ref());

        RecordStore {
            records: self.records.put(Arc::clone(&record)),
            by_type: self.by_type.replace(old, &record),
            by_trace: self.by_trace.replace(old, &record),
            by_scope: self.by_scope.replace(old, &record),
            by_long_name: self.by_long_name.replace(old, &record),
            references: self.references.replace(old, &record),
        }
    }

    /// Store without `id` and everything that depends on it
    pub fn remove(&self, id: &str) -> Self {
        self.remove_all([id])
    }

    /// Store without `ids` and everything that depends on them
    ///
    /// Identifiers that are not stored are ignored; if none are, the receiver
    /// comes back unchanged.
    pub fn remove_all<'a, I>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut doomed: IdSet = ids
            .into_iter()
            .filter(|id| self.records.contains(id))
            .map(str::to_string)
            .collect();
        if doomed.is_empty() {
            return self.clone();
        }

        let requested = doomed.len();
        self.references.cascade(&mut doomed);
        if doomed.len() > requested {
            debug!(
                target: "modelbase::store",
                requested,
                cascaded = doomed.len() - requested,
                "Cascading removal"
            );
        }

        let removed: Vec<Arc<Record>> = doomed
            .iter()
            .filter_map(|id| self.records.get(id))
            .cloned()
            .collect();
        self.without(&removed)
    }

    fn without(&self, removed: &[Arc<Record>]) -> Self {
        RecordStore {
            records: self.records.remove_all(removed.iter().map(|r| r.id())),
            by_type: self.by_type.remove_records(removed),
            by_trace: self.by_trace.remove_records(removed),
            by_scope: self.by_scope.remove_records(removed),
            by_long_name: self.by_long_name.remove_records(removed),
            references: self.references.remove_all(removed),
        }
    }

    /// Coalesce `records` into one, keeping every link intact
    ///
    /// Folds left to right: each step merges the running record with the
    /// next one using `merge_fn`, stores the result, points every reference
    /// to a superseded source at the merged identifier (stamped with `now`)
    /// and then removes the superseded source. A step whose merged record
    /// cannot be stored is skipped.
    pub fn merge_records<I, F>(&self, now: Timestamp, records: I, mut merge_fn: F) -> Self
    where
        I: IntoIterator<Item = Arc<Record>>,
        F: FnMut(&Record, &Record) -> Record,
    {
        let mut records = records.into_iter();
        let Some(mut running) = records.next() else {
            return self.clone();
        };
        let mut store = self.clone();

        for next in records {
            let merged = Arc::new(merge_fn(&running, &next));
            let candidate = store.add(Arc::clone(&merged));
            if candidate.get_any_type(merged.id()) != Some(&merged) {
                debug!(
                    target: "modelbase::store",
                    id = merged.id(),
                    "Skipped merge step with unstorable result"
                );
                continue;
            }
            store = candidate;

            for source in [running.id(), next.id()] {
                if source == merged.id() {
                    continue;
                }
                store = store.redirect(source, merged.id(), now).remove(source);
            }
            running = merged;
        }
        store
    }

    /// Point every reference to `from` at `to`
    fn redirect(&self, from: &str, to: &str, now: Timestamp) -> Self {
        let referrers: Vec<Arc<Record>> = self.references.find(from).cloned().collect();
        if !referrers.is_empty() {
            debug!(
                target: "modelbase::store",
                from,
                to,
                referrers = referrers.len(),
                "Redirecting references"
            );
        }
        referrers.iter().fold(self.clone(), |store, referrer| {
            match referrer.redirect_references(from, to, now) {
                Some(redirected) => store.add(redirected),
                None => store,
            }
        })
    }
}

impl PartialEq for RecordStore {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl Eq for RecordStore {}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("records", &self.records)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> Record {
        Record::with_id(id, RecordType::Item)
    }

    fn ids<'a>(records: impl Iterator<Item = &'a Arc<Record>>) -> Vec<String> {
        let mut ids: Vec<String> = records.map(|r| r.id().to_string()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_add_single_item() {
        let store = RecordStore::empty().add(item("I1"));
        assert_eq!(store.len(), 1);
        assert_eq!(ids(store.find_by_type(RecordType::Item)), vec!["I1"]);
        assert!(store.get("I1", RecordType::Item).is_some());
        assert!(store.get("I1", RecordType::Function).is_none());
    }

    #[test]
    fn test_add_is_idempotent() {
        let record = Arc::new(item("I1").with_field("longName", "Hull"));
        let once = RecordStore::empty().add(Arc::clone(&record));
        let twice = once.add(record);
        assert!(twice.ptr_eq(&once));
        assert_eq!(twice, once);
    }

    #[test]
    fn test_add_rejects_unresolved_reference() {
        let store = RecordStore::empty().add(item("I1"));
        let orphan = item("I2").with_field("container", "I9");
        assert!(store.add(orphan).ptr_eq(&store));
    }

    #[test]
    fn test_add_rejects_wrong_target_type() {
        let store = RecordStore::empty()
            .add(item("I1"))
            .add(Record::with_id("FN1", RecordType::Function));
        // A function's container must be a function
        let misplaced = Record::with_id("FN2", RecordType::Function).with_field("container", "I1");
        assert!(store.add(misplaced).ptr_eq(&store));
    }

    #[test]
    fn test_add_rejects_type_change() {
        let store = RecordStore::empty().add(item("X"));
        let retyped = Record::with_id("X", RecordType::Budget);
        assert!(store.add(retyped).ptr_eq(&store));
    }

    #[test]
    fn test_revision_moves_secondary_keys() {
        let store = RecordStore::empty()
            .add(item("I1"))
            .add(item("I2"))
            .add(item("I3").with_field("container", "I1").with_field("longName", "Pump"));

        let moved = store
            .get_any_type("I3")
            .map(|r| (**r).clone().with_field("container", "I2").with_field("longName", "Valve"))
            .unwrap();
        let store = store.add(moved);

        assert_eq!(store.find_reverse("I1").count(), 0);
        assert_eq!(ids(store.find_reverse("I2")), vec!["I3"]);
        assert_eq!(store.find_by_long_name("Pump").count(), 0);
        assert_eq!(ids(store.find_by_long_name("Valve")), vec!["I3"]);
    }

    #[test]
    fn test_remove_cascades_through_chain() {
        let store = RecordStore::empty()
            .add(item("A"))
            .add(item("B").with_field("container", "A"))
            .add(item("C").with_field("container", "B"))
            .add(item("D"));

        let store = store.remove("A");
        assert_eq!(ids(store.stream()), vec!["D"]);
        assert_eq!(store.find_reverse("B").count(), 0);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let store = RecordStore::empty().add(item("I1"));
        assert!(store.remove("I9").ptr_eq(&store));
    }

    #[test]
    fn test_remove_everything_collapses_to_empty() {
        let store = RecordStore::empty().add(item("I1")).add(item("I2"));
        let emptied = store.remove_all(["I1", "I2"]);
        assert!(emptied.ptr_eq(&RecordStore::empty()));
    }

    #[test]
    fn test_scope_lookup_in_both_directions() {
        let store = RecordStore::empty()
            .add(item("I1"))
            .add(item("I2"))
            .add(
                Record::with_id("X1", RecordType::Interface)
                    .with_field("left", "I1")
                    .with_field("right", "I2"),
            );
        assert_eq!(ids(store.find_by_scope("I1", "I2")), vec!["X1"]);
        assert_eq!(ids(store.find_by_scope("I2", "I1")), vec!["X1"]);
        assert_eq!(store.find_by_scope("I1", "I1").count(), 0);
    }

    #[test]
    fn test_load_reports_pruned() {
        let loaded = RecordStore::load([
            Arc::new(item("I1")),
            Arc::new(item("I2").with_field("container", "GONE")),
            Arc::new(item("I3").with_field("container", "I2")),
        ]);
        let pruned: Vec<&str> = loaded.pruned.iter().map(String::as_str).collect();
        assert_eq!(pruned, vec!["I2", "I3"]);
        assert_eq!(ids(loaded.store.stream()), vec!["I1"]);
        assert_eq!(loaded.store.find_reverse("I2").count(), 0);
    }

    #[test]
    fn test_parallel_load_matches_sequential() {
        let records: Vec<Arc<Record>> = (0..64)
            .map(|i| {
                let record =
                    item(&format!("I{i:02}")).with_field("longName", format!("N{}", i % 4));
                Arc::new(record)
            })
            .collect();
        let sequential = RecordStore::load_with_threshold(records.clone(), usize::MAX).store;
        let parallel = RecordStore::load_with_threshold(records, 0).store;
        assert_eq!(sequential, parallel);
        assert_eq!(
            ids(sequential.find_by_long_name("N1")),
            ids(parallel.find_by_long_name("N1"))
        );
    }

    #[test]
    fn test_merge_records_redirects_references() {
        let power =
            |id: &str| Record::with_id(id, RecordType::FlowType).with_field("longName", "Power");
        let store = RecordStore::empty()
            .add(item("I1"))
            .add(Record::with_id("FN1", RecordType::Function))
            .add(Record::with_id("FN2", RecordType::Function))
            .add(power("T1"))
            .add(power("T2"))
            .add(
                Record::with_id("F1", RecordType::Flow)
                    .with_field("left", "FN1")
                    .with_field("right", "FN2")
                    .with_field("subtype", "T1"),
            )
            .add(
                Record::with_id("F2", RecordType::Flow)
                    .with_field("left", "FN2")
                    .with_field("right", "FN1")
                    .with_field("subtype", "T2"),
            );

        let mut sources: Vec<Arc<Record>> = store.find_by_long_name("Power").cloned().collect();
        sources.sort_by(|a, b| a.id().cmp(b.id()));
        let now = Timestamp::tick();
        let merged = store.merge_records(now, sources, |keep, _| keep.clone());

        assert_eq!(ids(merged.find_by_type(RecordType::FlowType)), vec!["T1"]);
        assert_eq!(ids(merged.find_reverse("T1")), vec!["F1", "F2"]);
        let f2 = merged.get("F2", RecordType::Flow).unwrap();
        assert_eq!(f2.subtype(), Some("T1"));
        assert_eq!(f2.revision(), now);
    }

    #[test]
    fn test_merge_records_single_is_noop() {
        let store = RecordStore::empty().add(item("I1"));
        let only = Arc::clone(store.get_any_type("I1").unwrap());
        let merged = store.merge_records(Timestamp::tick(), [only], |a, _| a.clone());
        assert!(merged.ptr_eq(&store));
    }
}
