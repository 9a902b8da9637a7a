//! Three-way merge of whole stores and baseline pairs
//!
//! The merge runs in three steps:
//! 1. Shortcut: a side equal to the ancestor yields the other side
//! 2. Walk: the sorted record sets of all three stores go through the linear
//!    merge walk, which resolves every record
//! 3. Reload: the merged records are loaded into a fresh store, pruning any
//!    record whose references no longer resolve (for example a flow added on
//!    one side whose function was deleted on the other)
//!
//! Pruned identifiers are part of the result and logged as a warning; the
//! caller surfaces them to the user.

use std::collections::BTreeSet;

use modelbase_concurrency::{merge_streams, Conflict};
use modelbase_core::Timestamp;
use modelbase_storage::RecordStore;
use tracing::{info, warn};

use crate::baseline::BaselinePair;

/// Result of merging three stores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreMerge {
    /// The merged store
    pub store: RecordStore,
    /// Identifiers dropped to restore referential integrity
    pub pruned: BTreeSet<String>,
    /// Divergences resolved in favour of the newer revision
    pub conflicts: Vec<Conflict>,
}

impl StoreMerge {
    fn trivial(store: &RecordStore) -> Self {
        StoreMerge {
            store: store.clone(),
            pruned: BTreeSet::new(),
            conflicts: Vec::new(),
        }
    }

    /// Whether the merge needed neither resolution nor pruning
    pub fn is_clean(&self) -> bool {
        self.pruned.is_empty() && self.conflicts.is_empty()
    }
}

/// Merge two diverged copies of a store
///
/// Records produced by field-level resolution carry `now` as their revision.
pub fn merge_stores(
    ancestor: &RecordStore,
    left: &RecordStore,
    right: &RecordStore,
    now: Timestamp,
) -> StoreMerge {
    if ancestor == left {
        return StoreMerge::trivial(right);
    }
    if ancestor == right || left == right {
        return StoreMerge::trivial(left);
    }

    let walked = merge_streams(
        ancestor.sorted_records(),
        left.sorted_records(),
        right.sorted_records(),
        now,
    );
    let loaded = RecordStore::load(walked.records);

    if !loaded.pruned.is_empty() {
        warn!(
            target: "modelbase::merge",
            count = loaded.pruned.len(),
            ids = ?loaded.pruned,
            "Merge removed records whose references no longer resolve"
        );
    }
    info!(
        target: "modelbase::merge",
        records = loaded.store.len(),
        conflicts = walked.conflicts.len(),
        pruned = loaded.pruned.len(),
        "Stores merged"
    );

    StoreMerge {
        store: loaded.store,
        pruned: loaded.pruned,
        conflicts: walked.conflicts,
    }
}

/// Result of merging three baseline pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairMerge {
    /// Merge of the parent baselines
    pub parent: StoreMerge,
    /// Merge of the child baselines
    pub child: StoreMerge,
}

impl PairMerge {
    /// The merged pair
    pub fn pair(&self) -> BaselinePair {
        BaselinePair::new(self.parent.store.clone(), self.child.store.clone())
    }

    /// Every pruned identifier across both baselines
    pub fn pruned(&self) -> BTreeSet<String> {
        self.parent
            .pruned
            .union(&self.child.pruned)
            .cloned()
            .collect()
    }
}

/// Merge two diverged copies of a baseline pair, one baseline at a time
pub fn merge_pairs(
    ancestor: &BaselinePair,
    left: &BaselinePair,
    right: &BaselinePair,
    now: Timestamp,
) -> PairMerge {
    PairMerge {
        parent: merge_stores(ancestor.parent(), left.parent(), right.parent(), now),
        child: merge_stores(ancestor.child(), left.child(), right.child(), now),
    }
}
