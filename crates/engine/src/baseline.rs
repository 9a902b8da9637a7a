//! Parent/child baseline pairs
//!
//! A model is decomposed into a functional "parent" baseline (why) and an
//! allocated "child" baseline (how). Child records link to their parent
//! counterpart through the `trace` field; the pair resolves those links and
//! answers the questions the consistency layer asks about them.
//!
//! Both stores are immutable values, so a pair is too. Setters return a new
//! pair, or a clone sharing both stores when nothing changed.

use std::sync::Arc;

use modelbase_core::{Record, RecordType};
use modelbase_storage::RecordStore;

use crate::diff::DiffPair;

/// Parent and child store of one model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaselinePair {
    parent: RecordStore,
    child: RecordStore,
}

impl BaselinePair {
    /// Pair two stores
    pub fn new(parent: RecordStore, child: RecordStore) -> Self {
        BaselinePair { parent, child }
    }

    /// Two empty baselines
    pub fn empty() -> Self {
        Self::default()
    }

    /// The functional baseline
    pub fn parent(&self) -> &RecordStore {
        &self.parent
    }

    /// The allocated baseline
    pub fn child(&self) -> &RecordStore {
        &self.child
    }

    /// Pair with `parent` replaced; the same stores if it is equal
    pub fn set_parent(&self, parent: RecordStore) -> Self {
        if parent == self.parent {
            return self.clone();
        }
        BaselinePair {
            parent,
            child: self.child.clone(),
        }
    }

    /// Pair with `child` replaced; the same stores if it is equal
    pub fn set_child(&self, child: RecordStore) -> Self {
        if child == self.child {
            return self.clone();
        }
        BaselinePair {
            parent: self.parent.clone(),
            child,
        }
    }

    /// Pair with `f` applied to the parent
    pub fn update_parent<F>(&self, f: F) -> Self
    where
        F: FnOnce(&RecordStore) -> RecordStore,
    {
        self.set_parent(f(&self.parent))
    }

    /// Pair with `f` applied to the child
    pub fn update_child<F>(&self, f: F) -> Self
    where
        F: FnOnce(&RecordStore) -> RecordStore,
    {
        self.set_child(f(&self.child))
    }

    /// Whether both pairs hold the same store instances
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.parent.ptr_eq(&other.parent) && self.child.ptr_eq(&other.child)
    }

    /// Parent counterpart of a child record
    ///
    /// The counterpart must have the same type as `child_record`; a trace to
    /// a missing record or one of another type resolves to `None`.
    pub fn get_trace(&self, child_record: &Record) -> Option<&Arc<Record>> {
        let trace = child_record.trace()?;
        self.parent.get(trace, child_record.record_type())
    }

    /// Child records tracing to `parent_id`
    pub fn find_traced_children<'a>(
        &'a self,
        parent_id: &str,
    ) -> impl Iterator<Item = &'a Arc<Record>> + 'a {
        self.child.find_by_trace(parent_id)
    }

    /// Child records of `record_type` with no resolvable parent counterpart
    pub fn untraced_children(
        &self,
        record_type: RecordType,
    ) -> impl Iterator<Item = &Arc<Record>> + '_ {
        self.child
            .find_by_type(record_type)
            .filter(move |record| self.get_trace(record).is_none())
    }

    /// Parent records of `record_type` no child record traces to
    pub fn unallocated_parents(
        &self,
        record_type: RecordType,
    ) -> impl Iterator<Item = &Arc<Record>> + '_ {
        self.parent.find_by_type(record_type).filter(move |record| {
            self.child
                .find_by_trace(record.id())
                .all(|child| child.record_type() != record_type)
        })
    }

    /// Diff of the parent baseline against an earlier pair
    pub fn diff_parent(&self, was: Option<&BaselinePair>) -> DiffPair {
        DiffPair::new(was.map(|pair| pair.parent.clone()), self.parent.clone())
    }

    /// Diff of the child baseline against an earlier pair
    pub fn diff_child(&self, was: Option<&BaselinePair>) -> DiffPair {
        DiffPair::new(was.map(|pair| pair.child.clone()), self.child.clone())
    }
}
