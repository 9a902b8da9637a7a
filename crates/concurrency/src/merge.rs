//! Three-way merge of values and records
//!
//! [`merge`] is the generic rule every level builds on: a side that still
//! equals the ancestor yields to the other side, converged sides agree, and
//! only a genuine divergence reaches the resolver.
//!
//! [`merge_record`] applies it to optional records. Presence is merged first
//! (added, deleted, absent everywhere); two present, diverged records are
//! merged field by field over the union of their field names. The record with
//! the newer revision is the default, its values win field conflicts, and the
//! result is stamped with the merge time.

use std::collections::BTreeSet;
use std::sync::Arc;

use modelbase_core::{FieldMap, Record, Timestamp};
use tracing::debug;

use crate::conflict::{Conflict, Side};

/// Three-way merge with a two-argument conflict resolver
///
/// - `ancestor == left`: only right changed, returns right
/// - `ancestor == right`: only left changed, returns left
/// - `left == right`: both converged, returns left
/// - otherwise returns `resolve(left, right)`
pub fn merge<T, F>(ancestor: &T, left: &T, right: &T, resolve: F) -> T
where
    T: PartialEq + Clone,
    F: FnOnce(&T, &T) -> T,
{
    merge_with_ancestor(ancestor, left, right, |_, l, r| resolve(l, r))
}

/// Three-way merge whose resolver also sees the ancestor
pub fn merge_with_ancestor<T, F>(ancestor: &T, left: &T, right: &T, resolve: F) -> T
where
    T: PartialEq + Clone,
    F: FnOnce(&T, &T, &T) -> T,
{
    if ancestor == left {
        right.clone()
    } else if ancestor == right || left == right {
        left.clone()
    } else {
        resolve(ancestor, left, right)
    }
}

/// Outcome of merging one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMerge {
    /// Merged record, `None` if the record is gone
    pub record: Option<Arc<Record>>,
    /// Divergences resolved along the way
    pub conflicts: Vec<Conflict>,
}

impl RecordMerge {
    fn clean(record: Option<&Arc<Record>>) -> Self {
        RecordMerge {
            record: record.cloned(),
            conflicts: Vec::new(),
        }
    }

    /// Whether the merge needed no resolution
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// The side whose record counts as newer
///
/// Later revision wins. On equal revisions the record whose field map sorts
/// greater wins, so the choice does not depend on argument order.
pub fn newer_side(left: &Record, right: &Record) -> Side {
    match left.revision().cmp(&right.revision()) {
        std::cmp::Ordering::Greater => Side::Left,
        std::cmp::Ordering::Less => Side::Right,
        std::cmp::Ordering::Equal => {
            if right.fields() > left.fields() {
                Side::Right
            } else {
                Side::Left
            }
        }
    }
}

/// Three-way merge of one record identifier
///
/// A record deleted on one side and changed on the other is kept and
/// reported as [`Conflict::DeleteModify`].
pub fn merge_record(
    ancestor: Option<&Arc<Record>>,
    left: Option<&Arc<Record>>,
    right: Option<&Arc<Record>>,
    now: Timestamp,
) -> RecordMerge {
    if ancestor == left {
        return RecordMerge::clean(right);
    }
    if ancestor == right || left == right {
        return RecordMerge::clean(left);
    }

    match (left, right) {
        (Some(left), Some(right)) => merge_fields(ancestor.map(|a| a.as_ref()), left, right, now),
        (Some(kept), None) | (None, Some(kept)) => {
            debug!(
                target: "modelbase::merge",
                id = kept.id(),
                "Kept record deleted on one side and changed on the other"
            );
            RecordMerge {
                record: Some(Arc::clone(kept)),
                conflicts: vec![Conflict::DeleteModify {
                    id: kept.id().to_string(),
                }],
            }
        }
        (None, None) => RecordMerge::clean(None),
    }
}

fn merge_fields(
    ancestor: Option<&Record>,
    left: &Record,
    right: &Record,
    now: Timestamp,
) -> RecordMerge {
    let newer = newer_side(left, right);
    let default = match newer {
        Side::Left => left,
        Side::Right => right,
    };

    let names: BTreeSet<&str> = left
        .fields()
        .keys()
        .chain(right.fields().keys())
        .map(String::as_str)
        .collect();

    let mut fields = FieldMap::new();
    let mut conflicts = Vec::new();
    for name in names {
        let base = ancestor.and_then(|a| a.field(name));
        let value = merge(&base, &left.field(name), &right.field(name), |l, r| {
            conflicts.push(Conflict::Field {
                id: default.id().to_string(),
                field: name.to_string(),
            });
            match newer {
                Side::Left => *l,
                Side::Right => *r,
            }
        });
        if let Some(value) = value {
            fields.insert(name.to_string(), value.to_string());
        }
    }

    if !conflicts.is_empty() {
        debug!(
            target: "modelbase::merge",
            id = default.id(),
            fields = conflicts.len(),
            winner = ?newer,
            "Resolved field conflicts in favour of newer revision"
        );
    }

    let merged = default.clone().with_fields(fields).with_revision(now);
    RecordMerge {
        record: Some(Arc::new(merged)),
        conflicts,
    }
}
