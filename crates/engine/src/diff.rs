//! Before/after comparison of one baseline
//!
//! A [`DiffPair`] holds an optional historical store ("was") and the current
//! store ("is"). Classification looks only at presence and equality of the
//! record under an identifier in each store:
//!
//! | was     | is      | kind        |
//! |---------|---------|-------------|
//! | absent  | present | `Added`     |
//! | present | absent  | `Deleted`   |
//! | present | present, unequal | `Changed` |
//! | otherwise |       | `Unchanged` |
//!
//! Without a "was" store there is nothing to compare against and every
//! identifier is `Unchanged`.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use modelbase_core::{Record, RecordType};
use modelbase_storage::RecordStore;

/// Classification of one identifier across a diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Only in the current store
    Added,
    /// Only in the historical store
    Deleted,
    /// In both, with different values
    Changed,
    /// Equal in both, absent from both, or no history to compare
    Unchanged,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::Added => "added",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Changed => "changed",
            ChangeKind::Unchanged => "unchanged",
        };
        f.write_str(name)
    }
}

/// One differing record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Record identifier
    pub id: String,
    /// How it differs
    pub kind: ChangeKind,
    /// Record in the historical store
    pub was: Option<Arc<Record>>,
    /// Record in the current store
    pub is: Option<Arc<Record>>,
}

impl Change {
    /// Type of whichever side is present
    pub fn record_type(&self) -> Option<RecordType> {
        self.is
            .as_ref()
            .or(self.was.as_ref())
            .map(|record| record.record_type())
    }
}

/// Counts of a diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Records only in the current store
    pub total_added: usize,
    /// Records only in the historical store
    pub total_deleted: usize,
    /// Records present in both with different values
    pub total_changed: usize,
}

impl DiffSummary {
    /// Whether the diff found anything
    pub fn has_changes(&self) -> bool {
        self.total_added + self.total_deleted + self.total_changed > 0
    }
}

/// Historical and current value of one baseline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPair {
    was: Option<RecordStore>,
    is: RecordStore,
}

impl DiffPair {
    /// Compare `is` against `was`
    pub fn new(was: Option<RecordStore>, is: RecordStore) -> Self {
        DiffPair { was, is }
    }

    /// The historical store, if any
    pub fn was(&self) -> Option<&RecordStore> {
        self.was.as_ref()
    }

    /// The current store
    pub fn is(&self) -> &RecordStore {
        &self.is
    }

    /// Classify one identifier
    pub fn classify(&self, id: &str) -> ChangeKind {
        let Some(was) = &self.was else {
            return ChangeKind::Unchanged;
        };
        match (was.get_any_type(id), self.is.get_any_type(id)) {
            (None, Some(_)) => ChangeKind::Added,
            (Some(_), None) => ChangeKind::Deleted,
            (Some(before), Some(after)) if before != after => ChangeKind::Changed,
            _ => ChangeKind::Unchanged,
        }
    }

    /// Every identifier that is not `Unchanged`, sorted by identifier
    pub fn changes(&self) -> Vec<Change> {
        let Some(was) = &self.was else {
            return Vec::new();
        };
        if was.ptr_eq(&self.is) {
            return Vec::new();
        }

        let ids: BTreeSet<&str> = was
            .stream()
            .chain(self.is.stream())
            .map(|record| record.id())
            .collect();

        ids.into_iter()
            .filter_map(|id| {
                let kind = self.classify(id);
                (kind != ChangeKind::Unchanged).then(|| Change {
                    id: id.to_string(),
                    kind,
                    was: was.get_any_type(id).cloned(),
                    is: self.is.get_any_type(id).cloned(),
                })
            })
            .collect()
    }

    /// Counts of each kind of change
    pub fn summary(&self) -> DiffSummary {
        self.changes()
            .iter()
            .fold(DiffSummary::default(), |mut summary, change| {
                match change.kind {
                    ChangeKind::Added => summary.total_added += 1,
                    ChangeKind::Deleted => summary.total_deleted += 1,
                    ChangeKind::Changed => summary.total_changed += 1,
                    ChangeKind::Unchanged => {}
                }
                summary
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> Record {
        Record::with_id(id, RecordType::Item)
    }

    fn before() -> RecordStore {
        RecordStore::empty()
            .add(item("I1").with_field("longName", "Pump"))
            .add(item("I2"))
            .add(item("I3"))
    }

    #[test]
    fn test_classify_by_presence_and_equality() {
        let was = before();
        let renamed = was
            .get_any_type("I1")
            .map(|r| (**r).clone().with_field("longName", "Water pump"))
            .unwrap();
        let is = was.add(renamed).remove("I2").add(item("I4"));
        let diff = DiffPair::new(Some(was), is);

        assert_eq!(diff.classify("I1"), ChangeKind::Changed);
        assert_eq!(diff.classify("I2"), ChangeKind::Deleted);
        assert_eq!(diff.classify("I3"), ChangeKind::Unchanged);
        assert_eq!(diff.classify("I4"), ChangeKind::Added);
        assert_eq!(diff.classify("I9"), ChangeKind::Unchanged);
    }

    #[test]
    fn test_changes_and_summary() {
        let was = before();
        let is = was.remove("I3").add(item("I5"));
        let diff = DiffPair::new(Some(was), is);

        let changes: Vec<(String, ChangeKind)> = diff
            .changes()
            .into_iter()
            .map(|c| (c.id, c.kind))
            .collect();
        assert_eq!(
            changes,
            vec![
                ("I3".to_string(), ChangeKind::Deleted),
                ("I5".to_string(), ChangeKind::Added),
            ]
        );

        let summary = diff.summary();
        assert_eq!(summary.total_added, 1);
        assert_eq!(summary.total_deleted, 1);
        assert_eq!(summary.total_changed, 0);
        assert!(summary.has_changes());
    }

    #[test]
    fn test_no_history_means_no_changes() {
        let diff = DiffPair::new(None, before());
        assert_eq!(diff.classify("I1"), ChangeKind::Unchanged);
        assert!(diff.changes().is_empty());
        assert!(!diff.summary().has_changes());
    }

    #[test]
    fn test_change_record_type_from_either_side() {
        let was = before();
        let is = was.remove("I2");
        let diff = DiffPair::new(Some(was), is);
        let changes = diff.changes();
        assert_eq!(changes[0].record_type(), Some(RecordType::Item));
        assert!(changes[0].is.is_none());
    }
}
