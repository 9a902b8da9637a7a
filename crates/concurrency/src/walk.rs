//! Linear three-way merge over identifier-sorted record streams
//!
//! The walk keeps one cursor per input. Each step takes the smallest
//! identifier at any cursor and advances only the cursors positioned on that
//! identifier, so every input record is visited exactly once and the whole
//! merge is linear in the combined input length.
//!
//! All three inputs must be sorted by identifier with no duplicates.

use std::iter::Peekable;
use std::sync::Arc;

use modelbase_core::{Record, Timestamp};

use crate::conflict::Conflict;
use crate::merge::{merge_record, RecordMerge};

/// One identifier's worth of merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeStep {
    /// Identifier merged in this step
    pub id: String,
    /// Record from the ancestor stream, if present
    pub ancestor: Option<Arc<Record>>,
    /// Record from the left stream, if present
    pub left: Option<Arc<Record>>,
    /// Record from the right stream, if present
    pub right: Option<Arc<Record>>,
    /// Merge result for this identifier
    pub outcome: RecordMerge,
}

/// Lazy three-way merge over sorted streams
pub struct MergeWalk<A, L, R>
where
    A: Iterator<Item = Arc<Record>>,
    L: Iterator<Item = Arc<Record>>,
    R: Iterator<Item = Arc<Record>>,
{
    ancestor: Peekable<A>,
    left: Peekable<L>,
    right: Peekable<R>,
    now: Timestamp,
}

impl<A, L, R> MergeWalk<A, L, R>
where
    A: Iterator<Item = Arc<Record>>,
    L: Iterator<Item = Arc<Record>>,
    R: Iterator<Item = Arc<Record>>,
{
    /// Start a walk; merged records are stamped with `now`
    pub fn new<IA, IL, IR>(ancestor: IA, left: IL, right: IR, now: Timestamp) -> Self
    where
        IA: IntoIterator<IntoIter = A>,
        IL: IntoIterator<IntoIter = L>,
        IR: IntoIterator<IntoIter = R>,
    {
        MergeWalk {
            ancestor: ancestor.into_iter().peekable(),
            left: left.into_iter().peekable(),
            right: right.into_iter().peekable(),
            now,
        }
    }
}

fn take_if<I>(cursor: &mut Peekable<I>, id: &str) -> Option<Arc<Record>>
where
    I: Iterator<Item = Arc<Record>>,
{
    cursor.next_if(|record| record.id() == id)
}

impl<A, L, R> Iterator for MergeWalk<A, L, R>
where
    A: Iterator<Item = Arc<Record>>,
    L: Iterator<Item = Arc<Record>>,
    R: Iterator<Item = Arc<Record>>,
{
    type Item = MergeStep;

    fn next(&mut self) -> Option<MergeStep> {
        let id = [self.ancestor.peek(), self.left.peek(), self.right.peek()]
            .into_iter()
            .flatten()
            .map(|record| record.id())
            .min()?
            .to_string();

        let ancestor = take_if(&mut self.ancestor, &id);
        let left = take_if(&mut self.left, &id);
        let right = take_if(&mut self.right, &id);
        let outcome = merge_record(ancestor.as_ref(), left.as_ref(), right.as_ref(), self.now);

        Some(MergeStep {
            id,
            ancestor,
            left,
            right,
            outcome,
        })
    }
}

/// Collected result of a stream merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamMerge {
    /// Merged records, sorted by identifier
    pub records: Vec<Arc<Record>>,
    /// Every divergence resolved, in identifier order
    pub conflicts: Vec<Conflict>,
}

/// Merge three sorted record streams into one
pub fn merge_streams<A, L, R>(ancestor: A, left: L, right: R, now: Timestamp) -> StreamMerge
where
    A: IntoIterator<Item = Arc<Record>>,
    L: IntoIterator<Item = Arc<Record>>,
    R: IntoIterator<Item = Arc<Record>>,
{
    MergeWalk::new(ancestor, left, right, now).fold(StreamMerge::default(), |mut acc, step| {
        acc.records.extend(step.outcome.record);
        acc.conflicts.extend(step.outcome.conflicts);
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelbase_core::RecordType;

    fn rec(id: &str, name: &str, revision: u64) -> Arc<Record> {
        Arc::new(
            Record::with_id(id, RecordType::Item)
                .with_field("longName", name)
                .with_revision(Timestamp::from_micros(revision)),
        )
    }

    fn ids(records: &[Arc<Record>]) -> Vec<&str> {
        records.iter().map(|r| r.id()).collect()
    }

    #[test]
    fn test_walk_visits_each_identifier_once() {
        let a1 = rec("A", "a", 1);
        let b1 = rec("B", "b", 1);
        let c1 = rec("C", "c", 1);
        let ancestor = vec![Arc::clone(&a1), Arc::clone(&b1), Arc::clone(&c1)];
        // Left deletes B, right adds D
        let left = vec![Arc::clone(&a1), Arc::clone(&c1)];
        let right = vec![a1, b1, c1, rec("D", "d", 2)];

        let steps: Vec<MergeStep> =
            MergeWalk::new(ancestor, left, right, Timestamp::from_micros(5)).collect();
        let visited: Vec<&str> = steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(visited, vec!["A", "B", "C", "D"]);
        assert!(steps[1].outcome.record.is_none());
        assert!(steps[3].ancestor.is_none());
    }

    #[test]
    fn test_merge_streams_combines_sides() {
        let ancestor = vec![rec("A", "a", 1), rec("B", "b", 1)];
        let left = vec![rec("A", "a2", 2), rec("B", "b", 1)];
        let right = vec![rec("A", "a", 1), rec("B", "b3", 3), rec("C", "c", 3)];

        let merged = merge_streams(ancestor, left, right, Timestamp::from_micros(9));
        assert_eq!(ids(&merged.records), vec!["A", "B", "C"]);
        assert_eq!(merged.records[0].long_name(), Some("a2"));
        assert_eq!(merged.records[1].long_name(), Some("b3"));
        assert!(merged.conflicts.is_empty());
    }

    #[test]
    fn test_merge_streams_reports_conflicts() {
        let ancestor = vec![rec("A", "a", 1)];
        let left = vec![rec("A", "left", 3)];
        let right = vec![rec("A", "right", 2)];
        let merged = merge_streams(ancestor, left, right, Timestamp::from_micros(9));
        assert_eq!(merged.records[0].long_name(), Some("left"));
        assert_eq!(merged.conflicts.len(), 1);
        assert_eq!(merged.conflicts[0].id(), "A");
    }

    #[test]
    fn test_empty_streams() {
        let empty: Vec<Arc<Record>> = Vec::new();
        let merged = merge_streams(empty.clone(), empty.clone(), empty, Timestamp::EPOCH);
        assert_eq!(merged, StreamMerge::default());
    }
}
