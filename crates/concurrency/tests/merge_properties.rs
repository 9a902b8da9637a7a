//! Property tests for the three-way record merge
//!
//! - Independent changes commute: swapping left and right gives the same record
//! - Every independent change survives the merge
//! - A side equal to the ancestor yields the other side unchanged
//! - Conflicting changes always resolve to the newer side's value

use std::sync::Arc;

use modelbase_concurrency::{merge_record, merge_streams};
use modelbase_core::{Record, RecordType, Timestamp};
use proptest::prelude::*;

const FIELDS: [&str; 6] = ["longName", "mass", "power", "notes", "owner", "status"];

/// Per-field edit: who touches it and what they set (empty clears)
#[derive(Debug, Clone)]
enum Edit {
    Neither,
    Left(String),
    Right(String),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    let value = prop_oneof![Just(String::new()), "[a-z]{1,4}"];
    prop_oneof![
        Just(Edit::Neither),
        value.clone().prop_map(Edit::Left),
        value.prop_map(Edit::Right),
    ]
}

fn record(fields: &[(usize, String)], revision: u64) -> Arc<Record> {
    let record = fields
        .iter()
        .fold(Record::with_id("I1", RecordType::Item), |r, (i, v)| {
            r.with_field(FIELDS[*i], v.as_str())
        });
    Arc::new(record.with_revision(Timestamp::from_micros(revision)))
}

fn sides(
    base: &[String],
    edits: &[Edit],
    left_rev: u64,
    right_rev: u64,
) -> (Arc<Record>, Arc<Record>, Arc<Record>) {
    let ancestor: Vec<(usize, String)> = base.iter().cloned().enumerate().collect();
    let mut left = ancestor.clone();
    let mut right = ancestor.clone();
    for (i, edit) in edits.iter().enumerate() {
        match edit {
            Edit::Neither => {}
            Edit::Left(v) => left[i].1 = v.clone(),
            Edit::Right(v) => right[i].1 = v.clone(),
        }
    }
    (record(&ancestor, 1), record(&left, left_rev), record(&right, right_rev))
}

proptest! {
    #[test]
    fn property_independent_changes_commute(
        base in proptest::collection::vec("[a-z]{0,3}", FIELDS.len()),
        edits in proptest::collection::vec(edit_strategy(), FIELDS.len()),
        left_rev in 2u64..6,
        right_rev in 2u64..6,
    ) {
        let (ancestor, left, right) = sides(&base, &edits, left_rev, right_rev);
        let now = Timestamp::from_micros(100);

        let forward = merge_record(Some(&ancestor), Some(&left), Some(&right), now);
        let backward = merge_record(Some(&ancestor), Some(&right), Some(&left), now);
        prop_assert_eq!(&forward.record, &backward.record);

        let merged = forward.record.unwrap();
        for (i, edit) in edits.iter().enumerate() {
            let expected = match edit {
                Edit::Neither => base[i].as_str(),
                Edit::Left(v) | Edit::Right(v) => v.as_str(),
            };
            let expected = if expected.is_empty() { None } else { Some(expected) };
            prop_assert_eq!(merged.field(FIELDS[i]), expected);
        }
        prop_assert!(forward.conflicts.is_empty());
    }

    #[test]
    fn property_unchanged_side_yields_other(
        base in proptest::collection::vec("[a-z]{0,3}", FIELDS.len()),
        edits in proptest::collection::vec(edit_strategy(), FIELDS.len()),
    ) {
        let (ancestor, _, right) = sides(&base, &edits, 2, 3);
        let now = Timestamp::from_micros(100);
        let merged = merge_record(Some(&ancestor), Some(&ancestor), Some(&right), now);
        prop_assert_eq!(merged.record, Some(right));
    }

    #[test]
    fn property_conflicts_resolve_to_newer(
        left_value in "[a-z]{1,4}",
        right_value in "[A-Z]{1,4}",
        left_rev in 2u64..10,
        right_rev in 2u64..10,
    ) {
        prop_assume!(left_rev != right_rev);
        let ancestor = record(&[(1, "0".to_string())], 1);
        let left = record(&[(1, left_value.clone())], left_rev);
        let right = record(&[(1, right_value.clone())], right_rev);

        let merged = merge_record(
            Some(&ancestor),
            Some(&left),
            Some(&right),
            Timestamp::from_micros(50),
        );
        let expected = if left_rev > right_rev { &left_value } else { &right_value };
        prop_assert_eq!(merged.record.as_ref().unwrap().field("mass"), Some(expected.as_str()));
        prop_assert_eq!(merged.conflicts.len(), 1);
    }
}

#[test]
fn test_budget_amount_scenarios() {
    let amount = |value: &str, revision: u64| {
        Arc::new(
            Record::with_id("IB1", RecordType::ItemBudget)
                .with_field("amount", value)
                .with_revision(Timestamp::from_micros(revision)),
        )
    };
    let now = Timestamp::from_micros(99);

    // Only left changed
    let merged = merge_streams(
        [amount("10", 1)],
        [amount("20", 2)],
        [amount("10", 1)],
        now,
    );
    assert_eq!(merged.records[0].field("amount"), Some("20"));

    // Both changed, left newer
    let merged = merge_streams(
        [amount("10", 1)],
        [amount("20", 3)],
        [amount("30", 2)],
        now,
    );
    assert_eq!(merged.records[0].field("amount"), Some("20"));
    assert_eq!(merged.conflicts.len(), 1);
}
