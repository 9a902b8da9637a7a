//! Records: the atomic unit of model data
//!
//! A [`Record`] is an immutable value: an identifier, a table tag, a revision
//! timestamp and an ordered map of string fields. Builder methods consume the
//! record and return the next revision; the identifier and type never change.
//!
//! Empty field values are never stored. Setting a field to `""` removes it,
//! which keeps "absent" and "empty" indistinguishable for references, traces
//! and the three-way merge alike.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::record_type::{RecordType, ReferenceField};
use crate::timestamp::Timestamp;

/// Reserved field names shared with the serialization layer
pub mod fields {
    /// Record identifier (carried outside the field map in memory)
    pub const IDENTIFIER: &str = "identifier";
    /// Revision timestamp (carried outside the field map in memory)
    pub const REVISION: &str = "revision";
    /// Counterpart record in the other baseline of a pair
    pub const TRACE: &str = "trace";
    /// Display name
    pub const LONG_NAME: &str = "longName";
    /// `"true"` when the record is owned by another model
    pub const EXTERNAL: &str = "external";
    /// Enclosing record
    pub const CONTAINER: &str = "container";
    /// Item a function or budget share is allocated to
    pub const ITEM: &str = "item";
    /// First endpoint of a connection
    pub const LEFT: &str = "left";
    /// Second endpoint of a connection
    pub const RIGHT: &str = "right";
    /// Budget an item budget shares
    pub const BUDGET: &str = "budget";
    /// Related record such as a flow's type
    pub const SUBTYPE: &str = "subtype";

    /// Names that never appear in a record's field map
    pub(crate) fn is_envelope(name: &str) -> bool {
        name == IDENTIFIER || name == REVISION
    }
}

/// Ordered string-keyed field map
pub type FieldMap = BTreeMap<String, String>;

/// Immutable, typed, identifier-keyed unit of model data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    id: String,
    record_type: RecordType,
    revision: Timestamp,
    fields: FieldMap,
}

impl Record {
    /// Create a record with a fresh UUID v4 identifier
    pub fn new(record_type: RecordType) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), record_type)
    }

    /// Create a record with a caller-chosen identifier
    pub fn with_id(id: impl Into<String>, record_type: RecordType) -> Self {
        Record {
            id: id.into(),
            record_type,
            revision: Timestamp::tick(),
            fields: FieldMap::new(),
        }
    }

    /// Identifier, stable across revisions
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Table tag, fixed at creation
    #[inline]
    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    /// When this revision was produced
    #[inline]
    pub fn revision(&self) -> Timestamp {
        self.revision
    }

    /// All stored fields
    #[inline]
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Value of one field, `None` when absent
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Identifier of the counterpart in the other baseline
    pub fn trace(&self) -> Option<&str> {
        self.field(fields::TRACE)
    }

    /// Display name
    pub fn long_name(&self) -> Option<&str> {
        self.field(fields::LONG_NAME)
    }

    /// Related record, e.g. the flow type of a flow
    pub fn subtype(&self) -> Option<&str> {
        self.field(fields::SUBTYPE)
    }

    /// Whether the record is owned by another model
    pub fn is_external(&self) -> bool {
        self.field(fields::EXTERNAL) == Some("true")
    }

    /// Set a field, producing a new revision if the value changed
    ///
    /// An empty value removes the field. `identifier` and `revision` are not
    /// fields and are ignored here.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if fields::is_envelope(&name) {
            return self;
        }
        let changed = if value.is_empty() {
            self.fields.remove(&name).is_some()
        } else if self.fields.get(&name) == Some(&value) {
            false
        } else {
            self.fields.insert(name, value);
            true
        };
        if changed {
            self.revision = Timestamp::tick();
        }
        self
    }

    /// Remove a field, producing a new revision if it was present
    pub fn without_field(self, name: &str) -> Self {
        self.with_field(name, "")
    }

    /// Set or clear the `external` flag
    pub fn with_external(self, external: bool) -> Self {
        if external {
            self.with_field(fields::EXTERNAL, "true")
        } else {
            self.without_field(fields::EXTERNAL)
        }
    }

    /// Replace every field at once
    pub fn with_fields(mut self, fields: FieldMap) -> Self {
        let fields: FieldMap = fields
            .into_iter()
            .filter(|(name, value)| !value.is_empty() && !fields::is_envelope(name))
            .collect();
        if fields != self.fields {
            self.fields = fields;
            self.revision = Timestamp::tick();
        }
        self
    }

    /// Pin the revision timestamp
    ///
    /// Used when replaying stored data and by the merge, which tags merged
    /// records with the merge time.
    pub fn with_revision(mut self, revision: Timestamp) -> Self {
        self.revision = revision;
        self
    }

    /// Every populated reference field with the identifier it names
    pub fn references(&self) -> impl Iterator<Item = (ReferenceField, &str)> + '_ {
        self.record_type
            .references()
            .iter()
            .filter_map(move |r| self.field(r.name).map(|target| (*r, target)))
    }

    /// Whether any reference field names `target`
    pub fn references_target(&self, target: &str) -> bool {
        self.references().any(|(_, id)| id == target)
    }

    /// Point every reference to `from` at `to` instead
    ///
    /// Returns `None` if no reference field names `from`.
    pub fn redirect_references(&self, from: &str, to: &str, revision: Timestamp) -> Option<Record> {
        if !self.references_target(from) {
            return None;
        }
        let mut redirected = self.clone();
        for reference in self.record_type.references() {
            if let Some(value) = redirected.fields.get_mut(reference.name) {
                if value == from {
                    *value = to.to_string();
                }
            }
        }
        redirected.revision = revision;
        Some(redirected)
    }

    /// Flat field map for the serialization layer
    ///
    /// Includes the `identifier` and `revision` envelope entries.
    pub fn to_field_map(&self) -> FieldMap {
        let mut map = self.fields.clone();
        map.insert(fields::IDENTIFIER.to_string(), self.id.clone());
        map.insert(fields::REVISION.to_string(), self.revision.to_field_value());
        map
    }

    /// Decode a flat field map handed over by the serialization layer
    ///
    /// A missing `revision` entry decodes as [`Timestamp::EPOCH`]. Empty values
    /// are dropped.
    ///
    /// # Errors
    ///
    /// - `identifier` missing or empty
    /// - `revision` present but not a decimal microsecond count
    /// - identifier or field sizes beyond `limits`
    pub fn from_field_map(
        record_type: RecordType,
        mut map: FieldMap,
        limits: &Limits,
    ) -> Result<Record> {
        let id = map
            .remove(fields::IDENTIFIER)
            .filter(|id| !id.is_empty())
            .ok_or(Error::MissingIdentifier(record_type))?;
        limits.validate_identifier(&id)?;

        let revision = match map.remove(fields::REVISION) {
            Some(text) if !text.is_empty() => {
                Timestamp::parse(&text).ok_or_else(|| Error::InvalidRevision {
                    id: id.clone(),
                    value: text.clone(),
                })?
            }
            _ => Timestamp::EPOCH,
        };

        map.retain(|_, value| !value.is_empty());
        limits.validate_field_count(map.len())?;
        for (name, value) in &map {
            limits.validate_field(name, value)?;
        }

        Ok(Record {
            id,
            record_type,
            revision,
            fields: map,
        })
    }

    /// Decode a row of the named table
    ///
    /// # Errors
    ///
    /// As [`Record::from_field_map`], plus an unknown table name.
    pub fn from_table_row(table: &str, map: FieldMap, limits: &Limits) -> Result<Record> {
        let record_type = RecordType::from_name(table)
            .ok_or_else(|| Error::UnknownRecordType(table.to_string()))?;
        Self::from_field_map(record_type, map, limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_new_records_get_unique_ids() {
        let a = Record::new(RecordType::Item);
        let b = Record::new(RecordType::Item);
        assert_ne!(a.id(), b.id());
        assert!(Uuid::parse_str(a.id()).is_ok());
    }

    #[test]
    fn test_with_field_bumps_revision_only_on_change() {
        let item = Record::with_id("I1", RecordType::Item).with_field("longName", "Battery");
        let first = item.revision();

        let same = item.clone().with_field("longName", "Battery");
        assert_eq!(same, item);
        assert_eq!(same.revision(), first);

        let renamed = item.with_field("longName", "Battery Pack");
        assert!(renamed.revision().is_after(first));
        assert_eq!(renamed.long_name(), Some("Battery Pack"));
        assert_eq!(renamed.id(), "I1");
    }

    #[test]
    fn test_empty_value_removes_field() {
        let item = Record::with_id("I1", RecordType::Item).with_field("container", "I0");
        let cleared = item.with_field("container", "");
        assert_eq!(cleared.field("container"), None);
        assert!(cleared.fields().is_empty());
    }

    #[test]
    fn test_envelope_names_are_not_fields() {
        let item = Record::with_id("I1", RecordType::Item)
            .with_field("identifier", "other")
            .with_field("revision", "5");
        assert_eq!(item.id(), "I1");
        assert!(item.fields().is_empty());
    }

    #[test]
    fn test_external_flag() {
        let item = Record::with_id("I1", RecordType::Item).with_external(true);
        assert!(item.is_external());
        assert!(!item.with_external(false).is_external());
    }

    #[test]
    fn test_references_follow_schema() {
        let flow = Record::with_id("F1", RecordType::Flow)
            .with_field("container", "I1")
            .with_field("subtype", "T1")
            .with_field("longName", "Power");

        let refs: Vec<_> = flow.references().map(|(r, id)| (r.name, r.target, id)).collect();
        assert_eq!(
            refs,
            vec![
                ("container", RecordType::Item, "I1"),
                ("subtype", RecordType::FlowType, "T1"),
            ]
        );
        assert!(flow.references_target("T1"));
        assert!(!flow.references_target("Power"));
    }

    #[test]
    fn test_trace_is_not_a_reference() {
        let item = Record::with_id("I2", RecordType::Item).with_field("trace", "I1");
        assert_eq!(item.trace(), Some("I1"));
        assert_eq!(item.references().count(), 0);
    }

    #[test]
    fn test_redirect_references() {
        let flow = Record::with_id("F1", RecordType::Flow)
            .with_field("subtype", "T2")
            .with_field("longName", "T2");
        let now = Timestamp::from_micros(99);

        let redirected = flow.redirect_references("T2", "T1", now).unwrap();
        assert_eq!(redirected.subtype(), Some("T1"));
        // Non-reference fields keep their value even if it matches
        assert_eq!(redirected.long_name(), Some("T2"));
        assert_eq!(redirected.revision(), now);

        assert!(flow.redirect_references("T9", "T1", now).is_none());
    }

    #[test]
    fn test_field_map_round_trip() {
        let budget = Record::with_id("B1", RecordType::ItemBudget)
            .with_field("item", "I1")
            .with_field("amount", "10");
        let map = budget.to_field_map();
        assert_eq!(map.get("identifier").map(String::as_str), Some("B1"));

        let decoded =
            Record::from_field_map(RecordType::ItemBudget, map, &Limits::default()).unwrap();
        assert_eq!(decoded, budget);
    }

    #[test]
    fn test_from_field_map_defaults_revision_and_drops_empties() {
        let record = Record::from_field_map(
            RecordType::Item,
            row(&[("identifier", "I1"), ("container", ""), ("longName", "Hull")]),
            &Limits::default(),
        )
        .unwrap();
        assert_eq!(record.revision(), Timestamp::EPOCH);
        assert_eq!(record.field("container"), None);
        assert_eq!(record.long_name(), Some("Hull"));
    }

    #[test]
    fn test_from_field_map_errors() {
        let limits = Limits::default();
        assert!(matches!(
            Record::from_field_map(RecordType::Item, row(&[("longName", "x")]), &limits),
            Err(Error::MissingIdentifier(RecordType::Item))
        ));
        assert!(matches!(
            Record::from_field_map(
                RecordType::Item,
                row(&[("identifier", "I1"), ("revision", "later")]),
                &limits
            ),
            Err(Error::InvalidRevision { .. })
        ));
        assert!(matches!(
            Record::from_field_map(
                RecordType::Item,
                row(&[("identifier", "I1"), ("notes", &"n".repeat(64))]),
                &Limits::with_small_limits()
            ),
            Err(Error::LimitExceeded(_))
        ));
        assert!(matches!(
            Record::from_table_row("Widget", row(&[("identifier", "W1")]), &limits),
            Err(Error::UnknownRecordType(name)) if name == "Widget"
        ));
    }
}
