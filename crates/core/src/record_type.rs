//! Record type tags and the static reference schema
//!
//! Every record belongs to exactly one table, fixed when the record is
//! created. The table decides which fields are references to other records
//! and which type each reference must resolve to.
//!
//! | Type       | Reference fields                                        |
//! |------------|---------------------------------------------------------|
//! | Item       | `container` → Item                                      |
//! | Function   | `item` → Item, `container` → Function                   |
//! | Interface  | `left` → Item, `right` → Item                           |
//! | FlowType   | –                                                       |
//! | Flow       | `container` → Item, `left`/`right` → Function, `subtype` → FlowType |
//! | Budget     | –                                                       |
//! | ItemBudget | `item` → Item, `budget` → Budget                        |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::fields;

/// Table tag of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    /// A physical or logical part of the system
    Item,
    /// Something the system does, optionally allocated to an item
    Function,
    /// A connection between two items
    Interface,
    /// The kind of thing a flow carries (power, data, ...)
    FlowType,
    /// A connection between two functions
    Flow,
    /// A budgeted quantity (mass, power draw, ...)
    Budget,
    /// An item's share of a budget
    ItemBudget,
}

/// One reference field of a record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReferenceField {
    /// Field name in the record's field map
    pub name: &'static str,
    /// Type the referenced record must have
    pub target: RecordType,
}

const fn reference(name: &'static str, target: RecordType) -> ReferenceField {
    ReferenceField { name, target }
}

const ITEM_REFERENCES: &[ReferenceField] = &[reference(fields::CONTAINER, RecordType::Item)];

const FUNCTION_REFERENCES: &[ReferenceField] = &[
    reference(fields::ITEM, RecordType::Item),
    reference(fields::CONTAINER, RecordType::Function),
];

const INTERFACE_REFERENCES: &[ReferenceField] = &[
    reference(fields::LEFT, RecordType::Item),
    reference(fields::RIGHT, RecordType::Item),
];

const FLOW_REFERENCES: &[ReferenceField] = &[
    reference(fields::CONTAINER, RecordType::Item),
    reference(fields::LEFT, RecordType::Function),
    reference(fields::RIGHT, RecordType::Function),
    reference(fields::SUBTYPE, RecordType::FlowType),
];

const ITEM_BUDGET_REFERENCES: &[ReferenceField] = &[
    reference(fields::ITEM, RecordType::Item),
    reference(fields::BUDGET, RecordType::Budget),
];

impl RecordType {
    /// All record types (for iteration)
    pub const ALL: [RecordType; 7] = [
        RecordType::Item,
        RecordType::Function,
        RecordType::Interface,
        RecordType::FlowType,
        RecordType::Flow,
        RecordType::Budget,
        RecordType::ItemBudget,
    ];

    /// Table name, as used by the serialization layer
    pub const fn name(&self) -> &'static str {
        match self {
            RecordType::Item => "Item",
            RecordType::Function => "Function",
            RecordType::Interface => "Interface",
            RecordType::FlowType => "FlowType",
            RecordType::Flow => "Flow",
            RecordType::Budget => "Budget",
            RecordType::ItemBudget => "ItemBudget",
        }
    }

    /// Parse a table name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Reference fields declared by this type
    pub const fn references(&self) -> &'static [ReferenceField] {
        match self {
            RecordType::Item => ITEM_REFERENCES,
            RecordType::Function => FUNCTION_REFERENCES,
            RecordType::Interface => INTERFACE_REFERENCES,
            RecordType::Flow => FLOW_REFERENCES,
            RecordType::ItemBudget => ITEM_BUDGET_REFERENCES,
            RecordType::FlowType | RecordType::Budget => &[],
        }
    }

    /// Check whether `field` is a reference field of this type
    pub fn is_reference_field(&self, field: &str) -> bool {
        self.references().iter().any(|r| r.name == field)
    }

    /// Endpoint fields for connection types
    ///
    /// Interfaces connect two items and flows connect two functions; both are
    /// indexed under the ordered endpoint pair in each direction.
    pub const fn endpoints(&self) -> Option<(&'static str, &'static str)> {
        match self {
            RecordType::Interface | RecordType::Flow => Some((fields::LEFT, fields::RIGHT)),
            _ => None,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for t in RecordType::ALL {
            assert_eq!(RecordType::from_name(t.name()), Some(t));
            assert_eq!(t.to_string(), t.name());
        }
        assert_eq!(RecordType::from_name("Widget"), None);
    }

    #[test]
    fn test_reference_schema() {
        assert!(RecordType::FlowType.references().is_empty());
        assert!(RecordType::Budget.references().is_empty());

        let flow: Vec<_> = RecordType::Flow
            .references()
            .iter()
            .map(|r| (r.name, r.target))
            .collect();
        assert_eq!(
            flow,
            vec![
                ("container", RecordType::Item),
                ("left", RecordType::Function),
                ("right", RecordType::Function),
                ("subtype", RecordType::FlowType),
            ]
        );
        assert!(RecordType::Function.is_reference_field("item"));
        assert!(!RecordType::Function.is_reference_field("longName"));
    }

    #[test]
    fn test_endpoints_only_for_connections() {
        assert_eq!(RecordType::Interface.endpoints(), Some(("left", "right")));
        assert_eq!(RecordType::Flow.endpoints(), Some(("left", "right")));
        assert_eq!(RecordType::Item.endpoints(), None);
    }
}
