//! Conflicts recorded by the three-way merge
//!
//! A merge never fails. When both sides diverge from the ancestor in
//! incompatible ways the merge picks a winner and records what it decided,
//! so the caller can surface it.
//!
//! # Conflict Types
//!
//! - **Field Conflict**: both sides set the same field to different values;
//!   the side with the newer revision wins
//! - **Delete-Modify Conflict**: one side deleted the record, the other
//!   changed it; the changed record is kept

use std::fmt;

/// Which input of a merge a value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The first diverged copy
    Left,
    /// The second diverged copy
    Right,
}

/// A divergence the merge had to resolve
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Conflict {
    /// Both sides changed the same field differently
    Field {
        /// Record identifier
        id: String,
        /// Field name
        field: String,
    },
    /// One side deleted the record while the other changed it
    DeleteModify {
        /// Record identifier
        id: String,
    },
}

impl Conflict {
    /// Identifier of the record the conflict is about
    pub fn id(&self) -> &str {
        match self {
            Conflict::Field { id, .. } | Conflict::DeleteModify { id } => id,
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::Field { id, field } => write!(f, "field conflict on {id}.{field}"),
            Conflict::DeleteModify { id } => write!(f, "delete/modify conflict on {id}"),
        }
    }
}
