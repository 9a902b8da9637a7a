//! Modelbase - immutable data core for systems engineering models
//!
//! A model is held as a pair of baselines (functional parent, allocated
//! child), each an immutable [`RecordStore`] of typed records with
//! referential integrity enforced on every transition.
//!
//! # Quick Start
//!
//! ```
//! use modelbase::{Record, RecordStore, RecordType};
//!
//! let store = RecordStore::empty()
//!     .add(Record::with_id("I1", RecordType::Item))
//!     .add(Record::with_id("F1", RecordType::Function).with_field("item", "I1"));
//!
//! // Removing the item cascades to the function allocated to it
//! let store = store.remove("I1");
//! assert!(store.is_empty());
//! ```
//!
//! # Architecture
//!
//! - `core`: records, record types and the reference schema
//! - `storage`: persistent maps, secondary indices and the record store
//! - `concurrency`: three-way merge and the compare-and-swap undo buffer
//! - `engine`: baseline pairs, diffs, store merges and configuration

pub use modelbase_concurrency::{
    merge, merge_record, merge_streams, merge_with_ancestor, newer_side, Conflict, RecordMerge,
    Side, StreamMerge, UndoBuffer, DEFAULT_UNDO_DEPTH,
};
pub use modelbase_core::{
    fields, Error, FieldMap, Limits, Record, RecordType, ReferenceField, Result, Timestamp,
};
pub use modelbase_engine::{
    connection_directions, merge_pairs, merge_stores, BaselinePair, Change, ChangeKind,
    Connection, DiffPair, DiffSummary, Direction, ModelbaseConfig, PairMerge, StoreMerge,
    CONFIG_FILE_NAME,
};
pub use modelbase_storage::{Loaded, RecordStore, ReverseReferenceIndex};
