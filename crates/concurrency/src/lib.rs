//! Merge and history layer for modelbase
//!
//! This crate implements the parts of modelbase that reconcile values:
//! - Three-way merge of values and records (field granularity)
//! - Linear merge walk over three identifier-sorted record streams
//! - Conflict reporting for divergences the merge resolved
//! - UndoBuffer: current value with undo/redo and compare-and-swap updates
//!
//! The merge is total: every divergence is resolved deterministically in
//! favour of the newer revision and reported, never returned as an error.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conflict;
pub mod merge;
pub mod undo;
pub mod walk;

pub use conflict::{Conflict, Side};
pub use merge::{merge, merge_record, merge_with_ancestor, newer_side, RecordMerge};
pub use undo::{UndoBuffer, DEFAULT_UNDO_DEPTH};
pub use walk::{merge_streams, MergeStep, MergeWalk, StreamMerge};
