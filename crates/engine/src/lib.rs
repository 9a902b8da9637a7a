//! Baseline layer for modelbase
//!
//! This crate composes stores into the structures an editor works with:
//! - BaselinePair: parent (functional) and child (allocated) stores linked
//!   by trace fields
//! - DiffPair: before/after classification of one baseline
//! - Connection queries with direction
//! - Three-way merge of whole stores and baseline pairs
//! - ModelbaseConfig: tuning loaded from `modelbase.toml`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod baseline;
pub mod config;
pub mod connections;
pub mod diff;
pub mod store_merge;

pub use baseline::BaselinePair;
pub use config::{ModelbaseConfig, CONFIG_FILE_NAME};
pub use connections::{connection_directions, Connection, Direction};
pub use diff::{Change, ChangeKind, DiffPair, DiffSummary};
pub use store_merge::{merge_pairs, merge_stores, PairMerge, StoreMerge};
