//! Storage layer for modelbase
//!
//! This crate implements the immutable record store:
//! - SharedMap: copy-on-write sharded hash map with shard-level sharing
//! - IdentityMap: identifier → record, the primary map
//! - BucketIndex: one parametric multi-valued index, used by type, trace,
//!   connection scope and long name
//! - ReverseReferenceIndex: referenced identifier → referencing records,
//!   with the cascade walk and dangling-reference pruning
//! - RecordStore: all of the above kept consistent in one value
//!
//! # Concurrency
//!
//! Every structure is an immutable value. Updates return new values that
//! share untouched shards with the old one, so readers need no locking and
//! a store can be handed to other threads freely.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bucket_index;
pub mod identity_map;
pub mod keys;
pub mod record_store;
pub mod reverse_index;
pub mod shared_map;

pub use bucket_index::{BucketIndex, IndexKeys, KeyExtractor};
pub use identity_map::IdentityMap;
pub use keys::ScopeKey;
pub use record_store::{Loaded, RecordStore, DEFAULT_PARALLEL_LOAD_THRESHOLD};
pub use reverse_index::{IdSet, LoadedReferences, ReverseReferenceIndex};
pub use shared_map::{MapEditor, SharedMap, SHARD_COUNT};
