//! Core types for modelbase
//!
//! This crate defines the foundational types shared by every layer:
//! - Record: immutable, typed, identifier-keyed unit of model data
//! - RecordType: table tag and the static reference schema
//! - Timestamp: revision timestamps used by the three-way merge
//! - Limits: size limits enforced when decoding field maps
//! - Error: error type for the decoding and configuration edges

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod record;
pub mod record_type;
pub mod timestamp;

pub use error::{Error, Result};
pub use limits::{LimitError, Limits};
pub use record::{fields, FieldMap, Record};
pub use record_type::{RecordType, ReferenceField};
pub use timestamp::Timestamp;
