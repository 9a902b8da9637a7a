//! Error types for modelbase
//!
//! Store, merge and undo operations are total and never fail; the errors
//! here cover the edges of the core: decoding flat field maps handed over by
//! the serialization layer and reading configuration files.
//! We use `thiserror` for the `Display` and `Error` implementations.

use std::io;
use thiserror::Error;

use crate::limits::LimitError;
use crate::record_type::RecordType;

/// Result type alias for modelbase operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for modelbase
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while reading or writing a file
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// Field map without an `identifier` entry
    #[error("Missing identifier for {0} record")]
    MissingIdentifier(RecordType),

    /// Table name not known to the schema
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    /// `revision` field that is not a decimal microsecond count
    #[error("Invalid revision '{value}' on record {id}")]
    InvalidRevision {
        /// Record identifier
        id: String,
        /// Offending revision text
        value: String,
    },

    /// Size limit violated while decoding
    #[error("Limit exceeded: {0}")]
    LimitExceeded(#[from] LimitError),

    /// Configuration could not be parsed or is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}
