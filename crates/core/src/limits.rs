//! Size limits for identifiers and field values
//!
//! Enforced at the serialization boundary when flat field maps are decoded
//! into records. Records built in memory through the builder methods are not
//! re-checked.

use thiserror::Error;

/// Size limits for decoded records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum identifier length in bytes (default: 1024)
    pub max_identifier_bytes: usize,

    /// Maximum length of a single field value in bytes (default: 1MB)
    pub max_field_bytes: usize,

    /// Maximum number of fields on one record (default: 4096)
    pub max_fields: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_identifier_bytes: 1024,
            max_field_bytes: 1024 * 1024,
            max_fields: 4096,
        }
    }
}

impl Limits {
    /// Small limits for exercising enforcement in tests
    pub fn with_small_limits() -> Self {
        Limits {
            max_identifier_bytes: 16,
            max_field_bytes: 32,
            max_fields: 4,
        }
    }

    /// Validate an identifier's length
    pub fn validate_identifier(&self, id: &str) -> Result<(), LimitError> {
        if id.len() > self.max_identifier_bytes {
            return Err(LimitError::IdentifierTooLong {
                actual: id.len(),
                max: self.max_identifier_bytes,
            });
        }
        Ok(())
    }

    /// Validate one field value
    pub fn validate_field(&self, name: &str, value: &str) -> Result<(), LimitError> {
        if value.len() > self.max_field_bytes {
            return Err(LimitError::FieldTooLarge {
                field: name.to_string(),
                actual: value.len(),
                max: self.max_field_bytes,
            });
        }
        Ok(())
    }

    /// Validate the number of fields on a record
    pub fn validate_field_count(&self, count: usize) -> Result<(), LimitError> {
        if count > self.max_fields {
            return Err(LimitError::TooManyFields {
                actual: count,
                max: self.max_fields,
            });
        }
        Ok(())
    }
}

/// Limit validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitError {
    /// Identifier exceeds maximum length
    #[error("Identifier too long: {actual} bytes exceeds maximum {max}")]
    IdentifierTooLong {
        /// Actual identifier length in bytes
        actual: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Field value exceeds maximum length
    #[error("Field '{field}' too large: {actual} bytes exceeds maximum {max}")]
    FieldTooLarge {
        /// Offending field name
        field: String,
        /// Actual value length in bytes
        actual: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Record carries too many fields
    #[error("Too many fields: {actual} exceeds maximum {max}")]
    TooManyFields {
        /// Actual field count
        actual: usize,
        /// Maximum allowed count
        max: usize,
    },
}
