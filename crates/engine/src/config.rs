//! Configuration via `modelbase.toml`
//!
//! A handful of tuning knobs for the store and the undo history. Every field
//! has a default, so an empty file (or no file at all) is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use modelbase_concurrency::UndoBuffer;
use modelbase_core::{Error, FieldMap, Limits, Record, Result};
use modelbase_storage::{Loaded, RecordStore, DEFAULT_PARALLEL_LOAD_THRESHOLD};

/// Config file name looked up next to a model
pub const CONFIG_FILE_NAME: &str = "modelbase.toml";

/// Configuration loaded from `modelbase.toml`
///
/// # Example
///
/// ```toml
/// undo_depth = 100
/// parallel_load_threshold = 4096
/// max_field_bytes = 1048576
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelbaseConfig {
    /// Undo entries kept per buffer (0 = unbounded)
    #[serde(default = "default_undo_depth")]
    pub undo_depth: usize,
    /// Record count at which loads build indices in parallel
    #[serde(default = "default_parallel_load_threshold")]
    pub parallel_load_threshold: usize,
    /// Largest field value accepted when decoding a record
    #[serde(default = "default_max_field_bytes")]
    pub max_field_bytes: usize,
}

fn default_undo_depth() -> usize {
    100
}

fn default_parallel_load_threshold() -> usize {
    DEFAULT_PARALLEL_LOAD_THRESHOLD
}

fn default_max_field_bytes() -> usize {
    Limits::default().max_field_bytes
}

impl Default for ModelbaseConfig {
    fn default() -> Self {
        Self {
            undo_depth: default_undo_depth(),
            parallel_load_threshold: default_parallel_load_threshold(),
            max_field_bytes: default_max_field_bytes(),
        }
    }
}

impl ModelbaseConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# modelbase configuration
#
# Undo entries kept per buffer (default: 100, 0 = unbounded)
undo_depth = 100

# Record count from which bulk loads build their indices in parallel
parallel_load_threshold = 4096

# Largest single field value accepted when decoding records, in bytes
max_field_bytes = 1048576
"#
    }

    /// Check values that parse but make no sense
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `max_field_bytes` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_field_bytes == 0 {
            return Err(Error::Config(
                "max_field_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ModelbaseConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Decoding limits implied by this config
    pub fn limits(&self) -> Limits {
        Limits {
            max_field_bytes: self.max_field_bytes,
            ..Limits::default()
        }
    }

    /// Decode one row of the named table under this config's limits
    pub fn decode_row(&self, table: &str, row: FieldMap) -> Result<Record> {
        Record::from_table_row(table, row, &self.limits())
    }

    /// Load a store using this config's parallel threshold
    pub fn load_store<I>(&self, records: I) -> Loaded
    where
        I: IntoIterator<Item = Arc<Record>>,
    {
        RecordStore::load_with_threshold(records, self.parallel_load_threshold)
    }

    /// Undo buffer with this config's history depth
    pub fn undo_buffer<T: Clone + PartialEq>(&self, initial: T) -> UndoBuffer<T> {
        UndoBuffer::with_depth(initial, self.undo_depth)
    }
}
