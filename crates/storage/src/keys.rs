//! Key extractors for the store's secondary indices

use smallvec::smallvec;

use modelbase_core::{Record, RecordType};

use crate::bucket_index::IndexKeys;

/// Ordered endpoint pair of a connection
///
/// Interfaces and flows are filed under both `(left, right)` and
/// `(right, left)` so a lookup finds them whichever end the caller starts from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeKey {
    /// Endpoint the lookup starts from
    pub from: String,
    /// Endpoint the lookup ends at
    pub to: String,
}

impl ScopeKey {
    /// Key for the ordered pair `(from, to)`
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        ScopeKey {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Every record under its type
pub fn type_keys(record: &Record) -> IndexKeys<RecordType> {
    smallvec![record.record_type()]
}

/// Records that trace to a parent record, under the parent's identifier
pub fn trace_keys(record: &Record) -> IndexKeys<String> {
    record.trace().map(str::to_string).into_iter().collect()
}

/// Connections under their endpoint pair in both directions
///
/// A connection missing either endpoint has no scope. A self-connection
/// yields a single key.
pub fn scope_keys(record: &Record) -> IndexKeys<ScopeKey> {
    let Some((left_field, right_field)) = record.record_type().endpoints() else {
        return IndexKeys::new();
    };
    let (Some(left), Some(right)) = (record.field(left_field), record.field(right_field)) else {
        return IndexKeys::new();
    };
    if left == right {
        smallvec![ScopeKey::new(left, right)]
    } else {
        smallvec![ScopeKey::new(left, right), ScopeKey::new(right, left)]
    }
}

/// Named records under their display name
pub fn long_name_keys(record: &Record) -> IndexKeys<String> {
    record.long_name().map(str::to_string).into_iter().collect()
}
