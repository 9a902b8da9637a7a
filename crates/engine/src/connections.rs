//! Connections between two endpoints
//!
//! Interfaces join items and flows join functions. Both are indexed under
//! their endpoint pair in each direction; this module reads that index back
//! and reports which way each connection runs.

use std::sync::Arc;

use modelbase_core::{fields, Record};
use modelbase_storage::RecordStore;

/// Orientation of a connection relative to the queried pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `left` is the first endpoint, `right` the second
    Forward,
    /// `left` is the second endpoint, `right` the first
    Reverse,
}

/// A connection found between two endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// The interface or flow record
    pub record: Arc<Record>,
    /// Its orientation relative to the query
    pub direction: Direction,
}

/// Every connection between `from` and `to`, sorted by identifier
///
/// A connection from an endpoint to itself is reported as `Forward`.
pub fn connection_directions(store: &RecordStore, from: &str, to: &str) -> Vec<Connection> {
    let mut connections: Vec<Connection> = store
        .find_by_scope(from, to)
        .map(|record| {
            let direction = if record.field(fields::LEFT) == Some(from) {
                Direction::Forward
            } else {
                Direction::Reverse
            };
            Connection {
                record: Arc::clone(record),
                direction,
            }
        })
        .collect();
    connections.sort_by(|a, b| a.record.id().cmp(b.record.id()));
    connections
}
