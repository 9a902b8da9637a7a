//! Microsecond-precision revision timestamps
//!
//! Every revision of a record carries a timestamp recording when it was
//! produced. The three-way merge uses these to decide which side of a
//! concurrent edit is newer, so revisions handed out by one process must be
//! strictly increasing even when the wall clock stalls or steps backwards.
//!
//! ## Usage
//!
//! ```
//! use modelbase_core::Timestamp;
//!
//! let a = Timestamp::tick();
//! let b = Timestamp::tick();
//! assert!(b.is_after(a));
//!
//! let fixed = Timestamp::from_micros(1_000_000);
//! assert_eq!(fixed.to_string(), "1.000000");
//! ```

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Last value handed out by [`Timestamp::tick`]
static LAST_TICK: AtomicU64 = AtomicU64::new(0);

/// Microseconds since the Unix epoch
///
/// ## Invariants
///
/// - Timestamps are non-negative and always in microseconds
/// - Timestamps are totally ordered
/// - The zero timestamp is the Unix epoch and is used for records whose
///   revision is unknown (e.g. loaded without a `revision` field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Wall-clock time right now
    ///
    /// Returns epoch if the system clock is before the Unix epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as u64)
    }

    /// Next revision timestamp for this process
    ///
    /// Follows the wall clock but never returns the same value twice and never
    /// goes backwards, so two edits made in the same microsecond still order.
    pub fn tick() -> Self {
        let wall = Self::now().0;
        let mut last = LAST_TICK.load(Ordering::Relaxed);
        loop {
            let next = wall.max(last.saturating_add(1));
            match LAST_TICK.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return Timestamp(next),
                Err(observed) => last = observed,
            }
        }
    }

    /// Create a timestamp from microseconds since epoch
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// Parse the field-map encoding (decimal microseconds)
    pub fn parse(text: &str) -> Option<Self> {
        text.trim().parse::<u64>().ok().map(Timestamp)
    }

    /// Check if this timestamp is after another
    #[inline]
    pub fn is_after(&self, other: Timestamp) -> bool {
        self.0 > other.0
    }

    /// Encoding used in flat field maps
    pub fn to_field_value(&self) -> String {
        self.0.to_string()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secs = self.0 / 1_000_000;
        let micros = self.0 % 1_000_000;
        write!(f, "{}.{:06}", secs, micros)
    }
}
