//! Store time: centisecond timestamps and the monotonic clock.
//!
//! Every `last_edit` and history timestamp in the store is issued by the
//! store's own [`Clock`] at commit time; callers never supply timestamps.
//! Time is kept in whole hundredths of a second so that cursor comparisons
//! between nodes never disagree over float representation. On the wire a
//! timestamp travels as a JSON number of seconds with two-decimal precision.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A point in store time: hundredths of a second since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The zero cursor, older than every committed record.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Creates a timestamp from raw centiseconds.
    pub const fn from_centis(centis: u64) -> Self {
        Self(centis)
    }

    /// Returns the raw centisecond count.
    pub const fn as_centis(self) -> u64 {
        self.0
    }

    /// Returns the timestamp as fractional seconds (the wire shape).
    pub fn as_seconds(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Creates a timestamp from fractional seconds, rounded to the
    /// nearest hundredth. Negative inputs clamp to [`Timestamp::ZERO`].
    pub fn from_seconds(seconds: f64) -> Self {
        if seconds <= 0.0 || !seconds.is_finite() {
            return Self::ZERO;
        }
        Self((seconds * 100.0).round() as u64)
    }

    /// Reads the current wall-clock time, truncated to centiseconds.
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self((elapsed.as_millis() / 10) as u64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.as_seconds())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_seconds())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        Ok(Timestamp::from_seconds(seconds))
    }
}

/// Monotonic non-decreasing time source owned by the store.
///
/// `tick` never moves backwards even if the wall clock does; two commits in
/// the same centisecond receive equal timestamps, which the strictly-greater
/// cursor filter tolerates.
#[derive(Debug, Default)]
pub struct Clock {
    last: u64,
}

impl Clock {
    /// Creates a clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock that will never issue a value below `floor`.
    ///
    /// Used when restoring a store from persisted records, so restored
    /// timestamps are never re-issued to new commits.
    pub fn seeded(floor: Timestamp) -> Self {
        Self {
            last: floor.as_centis(),
        }
    }

    /// Issues the next timestamp: the wall clock, held at or above every
    /// previously issued value.
    pub fn tick(&mut self) -> Timestamp {
        self.last = self.last.max(Timestamp::now().as_centis());
        Timestamp(self.last)
    }

    /// Returns the highest timestamp issued so far.
    pub fn watermark(&self) -> Timestamp {
        Timestamp(self.last)
    }
}
