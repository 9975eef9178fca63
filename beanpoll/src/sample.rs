//! A single timestamped observation.

use serde::{Deserialize, Serialize};

/// Timestamp marking a slot that has never been written.
pub const SENTINEL_TIMESTAMP: i64 = -1;

/// One `(timestamp, value)` observation of a metric.
///
/// Samples are immutable. A series slot is replaced with a whole new
/// `Sample`, never patched field by field, so a reader always sees a
/// timestamp together with the value written alongside it.
///
/// Serializes as `{"MSeconds": <ms>, "Value": <float>}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "MSeconds")]
    pub timestamp_ms: i64,
    /// The observed value.
    #[serde(rename = "Value")]
    pub value: f64,
}

impl Sample {
    /// The placeholder held by unfilled slots.
    pub const SENTINEL: Sample = Sample {
        timestamp_ms: SENTINEL_TIMESTAMP,
        value: 0.0,
    };

    /// Creates a sample.
    pub fn new(timestamp_ms: i64, value: f64) -> Self {
        Self { timestamp_ms, value }
    }

    /// Whether this is the unfilled-slot placeholder.
    #[inline]
    pub fn is_sentinel(&self) -> bool {
        self.timestamp_ms == SENTINEL_TIMESTAMP
    }
}

impl Default for Sample {
    fn default() -> Self {
        Self::SENTINEL
    }
}
