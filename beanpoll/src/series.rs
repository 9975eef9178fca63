//! Fixed-capacity circular history for one metric.
//!
//! A [`Series`] holds `capacity` slots and a write cursor. Appends overwrite
//! the oldest slot once the buffer is full, so memory is bounded by
//! configuration, not by how long the process runs.
//!
//! # Design
//!
//! - Slot layout: `next_slot` is the slot the next append writes; the
//!   newest sample lives at `(next_slot - 1) mod capacity`
//! - Unfilled slots hold [`Sample::SENTINEL`]
//! - Timestamps strictly increase as the cursor advances
//! - Each slot is an [`ArcSwap`], so a sample is published as one unit
//!
//! # Thread Safety
//!
//! Series is single-writer, multi-reader. Exactly one poller worker appends
//! to a given series; any number of queries may read it concurrently without
//! blocking the writer. The cursor is published with `Release` after the
//! slot is stored and read with `Acquire`, so a reader that observes a
//! cursor position also observes the sample behind it.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;

use crate::error::ConfigError;
use crate::sample::Sample;

/// Source of sample timestamps, in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    /// Returns the current time in milliseconds.
    fn now_millis(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[allow(clippy::cast_possible_truncation)] // ms since epoch fits i64 for ~292M years
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as i64)
    }
}

/// Circular buffer of the most recent samples of one metric.
pub struct Series {
    slots: Box<[ArcSwap<Sample>]>,
    /// Slot the next append writes.
    next_slot: AtomicUsize,
}

impl Series {
    /// Creates a series with `capacity` sentinel slots.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(capacity)
            .map(Self::with_capacity)
            .ok_or(ConfigError::InvalidCapacity { capacity })
    }

    /// Creates a series with `capacity` sentinel slots.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        let slots = (0..capacity.get())
            .map(|_| ArcSwap::from_pointee(Sample::SENTINEL))
            .collect();

        Self {
            slots,
            next_slot: AtomicUsize::new(0),
        }
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Appends `value` stamped with the wall clock.
    ///
    /// Must only be called by the single writer that owns this series.
    pub fn append(&self, value: f64) -> Sample {
        self.append_at(SystemClock.now_millis(), value)
    }

    /// Appends `value` stamped with `timestamp_ms`.
    ///
    /// The stored timestamp is raised to one past the newest sample when the
    /// given one does not move forward, so the ordering invariant holds even
    /// if the clock repeats or steps back. Returns the sample as stored.
    ///
    /// Timestamps saturate at `i64::MAX`. Once the newest sample sits there,
    /// no later timestamp exists, so further appends replace that sample's
    /// value in place instead of taking a new slot.
    ///
    /// Must only be called by the single writer that owns this series.
    pub fn append_at(&self, timestamp_ms: i64, value: f64) -> Sample {
        let capacity = self.capacity();
        let slot = self.next_slot.load(Ordering::Relaxed);
        let previous_slot = (slot + capacity - 1) % capacity;
        let previous = self.slot(previous_slot);

        if previous.is_sentinel() {
            return self.publish(slot, Sample::new(timestamp_ms.max(0), value));
        }
        if previous.timestamp_ms == i64::MAX {
            let sample = Sample::new(i64::MAX, value);
            self.slots[previous_slot].store(Arc::new(sample));
            return sample;
        }

        let timestamp_ms = timestamp_ms.max(previous.timestamp_ms.saturating_add(1));
        self.publish(slot, Sample::new(timestamp_ms, value))
    }

    /// Stores `sample` in `slot`, then moves the cursor past it.
    fn publish(&self, slot: usize, sample: Sample) -> Sample {
        self.slots[slot].store(Arc::new(sample));
        self.next_slot.store((slot + 1) % self.capacity(), Ordering::Release);
        sample
    }

    /// Index of the most recently written slot.
    #[inline]
    pub(crate) fn newest_slot(&self) -> usize {
        let capacity = self.capacity();
        (self.next_slot.load(Ordering::Acquire) + capacity - 1) % capacity
    }

    /// Snapshot of one slot.
    #[inline]
    pub(crate) fn slot(&self, index: usize) -> Sample {
        **self.slots[index].load()
    }

    /// The newest sample, or `None` if nothing was ever appended.
    pub fn latest(&self) -> Option<Sample> {
        let sample = self.slot(self.newest_slot());
        (!sample.is_sentinel()).then_some(sample)
    }

    /// Number of slots holding a real sample.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| !slot.load().is_sentinel())
            .count()
    }

    /// Whether nothing was ever appended.
    pub fn is_empty(&self) -> bool {
        self.latest().is_none()
    }
}

impl fmt::Debug for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Series")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("latest", &self.latest())
            .finish()
    }
}
