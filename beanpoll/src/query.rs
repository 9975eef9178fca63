//! Range queries over a [`Series`].
//!
//! A query walks backward from the newest slot and yields every sample whose
//! timestamp lies in `[from, to]`, newest first. The walk never blocks and
//! never mutates the series, so it can run while the owning worker appends.
//!
//! # Traversal
//!
//! Starting at the newest slot, up to `capacity` slots are visited. The walk
//! stops at the first of:
//!
//! - a sentinel slot (the buffer has not been filled this far back)
//! - a sample older than `from` (everything further back is older still)
//! - a sample not strictly older than the newest one (the walk wrapped into
//!   a slot that was overwritten after the query started)
//!
//! # Example
//!
//! ```rust
//! use beanpoll::series::Series;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let series = Series::new(10)?;
//! series.append_at(1_000, 1.0);
//! series.append_at(2_000, 2.0);
//! series.append_at(3_000, 3.0);
//!
//! let values: Vec<f64> = series.range(1_000, 2_000).map(|s| s.value).collect();
//! assert_eq!(values, vec![2.0, 1.0]);
//! # Ok(())
//! # }
//! ```

use std::iter::FusedIterator;

use crate::sample::Sample;
use crate::series::Series;

impl Series {
    /// Lazily iterates samples with `from <= timestamp <= to`, newest first.
    ///
    /// An empty series or `from > to` yields nothing.
    pub fn range(&self, from: i64, to: i64) -> RangeIter<'_> {
        RangeIter::new(self, from, to)
    }

    /// Collects [`Series::range`] into a vector.
    pub fn query(&self, from: i64, to: i64) -> Vec<Sample> {
        self.range(from, to).collect()
    }
}

/// Iterator returned by [`Series::range`].
#[derive(Debug)]
pub struct RangeIter<'a> {
    series: &'a Series,
    from: i64,
    to: i64,
    /// Timestamp of the sample the walk started from.
    newest_ms: i64,
    /// The starting sample, captured once so a lapping writer cannot move it.
    head: Option<Sample>,
    cursor: usize,
    remaining: usize,
}

impl<'a> RangeIter<'a> {
    fn new(series: &'a Series, from: i64, to: i64) -> Self {
        let cursor = series.newest_slot();
        let head = series.slot(cursor);
        let live = !head.is_sentinel() && from <= to;

        Self {
            series,
            from,
            to,
            newest_ms: head.timestamp_ms,
            head: live.then_some(head),
            cursor,
            remaining: if live { series.capacity() } else { 0 },
        }
    }

    fn stop(&mut self) -> Option<Sample> {
        self.remaining = 0;
        None
    }
}

impl Iterator for RangeIter<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Self::Item> {
        let capacity = self.series.capacity();

        while self.remaining > 0 {
            let sample = match self.head.take() {
                Some(head) => head,
                None => {
                    let sample = self.series.slot(self.cursor);
                    if sample.is_sentinel() || sample.timestamp_ms >= self.newest_ms {
                        return self.stop();
                    }
                    sample
                }
            };

            self.cursor = (self.cursor + capacity - 1) % capacity;
            self.remaining -= 1;

            if sample.timestamp_ms < self.from {
                return self.stop();
            }
            if sample.timestamp_ms <= self.to {
                return Some(sample);
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl FusedIterator for RangeIter<'_> {}
