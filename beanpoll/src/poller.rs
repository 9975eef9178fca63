//! Worker pool that samples the registry on a fixed interval.
//!
//! The registry's keys are split into `P = min(keys, max_parallelism)`
//! contiguous groups of `keys / P` entries, the last group taking the
//! remainder. Each group gets its own OS thread running:
//!
//! 1. fetch every key in the group through the [`AttributeSource`]
//! 2. append each successful value to that key's series
//! 3. log and skip each failed key
//! 4. sleep for the interval, then repeat until shutdown
//!
//! Groups are disjoint, so each series has exactly one writer. A slow or
//! hanging fetch stalls only the group it belongs to.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use beanpoll::config::SamplerConfig;
//! use beanpoll::error::FetchError;
//! use beanpoll::key::MetricKey;
//! use beanpoll::poller::Poller;
//! use beanpoll::registry::RegistryBuilder;
//! use beanpoll::source::AttributeSource;
//!
//! struct Constant;
//!
//! impl AttributeSource for Constant {
//!     fn fetch(&self, _key: &MetricKey) -> Result<f64, FetchError> {
//!         Ok(1.0)
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SamplerConfig::default();
//! let mut builder = RegistryBuilder::new(config.capacity)?;
//! builder.register(MetricKey::parse("java.lang:type=Threading@ThreadCount")?);
//! let registry = builder.build();
//!
//! let handle = Poller::new(&registry, Arc::new(Constant), &config).spawn()?;
//! // ... serve queries against `registry` ...
//! handle.shutdown();
//! # Ok(())
//! # }
//! ```

use std::ops::Range;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use crate::config::SamplerConfig;
use crate::error::PollerError;
use crate::registry::{Entry, Registry};
use crate::series::{Clock, SystemClock};
use crate::source::AttributeSource;

/// Splits `len` items into at most `max_groups` contiguous ranges.
///
/// Every range but the last holds `len / groups` items; the last one also
/// takes the remainder. Returns no ranges for `len == 0` or
/// `max_groups == 0`.
pub fn partition(len: usize, max_groups: usize) -> Vec<Range<usize>> {
    let groups = len.min(max_groups);
    if groups == 0 {
        return Vec::new();
    }

    let size = len / groups;
    (0..groups)
        .map(|i| {
            let start = i * size;
            let end = if i + 1 == groups { len } else { start + size };
            start..end
        })
        .collect()
}

/// Outcome of one pass over a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Keys whose value was appended.
    pub sampled: usize,
    /// Keys whose fetch failed.
    pub failed: usize,
}

/// Fetches every entry once and appends the successful values.
///
/// A failed fetch is logged and skipped; it never stops the pass.
pub fn poll_group(
    entries: &[Entry],
    source: &dyn AttributeSource,
    clock: &dyn Clock,
) -> CycleStats {
    let mut stats = CycleStats::default();

    for entry in entries {
        match source.fetch(&entry.key) {
            Ok(value) => {
                let sample = entry.series.append_at(clock.now_millis(), value);
                trace!(key = %entry.key, ts = sample.timestamp_ms, value, "sampled");
                stats.sampled += 1;
            }
            Err(e) => {
                warn!(key = %entry.key, error = %e, "fetch failed, key skipped this cycle");
                stats.failed += 1;
            }
        }
    }

    stats
}

/// Cooperative stop signal shared by the poller workers.
#[derive(Debug, Default)]
pub struct Shutdown {
    triggered: Mutex<bool>,
    cond: Condvar,
}

impl Shutdown {
    /// Creates an untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests every waiting worker to stop.
    pub fn trigger(&self) {
        *self.triggered.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.cond.notify_all();
    }

    /// Whether stop was requested.
    pub fn is_triggered(&self) -> bool {
        *self.triggered.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleeps up to `timeout`, waking early on [`Shutdown::trigger`].
    ///
    /// Returns `true` if stop was requested.
    pub fn wait(&self, timeout: Duration) -> bool {
        let guard = self.triggered.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .cond
            .wait_timeout_while(guard, timeout, |triggered| !*triggered)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Configured, not yet running worker pool.
pub struct Poller {
    groups: Vec<Vec<Entry>>,
    source: Arc<dyn AttributeSource>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    shutdown: Arc<Shutdown>,
}

impl Poller {
    /// Partitions the registry's keys into worker groups.
    pub fn new(
        registry: &Registry,
        source: Arc<dyn AttributeSource>,
        config: &SamplerConfig,
    ) -> Self {
        let entries = registry.entries();
        let groups = partition(entries.len(), config.max_parallelism)
            .into_iter()
            .map(|range| entries[range].to_vec())
            .collect();

        Self {
            groups,
            source,
            clock: Arc::new(SystemClock),
            interval: config.interval,
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    /// Replaces the timestamp source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Uses an externally owned stop signal.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: Arc<Shutdown>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Number of worker groups that [`Poller::spawn`] will start.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Starts one thread per group.
    ///
    /// # Errors
    ///
    /// Returns [`PollerError::Spawn`] if a thread cannot be created. Workers
    /// started before the failure are stopped.
    pub fn spawn(self) -> Result<PollerHandle, PollerError> {
        let mut workers = Vec::with_capacity(self.groups.len());
        let group_count = self.groups.len();

        for (group, entries) in self.groups.into_iter().enumerate() {
            let worker = Worker {
                group,
                entries,
                source: Arc::clone(&self.source),
                clock: Arc::clone(&self.clock),
                interval: self.interval,
                shutdown: Arc::clone(&self.shutdown),
            };

            let spawned = thread::Builder::new()
                .name(format!("poller-{group}"))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    PollerHandle {
                        shutdown: self.shutdown,
                        workers,
                    }
                    .shutdown();
                    return Err(PollerError::Spawn { group, source });
                }
            }
        }

        info!(groups = group_count, interval_ms = self.interval.as_millis(), "poller started");

        Ok(PollerHandle {
            shutdown: self.shutdown,
            workers,
        })
    }
}

/// Running worker pool.
#[derive(Debug)]
pub struct PollerHandle {
    shutdown: Arc<Shutdown>,
    workers: Vec<JoinHandle<()>>,
}

impl PollerHandle {
    /// Number of running worker threads.
    pub fn group_count(&self) -> usize {
        self.workers.len()
    }

    /// The stop signal observed by the workers.
    pub fn shutdown_signal(&self) -> Arc<Shutdown> {
        Arc::clone(&self.shutdown)
    }

    /// Stops every worker and waits for it to exit.
    ///
    /// A worker blocked inside a fetch exits once the fetch returns.
    pub fn shutdown(self) {
        self.shutdown.trigger();
        self.join();
    }

    /// Waits for every worker to exit.
    pub fn join(self) {
        for worker in self.workers {
            let name = worker.thread().name().unwrap_or("poller").to_string();
            if worker.join().is_err() {
                error!(worker = %name, "poller worker panicked");
            }
        }
    }
}

/// One polling loop over a fixed group of keys.
struct Worker {
    group: usize,
    entries: Vec<Entry>,
    source: Arc<dyn AttributeSource>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    shutdown: Arc<Shutdown>,
}

impl Worker {
    fn run(self) {
        debug!(group = self.group, keys = self.entries.len(), "worker started");

        while !self.shutdown.is_triggered() {
            let stats = poll_group(&self.entries, self.source.as_ref(), self.clock.as_ref());
            debug!(
                group = self.group,
                sampled = stats.sampled,
                failed = stats.failed,
                "cycle complete"
            );

            if self.shutdown.wait(self.interval) {
                break;
            }
        }

        debug!(group = self.group, "worker stopped");
    }
}
