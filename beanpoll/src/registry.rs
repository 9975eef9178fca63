//! Key-to-series registry.
//!
//! The registry maps each concrete [`MetricKey`] to the [`Series`] holding
//! its history. It is assembled once by a [`RegistryBuilder`] and frozen by
//! [`RegistryBuilder::build`]; no entry is added or removed afterwards, so
//! workers and queries share it read-only without a map-level lock.
//!
//! # Example
//!
//! ```rust
//! use beanpoll::key::MetricKey;
//! use beanpoll::registry::RegistryBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = RegistryBuilder::new(10)?;
//! builder.register(MetricKey::parse("java.lang:type=Threading@ThreadCount")?);
//! let registry = builder.build();
//!
//! let series = registry.get("java.lang:type=Threading@ThreadCount").unwrap();
//! series.append_at(1_000, 12.0);
//! assert_eq!(registry.query("java.lang:type=Threading@ThreadCount", 0, i64::MAX).len(), 1);
//! assert!(registry.query("no.such:type=Key@Nope", 0, i64::MAX).is_empty());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::key::MetricKey;
use crate::sample::Sample;
use crate::series::Series;

/// A registered key and its series.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The concrete key.
    pub key: MetricKey,
    /// The series holding its history.
    pub series: Arc<Series>,
}

/// Collects keys before the registry is frozen.
#[derive(Debug)]
pub struct RegistryBuilder {
    capacity: NonZeroUsize,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl RegistryBuilder {
    /// Creates a builder whose series hold `capacity` samples each.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        let capacity =
            NonZeroUsize::new(capacity).ok_or(ConfigError::InvalidCapacity { capacity })?;
        Ok(Self {
            capacity,
            entries: Vec::new(),
            index: HashMap::new(),
        })
    }

    /// Registers `key`. Returns `false` if it was already registered.
    pub fn register(&mut self, key: MetricKey) -> bool {
        let name = key.to_string();
        if self.index.contains_key(&name) {
            return false;
        }

        let series = Arc::new(Series::with_capacity(self.capacity));
        self.index.insert(name, self.entries.len());
        self.entries.push(Entry { key, series });
        true
    }

    /// Registers every key in `keys`.
    pub fn extend<I: IntoIterator<Item = MetricKey>>(&mut self, keys: I) -> &mut Self {
        for key in keys {
            self.register(key);
        }
        self
    }

    /// Freezes the registry.
    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
            index: self.index,
        }
    }
}

/// Immutable map from key to series.
#[derive(Debug)]
pub struct Registry {
    /// Entries in registration order.
    entries: Vec<Entry>,
    /// Canonical key string to position in `entries`.
    index: HashMap<String, usize>,
}

impl Registry {
    /// Looks up the series for a canonical key string.
    pub fn get(&self, key: &str) -> Option<&Arc<Series>> {
        self.index.get(key).map(|&i| &self.entries[i].series)
    }

    /// Samples of `key` with `from <= timestamp <= to`, newest first.
    ///
    /// An unknown key yields an empty vector.
    pub fn query(&self, key: &str, from: i64, to: i64) -> Vec<Sample> {
        self.get(key)
            .map(|series| series.query(from, to))
            .unwrap_or_default()
    }

    /// Entries in registration order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &MetricKey> {
        self.entries.iter().map(|e| &e.key)
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
