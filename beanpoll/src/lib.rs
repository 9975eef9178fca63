//! # beanpoll
//!
//! Concurrent JMX attribute sampler with bounded in-memory history.
//!
//! beanpoll periodically reads a set of numeric attributes from a remote JMX
//! agent, keeps the last few samples of each in a fixed-size ring, and answers
//! time-range queries over that history while sampling continues.
//!
//! **Status**: This crate is in early development. The API is not yet stable.
//!
//! ## Key Properties
//!
//! - Bounded memory: `capacity` samples per key, oldest overwritten first
//! - Lock-free reads: queries never block the worker appending to a series
//! - Isolated workers: keys are split across threads, so one slow or failing
//!   attribute never delays the others
//! - Wildcard keys expanded once at startup
//!
//! ## Quick Start
//!
//! ```rust
//! use beanpoll::{MetricKey, RegistryBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = RegistryBuilder::new(10)?;
//! builder.register(MetricKey::parse("java.lang:type=Threading@ThreadCount")?);
//! let registry = builder.build();
//!
//! // The poller does this once per interval for every key.
//! let series = registry.get("java.lang:type=Threading@ThreadCount").unwrap();
//! series.append_at(1_000, 12.0);
//! series.append_at(2_000, 14.0);
//!
//! // Newest first.
//! for sample in registry.query("java.lang:type=Threading@ThreadCount", 0, i64::MAX) {
//!     println!("{}: {}", sample.timestamp_ms, sample.value);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`resolve`]: expands wildcard keys through a [`Discovery`]
//! - [`RegistryBuilder`] / [`Registry`]: one [`Series`] per concrete key,
//!   frozen before sampling starts
//! - [`Poller`]: worker groups fetching through an [`AttributeSource`]
//! - [`Series::range`]: backward walk over one series
//!
//! ## Modules
//!
//! - [`key`]: `<resource>@<attribute>` keys
//! - [`sample`]: the `(timestamp, value)` record
//! - [`series`]: per-key ring buffer
//! - [`query`]: range traversal
//! - [`registry`]: key to series map
//! - [`resolve`]: wildcard expansion
//! - [`poller`]: worker pool
//! - [`source`]: remote collaborator traits
//! - [`config`]: startup configuration
//! - `jolokia`: HTTP collaborator (feature `jolokia`)
//! - [`error`]: Error types

pub mod config;
pub mod error;
#[cfg(feature = "jolokia")]
pub mod jolokia;
pub mod key;
pub mod poller;
pub mod query;
pub mod registry;
pub mod resolve;
pub mod sample;
pub mod series;
pub mod source;

// Re-export primary API types at crate root for convenience.
pub use config::SamplerConfig;
pub use error::{BeanpollError, Result};
pub use key::MetricKey;
pub use poller::{Poller, PollerHandle, Shutdown};
pub use registry::{Registry, RegistryBuilder};
pub use resolve::resolve_keys;
pub use sample::Sample;
pub use series::Series;
pub use source::{AttributeSource, Discovery};
