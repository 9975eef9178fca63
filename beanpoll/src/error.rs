//! Error types for the beanpoll sampler.
//!
//! Errors split along the lifecycle of the process. Configuration and
//! poller-startup errors are fatal; discovery and fetch errors are reported
//! and skipped so that steady-state sampling never stops on a remote fault.

use std::time::Duration;

use thiserror::Error;

/// The main error type for all beanpoll operations.
#[derive(Error, Debug)]
pub enum BeanpollError {
    /// Invalid startup configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A wildcard key pattern could not be expanded.
    #[error("discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// A single attribute read failed.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The worker pool could not be started.
    #[error("poller error: {0}")]
    Poller(#[from] PollerError),
}

/// Errors in the startup configuration. These abort startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The credentials argument is neither `-` nor `login:password`.
    #[error("unable to parse credentials '{input}': expected 'login:password' or '-'")]
    MalformedCredentials {
        /// The rejected input.
        input: String,
    },

    /// The remote endpoint address is not `host:port` or an HTTP URL.
    #[error("invalid endpoint address '{input}': {reason}")]
    MalformedAddress {
        /// The rejected input.
        input: String,
        /// Why the address is invalid.
        reason: String,
    },

    /// A key specification is not `<resource>@<attribute>`.
    #[error("invalid key '{input}': {reason}")]
    MalformedKey {
        /// The rejected key.
        input: String,
        /// Why the key is invalid.
        reason: String,
    },

    /// The HTTP client for the remote source could not be built.
    #[error("failed to create HTTP client: {reason}")]
    HttpClient {
        /// Description of the failure.
        reason: String,
    },

    /// No key specifications were supplied.
    #[error("at least one key must be configured")]
    NoKeys,

    /// Series capacity must be positive.
    #[error("invalid series capacity: {capacity} (must be > 0)")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
    },

    /// Worker parallelism must be positive.
    #[error("invalid worker parallelism: {workers} (must be > 0)")]
    InvalidParallelism {
        /// The rejected worker count.
        workers: usize,
    },

    /// The polling interval must be non-zero.
    #[error("invalid polling interval {interval:?}")]
    InvalidInterval {
        /// The rejected interval.
        interval: Duration,
    },
}

/// Errors while expanding a wildcard pattern into concrete resources.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The remote source could not be reached.
    #[error("discovery request for '{pattern}' failed: {reason}")]
    Transport {
        /// The pattern being expanded.
        pattern: String,
        /// Description of the transport failure.
        reason: String,
    },

    /// The remote source answered with an error status.
    #[error("discovery of '{pattern}' rejected with status {status}: {message}")]
    Remote {
        /// The pattern being expanded.
        pattern: String,
        /// Remote status code.
        status: u16,
        /// Remote error message.
        message: String,
    },

    /// The remote answer could not be understood.
    #[error("malformed discovery response for '{pattern}': {reason}")]
    Malformed {
        /// The pattern being expanded.
        pattern: String,
        /// What was wrong with the response.
        reason: String,
    },
}

/// Errors while reading one attribute. Recoverable: the key is skipped for
/// the current cycle.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The resource or attribute does not exist on the remote side.
    #[error("{key} not found")]
    NotFound {
        /// The key that was read.
        key: String,
    },

    /// The remote value is not numeric or the response is unreadable.
    #[error("{key} returned a non-numeric value: {reason}")]
    Malformed {
        /// The key that was read.
        key: String,
        /// What was wrong with the value.
        reason: String,
    },

    /// The remote source could not be reached.
    #[error("transport failure reading {key}: {reason}")]
    Transport {
        /// The key that was read.
        key: String,
        /// Description of the transport failure.
        reason: String,
    },

    /// The remote source answered with an error status other than not-found.
    #[error("{key} rejected with status {status}: {message}")]
    Remote {
        /// The key that was read.
        key: String,
        /// Remote status code.
        status: u16,
        /// Remote error message.
        message: String,
    },
}

/// Errors starting the worker pool.
#[derive(Error, Debug)]
pub enum PollerError {
    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn poller worker {group}: {source}")]
    Spawn {
        /// Index of the worker group.
        group: usize,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Type alias for `Result<T, BeanpollError>`.
pub type Result<T> = std::result::Result<T, BeanpollError>;
