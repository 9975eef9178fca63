//! Seams to the remote source.
//!
//! The sampler never talks to a JMX agent directly. It reads values through
//! [`AttributeSource`] and expands patterns through [`Discovery`]; the
//! `jolokia` feature provides an HTTP implementation of both.

use crate::error::{DiscoveryError, FetchError};
use crate::key::MetricKey;

/// Reads the current numeric value of one key.
///
/// Called once per key per polling interval, concurrently from several
/// worker threads.
pub trait AttributeSource: Send + Sync {
    /// Fetches the value behind `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] for a missing resource, a non-numeric value,
    /// or a transport failure. All of them are recoverable.
    fn fetch(&self, key: &MetricKey) -> Result<f64, FetchError>;
}

/// Expands a resource pattern into concrete resource names.
///
/// Only used during startup key resolution.
pub trait Discovery {
    /// Returns the resources matching `pattern`, in any order.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscoveryError`] if the pattern cannot be expanded.
    fn discover(&self, pattern: &str) -> Result<Vec<String>, DiscoveryError>;
}

/// Converts a remote attribute value to a float.
///
/// Numbers are taken as-is; strings are parsed, since agents often return
/// the `toString()` form of boxed numbers.
///
/// # Errors
///
/// Returns [`FetchError::Malformed`] for anything else.
pub fn numeric_value(key: &MetricKey, value: &serde_json::Value) -> Result<f64, FetchError> {
    let malformed = |reason: String| FetchError::Malformed {
        key: key.to_string(),
        reason,
    };

    match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| malformed(format!("{n} is not representable as f64"))),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| malformed(format!("'{s}': {e}"))),
        other => Err(malformed(format!("unsupported value {other}"))),
    }
}
