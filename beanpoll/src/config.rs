//! Startup configuration.
//!
//! Everything here is consumed once at process start. Validation failures
//! are [`ConfigError`]s and abort startup.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use crate::key::MetricKey;

/// Default polling interval, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);

/// Default number of samples retained per series.
pub const DEFAULT_CAPACITY: usize = 10;

/// Default upper bound on concurrent poller workers.
pub const DEFAULT_MAX_PARALLELISM: usize = 5;

/// Marker meaning "no credentials" on the command line.
pub const NO_CREDENTIALS: &str = "-";

/// Login and password for the remote source.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login name.
    pub login: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Parses `login:password`, or `-` for no credentials.
    ///
    /// The login may not contain a colon; everything after the first colon
    /// is the password.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedCredentials`] when there is no colon
    /// or the login is empty.
    pub fn parse(input: &str) -> Result<Option<Self>, ConfigError> {
        if input == NO_CREDENTIALS {
            return Ok(None);
        }

        match input.split_once(':') {
            Some((login, password)) if !login.is_empty() => Ok(Some(Self {
                login: login.to_string(),
                password: password.to_string(),
            })),
            _ => Err(ConfigError::MalformedCredentials {
                input: input.to_string(),
            }),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Base URL of the remote source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
}

impl Endpoint {
    /// Parses `host:port` or an `http(s)://` URL.
    ///
    /// A bare `host:port` becomes `http://host:port{agent_path}`. A URL is
    /// taken as the full base and `agent_path` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedAddress`] if the address is not a
    /// well-formed HTTP URL, the host is empty, or the port is not a number.
    pub fn parse(input: &str, agent_path: &str) -> Result<Self, ConfigError> {
        let malformed = |reason: &str| ConfigError::MalformedAddress {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let base_url = if input.starts_with("http://") || input.starts_with("https://") {
            input.trim_end_matches('/').to_string()
        } else {
            let (host, port) = input
                .rsplit_once(':')
                .ok_or_else(|| malformed("expected host:port"))?;
            if host.is_empty() {
                return Err(malformed("missing host"));
            }
            port.parse::<u16>()
                .map_err(|_| malformed("port must be a number between 0 and 65535"))?;

            let path = agent_path.trim_matches('/');
            if path.is_empty() {
                format!("http://{host}:{port}")
            } else {
                format!("http://{host}:{port}/{path}")
            }
        };

        let url = Url::parse(&base_url).map_err(|e| malformed(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(malformed("scheme must be http or https"));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(malformed("missing host"));
        }

        Ok(Self { base_url })
    }

    /// The base URL requests are sent to, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

/// Sampling constants shared by the registry and the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Time between two polls of the same key.
    pub interval: Duration,
    /// Samples retained per series.
    pub capacity: usize,
    /// Upper bound on worker groups.
    pub max_parallelism: usize,
}

impl SamplerConfig {
    /// Validates the constants.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any value is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::InvalidInterval {
                interval: self.interval,
            });
        }
        if self.capacity == 0 {
            return Err(ConfigError::InvalidCapacity {
                capacity: self.capacity,
            });
        }
        if self.max_parallelism == 0 {
            return Err(ConfigError::InvalidParallelism {
                workers: self.max_parallelism,
            });
        }
        Ok(())
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            capacity: DEFAULT_CAPACITY,
            max_parallelism: DEFAULT_MAX_PARALLELISM,
        }
    }
}

/// Parses the key specifications given at startup.
///
/// # Errors
///
/// Returns [`ConfigError::NoKeys`] for an empty list, or the first
/// [`ConfigError::MalformedKey`].
pub fn parse_keys<S: AsRef<str>>(specs: &[S]) -> Result<Vec<MetricKey>, ConfigError> {
    if specs.is_empty() {
        return Err(ConfigError::NoKeys);
    }
    specs.iter().map(|s| MetricKey::parse(s.as_ref())).collect()
}
