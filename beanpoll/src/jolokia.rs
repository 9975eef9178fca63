//! Jolokia client: JMX reads and searches over HTTP/JSON.
//!
//! Implements [`AttributeSource`] and [`Discovery`] against a Jolokia agent
//! (`http://host:port/jolokia`). Requests are JSON POSTs; the agent reports
//! per-request status inside the response body.
//!
//! This module is only available when the `jolokia` feature is enabled.
//!
//! # Example
//!
//! ```rust,no_run
//! use beanpoll::config::Endpoint;
//! use beanpoll::jolokia::{JolokiaClient, JolokiaConfig};
//! use beanpoll::key::MetricKey;
//! use beanpoll::source::AttributeSource;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = Endpoint::parse("localhost:8778", "/jolokia")?;
//! let client = JolokiaClient::new(JolokiaConfig::new(endpoint))?;
//!
//! let key = MetricKey::parse("java.lang:type=Memory@HeapMemoryUsage/used")?;
//! println!("heap used: {}", client.fetch(&key)?);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{Credentials, Endpoint};
use crate::error::{ConfigError, DiscoveryError, FetchError};
use crate::key::MetricKey;
use crate::source::{AttributeSource, Discovery, numeric_value};

/// Status the agent reports for a missing MBean or attribute.
const STATUS_NOT_FOUND: u16 = 404;

/// Longest error body carried into an error message.
const MAX_ERROR_BODY: usize = 256;

/// Connection settings for a Jolokia agent.
#[derive(Debug, Clone)]
pub struct JolokiaConfig {
    /// Agent base URL.
    pub endpoint: Endpoint,
    /// Optional HTTP basic-auth credentials.
    pub credentials: Option<Credentials>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl JolokiaConfig {
    /// Creates a config with no credentials and a 5s timeout.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            credentials: None,
            timeout: Duration::from_secs(5),
        }
    }

    /// Sets basic-auth credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Request body, tagged by operation type.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Request<'a> {
    Read {
        mbean: &'a str,
        attribute: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<&'a str>,
    },
    Search {
        mbean: &'a str,
    },
}

/// Response body common to all operations.
#[derive(Debug, Deserialize)]
struct Response {
    status: u16,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

impl Response {
    fn message(&self) -> String {
        self.error.clone().unwrap_or_default()
    }
}

/// Outcome of one HTTP exchange before operation-specific interpretation.
enum Reply {
    Ok(Response),
    Rejected { status: u16, message: String },
    Unreadable(String),
}

fn parse_reply(http_status: u16, body: &str) -> Reply {
    match serde_json::from_str::<Response>(body) {
        Ok(response) if response.status == 200 => Reply::Ok(response),
        Ok(response) => Reply::Rejected {
            status: response.status,
            message: response.message(),
        },
        Err(_) if !(200..300).contains(&http_status) => Reply::Rejected {
            status: http_status,
            message: truncate(body),
        },
        Err(e) => Reply::Unreadable(e.to_string()),
    }
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Interprets the answer to a read request.
fn interpret_read(key: &MetricKey, http_status: u16, body: &str) -> Result<f64, FetchError> {
    match parse_reply(http_status, body) {
        Reply::Ok(response) => numeric_value(key, &response.value),
        Reply::Rejected { status, .. } if status == STATUS_NOT_FOUND => Err(FetchError::NotFound {
            key: key.to_string(),
        }),
        Reply::Rejected { status, message } => Err(FetchError::Remote {
            key: key.to_string(),
            status,
            message,
        }),
        Reply::Unreadable(reason) => Err(FetchError::Malformed {
            key: key.to_string(),
            reason,
        }),
    }
}

/// Interprets the answer to a search request.
fn interpret_search(
    pattern: &str,
    http_status: u16,
    body: &str,
) -> Result<Vec<String>, DiscoveryError> {
    match parse_reply(http_status, body) {
        Reply::Ok(response) => serde_json::from_value::<Vec<String>>(response.value).map_err(|e| {
            DiscoveryError::Malformed {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
        }),
        Reply::Rejected { status, message } => Err(DiscoveryError::Remote {
            pattern: pattern.to_string(),
            status,
            message,
        }),
        Reply::Unreadable(reason) => Err(DiscoveryError::Malformed {
            pattern: pattern.to_string(),
            reason,
        }),
    }
}

/// Blocking Jolokia client, shared by all poller workers.
#[derive(Debug, Clone)]
pub struct JolokiaClient {
    client: reqwest::blocking::Client,
    config: JolokiaConfig,
}

impl JolokiaClient {
    /// Builds the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the client cannot be created.
    pub fn new(config: JolokiaConfig) -> Result<Self, ConfigError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient {
                reason: e.to_string(),
            })?;

        Ok(Self { client, config })
    }

    /// The agent this client talks to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.config.endpoint
    }

    /// POSTs `request` and returns the HTTP status and body.
    fn exchange(&self, request: &Request<'_>) -> Result<(u16, String), String> {
        let body = serde_json::to_vec(request).map_err(|e| e.to_string())?;

        let mut builder = self
            .client
            .post(self.config.endpoint.base_url())
            .header("Content-Type", "application/json")
            .body(body);
        if let Some(credentials) = &self.config.credentials {
            builder = builder.basic_auth(&credentials.login, Some(&credentials.password));
        }

        let response = builder.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let text = response.text().map_err(|e| e.to_string())?;
        Ok((status, text))
    }
}

impl AttributeSource for JolokiaClient {
    fn fetch(&self, key: &MetricKey) -> Result<f64, FetchError> {
        let request = Request::Read {
            mbean: key.resource(),
            attribute: key.attribute_name(),
            path: key.attribute_path(),
        };

        let (status, body) = self.exchange(&request).map_err(|reason| FetchError::Transport {
            key: key.to_string(),
            reason,
        })?;
        interpret_read(key, status, &body)
    }
}

impl Discovery for JolokiaClient {
    fn discover(&self, pattern: &str) -> Result<Vec<String>, DiscoveryError> {
        let request = Request::Search { mbean: pattern };

        let (status, body) = self.exchange(&request).map_err(|reason| DiscoveryError::Transport {
            pattern: pattern.to_string(),
            reason,
        })?;
        interpret_search(pattern, status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> MetricKey {
        MetricKey::parse(s).unwrap()
    }

    #[test]
    fn test_read_request_body() {
        let k = key("java.lang:type=Memory@HeapMemoryUsage/used");
        let request = Request::Read {
            mbean: k.resource(),
            attribute: k.attribute_name(),
            path: k.attribute_path(),
        };

        let json: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "read",
                "mbean": "java.lang:type=Memory",
                "attribute": "HeapMemoryUsage",
                "path": "used",
            })
        );
    }

    #[test]
    fn test_read_request_without_path() {
        let request = Request::Read {
            mbean: "java.lang:type=Threading",
            attribute: "ThreadCount",
            path: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("path").is_none());
    }

    #[test]
    fn test_search_request_body() {
        let json = serde_json::to_value(Request::Search { mbean: "java.lang:type=*" }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "search", "mbean": "java.lang:type=*"}));
    }

    #[test]
    fn test_interpret_read_number() {
        let k = key("java.lang:type=Threading@ThreadCount");
        let body = r#"{"request":{},"value":42,"timestamp":1700000000,"status":200}"#;
        assert_eq!(interpret_read(&k, 200, body).unwrap(), 42.0);
    }

    #[test]
    fn test_interpret_read_string_value() {
        let k = key("app:type=Cache@HitRatio");
        let body = r#"{"value":"0.75","status":200}"#;
        assert_eq!(interpret_read(&k, 200, body).unwrap(), 0.75);
    }

    #[test]
    fn test_interpret_read_not_found() {
        let k = key("app:type=Gone@Count");
        let body = concat!(
            r#"{"error_type":"javax.management.InstanceNotFoundException","#,
            r#""error":"app:type=Gone","status":404}"#
        );
        assert!(matches!(
            interpret_read(&k, 200, body),
            Err(FetchError::NotFound { .. })
        ));
    }

    #[test]
    fn test_interpret_read_remote_error() {
        let k = key("app:type=Svc@Broken");
        let body = r#"{"error":"boom","status":500}"#;
        match interpret_read(&k, 200, body) {
            Err(FetchError::Remote { status, message, .. }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_interpret_read_composite_is_malformed() {
        let k = key("java.lang:type=Memory@HeapMemoryUsage");
        let body = r#"{"value":{"used":1,"max":2},"status":200}"#;
        assert!(matches!(
            interpret_read(&k, 200, body),
            Err(FetchError::Malformed { .. })
        ));
    }

    #[test]
    fn test_interpret_read_http_error_without_json() {
        let k = key("java.lang:type=Threading@ThreadCount");
        match interpret_read(&k, 401, "<html>Unauthorized</html>") {
            Err(FetchError::Remote { status, .. }) => assert_eq!(status, 401),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_interpret_read_garbage_body() {
        let k = key("java.lang:type=Threading@ThreadCount");
        assert!(matches!(
            interpret_read(&k, 200, "not json"),
            Err(FetchError::Malformed { .. })
        ));
    }

    #[test]
    fn test_interpret_search() {
        let body = r#"{"value":["app:name=B,type=Pool","app:name=A,type=Pool"],"status":200}"#;
        let found = interpret_search("app:type=Pool,*", 200, body).unwrap();
        assert_eq!(found, vec!["app:name=B,type=Pool", "app:name=A,type=Pool"]);
    }

    #[test]
    fn test_interpret_search_errors() {
        assert!(matches!(
            interpret_search("x:*", 200, r#"{"value":42,"status":200}"#),
            Err(DiscoveryError::Malformed { .. })
        ));
        assert!(matches!(
            interpret_search("x:*", 200, r#"{"error":"denied","status":403}"#),
            Err(DiscoveryError::Remote { status: 403, .. })
        ));
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(1000);
        let short = truncate(&body);
        assert_eq!(short.len(), MAX_ERROR_BODY + 3);
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn test_config_builder() {
        let endpoint = Endpoint::parse("localhost:8778", "/jolokia").unwrap();
        let config = JolokiaConfig::new(endpoint)
            .with_credentials(Credentials::parse("monitor:secret").unwrap())
            .with_timeout(Duration::from_secs(2));

        assert_eq!(config.endpoint.base_url(), "http://localhost:8778/jolokia");
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.credentials.unwrap().login, "monitor");
    }

    #[test]
    fn test_unreachable_agent_is_transport_error() {
        // Port 1 on loopback is not expected to accept connections.
        let endpoint = Endpoint::parse("127.0.0.1:1", "/jolokia").unwrap();
        let config = JolokiaConfig::new(endpoint).with_timeout(Duration::from_secs(2));
        let client = JolokiaClient::new(config).unwrap();

        assert!(matches!(
            client.fetch(&key("java.lang:type=Threading@ThreadCount")),
            Err(FetchError::Transport { .. })
        ));
        assert!(matches!(
            client.discover("java.lang:*"),
            Err(DiscoveryError::Transport { .. })
        ));
    }
}
