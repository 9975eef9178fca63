//! HTTP query API over the sampled history.
//!
//! Uses `std::net::TcpListener`, one request per connection. Endpoints:
//!
//! - `GET /health` - liveness check
//! - `GET /jmx` - registered keys (JSON array of strings)
//! - `GET /jmx/<key>?start=<ms>&stop=<ms>` - samples of one key, newest first

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use beanpoll::Registry;

const SERIES_PREFIX: &str = "/jmx/";

/// A status code and JSON body, before it is written to the socket.
#[derive(Debug, PartialEq, Eq)]
struct Response {
    status: u16,
    body: String,
}

impl Response {
    fn ok(body: String) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self { status, body }
    }
}

/// Accepts connections until the listener fails. Blocking; run it on a
/// dedicated thread.
pub fn serve(listener: TcpListener, registry: Arc<Registry>) {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("accept error: {e}");
                continue;
            }
        };

        let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));

        if let Err(e) = handle_request(&stream, &registry) {
            tracing::debug!("request error: {e}");
        }
    }
}

/// Reads one request from the stream and writes the answer back.
fn handle_request(
    stream: &TcpStream,
    registry: &Registry,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    // Drain headers; only the request line matters.
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 || line.trim().is_empty() {
            break;
        }
    }

    let mut parts = request_line.split_whitespace();
    let response = match (parts.next(), parts.next()) {
        (Some(method), Some(target)) => respond(method, target, registry),
        _ => Response::error(400, "malformed request line"),
    };

    tracing::trace!(request = request_line.trim(), status = response.status, "served");
    send_response(stream, &response)
}

/// Routes a request target to its handler.
fn respond(method: &str, target: &str, registry: &Registry) -> Response {
    if method != "GET" {
        return Response::error(405, "only GET is supported");
    }

    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    match path {
        "/health" => Response::ok(r#"{"status":"ok"}"#.to_string()),
        "/jmx" | "/jmx/" => list_keys(registry),
        _ => match path.strip_prefix(SERIES_PREFIX) {
            Some(encoded) => query_series(registry, encoded, query),
            None => Response::error(404, "not found"),
        },
    }
}

/// `GET /jmx`
fn list_keys(registry: &Registry) -> Response {
    let keys: Vec<String> = registry.keys().map(ToString::to_string).collect();
    match serde_json::to_string(&keys) {
        Ok(body) => Response::ok(body),
        Err(e) => Response::error(500, &e.to_string()),
    }
}

/// `GET /jmx/<key>?start=<ms>&stop=<ms>`. An unknown key answers `[]`.
fn query_series(registry: &Registry, encoded_key: &str, query: &str) -> Response {
    let Ok(key) = urlencoding::decode(encoded_key) else {
        return Response::error(400, "key is not valid UTF-8");
    };

    let params = parse_query(query);
    let Some(start) = parse_bound(&params, "start", 0) else {
        return Response::error(400, "'start' must be an integer");
    };
    let Some(stop) = parse_bound(&params, "stop", i64::MAX) else {
        return Response::error(400, "'stop' must be an integer");
    };

    let samples = registry.query(&key, start, stop);
    match serde_json::to_string(&samples) {
        Ok(body) => Response::ok(body),
        Err(e) => Response::error(500, &e.to_string()),
    }
}

/// Missing means `default`; present but not an integer means `None`.
fn parse_bound(params: &HashMap<String, String>, name: &str, default: i64) -> Option<i64> {
    match params.get(name) {
        None => Some(default),
        Some(raw) => raw.parse().ok(),
    }
}

/// Parses a query string into key-value pairs.
fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            let v = urlencoding::decode(v).ok()?;
            Some((k.to_string(), v.into_owned()))
        })
        .collect()
}

fn send_response(
    mut stream: &TcpStream,
    response: &Response,
) -> Result<(), Box<dyn std::error::Error>> {
    let status_text = match response.status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    };

    write!(
        stream,
        "HTTP/1.1 {} {status_text}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        response.status,
        response.body.len(),
        response.body,
    )?;
    stream.flush()?;

    Ok(())
}
