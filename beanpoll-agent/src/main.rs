//! beanpoll-agent: samples JMX attributes through a Jolokia endpoint and
//! serves their recent history over HTTP.
//!
//! ```text
//! beanpoll-agent admin:secret localhost:8778 \
//!     'java.lang:type=Threading@ThreadCount' \
//!     'java.lang:type=Memory@HeapMemoryUsage/used' \
//!     'com.example:type=Pool,name=*@ActiveCount'
//! ```

mod api;

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use beanpoll::config::{
    Credentials, DEFAULT_CAPACITY, DEFAULT_MAX_PARALLELISM, DEFAULT_POLL_INTERVAL_MS, Endpoint,
    SamplerConfig, parse_keys,
};
use beanpoll::jolokia::{JolokiaClient, JolokiaConfig};
use beanpoll::{AttributeSource, Poller, RegistryBuilder, resolve_keys};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// beanpoll-agent: JMX attribute sampler with a query API.
#[derive(Parser)]
#[command(name = "beanpoll-agent", version, about)]
struct Cli {
    /// Remote credentials as `login:password`, or `-` for none.
    credentials: String,

    /// Jolokia endpoint as `host:port` or a full `http(s)://` URL.
    address: String,

    /// Keys to sample, `<ObjectName>@<Attribute>[/<path>]`. Object names
    /// may contain `*` or `?` wildcards.
    #[arg(required = true)]
    keys: Vec<String>,

    /// Sampling interval in milliseconds.
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    interval_ms: u64,

    /// Samples retained per key.
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Maximum number of polling threads.
    #[arg(long, default_value_t = DEFAULT_MAX_PARALLELISM)]
    workers: usize,

    /// Port for the HTTP query API.
    #[arg(long, default_value = "9090")]
    port: u16,

    /// Address the HTTP query API binds to.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Agent path appended when ADDRESS is `host:port`.
    #[arg(long, default_value = "/jolokia")]
    agent_path: String,

    /// Timeout for each request to the Jolokia endpoint, in milliseconds.
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let credentials = Credentials::parse(&cli.credentials)?;
    let endpoint = Endpoint::parse(&cli.address, &cli.agent_path)?;
    let keys = parse_keys(&cli.keys)?;
    let config = SamplerConfig {
        interval: Duration::from_millis(cli.interval_ms),
        capacity: cli.capacity,
        max_parallelism: cli.workers,
    };
    config.validate()?;

    tracing::info!(
        endpoint = %endpoint,
        authenticated = credentials.is_some(),
        keys = keys.len(),
        "starting beanpoll-agent"
    );

    let client = Arc::new(JolokiaClient::new(
        JolokiaConfig::new(endpoint)
            .with_credentials(credentials)
            .with_timeout(Duration::from_millis(cli.timeout_ms)),
    )?);

    let mut builder = RegistryBuilder::new(config.capacity)?;
    builder.extend(resolve_keys(&keys, client.as_ref()));
    let registry = Arc::new(builder.build());
    if registry.is_empty() {
        tracing::warn!("no keys resolved; nothing will be sampled");
    }

    // Bind before sampling starts so a taken port fails fast.
    let addr = format!("{}:{}", cli.bind, cli.port);
    let listener =
        TcpListener::bind(&addr).map_err(|e| format!("API bind failed on {addr}: {e}"))?;
    tracing::info!("query API listening on http://{addr}");

    let source: Arc<dyn AttributeSource> = client;
    let handle = Poller::new(&registry, source, &config).spawn()?;
    tracing::info!(
        workers = handle.group_count(),
        interval_ms = cli.interval_ms,
        "sampling started"
    );

    std::thread::Builder::new()
        .name("query-api".to_string())
        .spawn(move || api::serve(listener, registry))?;

    // Workers run until the process is killed.
    handle.join();
    Ok(())
}
