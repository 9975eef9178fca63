//! Integration tests for key resolution and the worker pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use beanpoll::config::SamplerConfig;
use beanpoll::error::{DiscoveryError, FetchError};
use beanpoll::key::MetricKey;
use beanpoll::poller::{Poller, Shutdown};
use beanpoll::registry::RegistryBuilder;
use beanpoll::resolve::resolve_keys;
use beanpoll::source::{AttributeSource, Discovery};

/// Fake remote: a table of resource -> value, plus resources that fail or
/// block.
#[derive(Default)]
struct FakeAgent {
    values: HashMap<String, f64>,
    failing: Vec<String>,
    slow: Vec<String>,
    domains: HashMap<String, Vec<String>>,
    fetches: AtomicUsize,
}

impl AttributeSource for FakeAgent {
    fn fetch(&self, key: &MetricKey) -> Result<f64, FetchError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);

        if self.slow.iter().any(|r| r == key.resource()) {
            thread::sleep(Duration::from_millis(400));
        }
        if self.failing.iter().any(|r| r == key.resource()) {
            return Err(FetchError::Transport {
                key: key.to_string(),
                reason: "connection reset".to_string(),
            });
        }
        self.values
            .get(key.resource())
            .copied()
            .ok_or_else(|| FetchError::NotFound { key: key.to_string() })
    }
}

impl Discovery for FakeAgent {
    fn discover(&self, pattern: &str) -> Result<Vec<String>, DiscoveryError> {
        self.domains
            .get(pattern)
            .cloned()
            .ok_or_else(|| DiscoveryError::Transport {
                pattern: pattern.to_string(),
                reason: "unreachable".to_string(),
            })
    }
}

fn fast_config(max_parallelism: usize) -> SamplerConfig {
    SamplerConfig {
        interval: Duration::from_millis(10),
        capacity: 10,
        max_parallelism,
    }
}

fn keys(specs: &[&str]) -> Vec<MetricKey> {
    specs.iter().map(|s| MetricKey::parse(s).unwrap()).collect()
}

#[test]
fn test_wildcard_yields_independently_polled_entries() {
    let mut agent = FakeAgent::default();
    agent.domains.insert(
        "app:type=Pool,name=*".to_string(),
        vec![
            "app:type=Pool,name=A".into(),
            "app:type=Pool,name=B".into(),
            "app:type=Pool,name=C".into(),
        ],
    );
    agent.values.insert("app:type=Pool,name=A".into(), 1.0);
    agent.values.insert("app:type=Pool,name=B".into(), 2.0);
    agent.values.insert("app:type=Pool,name=C".into(), 3.0);
    let agent = Arc::new(agent);

    let resolved = resolve_keys(&keys(&["app:type=Pool,name=*@Active"]), agent.as_ref());
    let config = fast_config(5);
    let mut builder = RegistryBuilder::new(config.capacity).unwrap();
    builder.extend(resolved);
    let registry = builder.build();
    assert_eq!(registry.len(), 3);

    let poller = Poller::new(&registry, agent.clone(), &config);
    assert_eq!(poller.group_count(), 3);
    let handle = poller.spawn().unwrap();
    thread::sleep(Duration::from_millis(150));
    handle.shutdown();

    for (name, value) in [("A", 1.0), ("B", 2.0), ("C", 3.0)] {
        let key = format!("app:type=Pool,name={name}@Active");
        let samples = registry.query(&key, i64::MIN, i64::MAX);
        assert!(!samples.is_empty(), "{key} was never sampled");
        assert!(samples.iter().all(|s| s.value == value));
    }
}

#[test]
fn test_failing_key_does_not_stop_sibling_group() {
    let mut agent = FakeAgent::default();
    agent.failing.push("app:type=Broken".into());
    agent.values.insert("app:type=Healthy".into(), 7.0);
    let agent = Arc::new(agent);

    let mut builder = RegistryBuilder::new(10).unwrap();
    builder.extend(keys(&["app:type=Broken@Value", "app:type=Healthy@Value"]));
    let registry = builder.build();

    let handle = Poller::new(&registry, agent, &fast_config(2)).spawn().unwrap();
    assert_eq!(handle.group_count(), 2);
    thread::sleep(Duration::from_millis(150));
    handle.shutdown();

    assert!(registry.get("app:type=Broken@Value").unwrap().is_empty());
    assert!(registry.get("app:type=Healthy@Value").unwrap().len() >= 3);
}

#[test]
fn test_slow_key_does_not_delay_sibling_group() {
    let mut agent = FakeAgent::default();
    agent.slow.push("app:type=Slow".into());
    agent.values.insert("app:type=Slow".into(), 1.0);
    agent.values.insert("app:type=Fast".into(), 2.0);
    let agent = Arc::new(agent);

    let mut builder = RegistryBuilder::new(10).unwrap();
    builder.extend(keys(&["app:type=Slow@Value", "app:type=Fast@Value"]));
    let registry = builder.build();

    let handle = Poller::new(&registry, agent, &fast_config(2)).spawn().unwrap();
    thread::sleep(Duration::from_millis(200));

    let slow = registry.get("app:type=Slow@Value").unwrap().len();
    let fast = registry.get("app:type=Fast@Value").unwrap().len();
    handle.shutdown();

    assert!(slow <= 1, "slow key sampled {slow} times");
    assert!(fast >= 3, "fast key sampled only {fast} times");
}

#[test]
fn test_failure_in_group_does_not_skip_groupmates() {
    let mut agent = FakeAgent::default();
    agent.failing.push("app:type=Broken".into());
    agent.values.insert("app:type=Healthy".into(), 5.0);
    let agent = Arc::new(agent);

    let mut builder = RegistryBuilder::new(10).unwrap();
    builder.extend(keys(&["app:type=Broken@Value", "app:type=Healthy@Value"]));
    let registry = builder.build();

    // single worker owns both keys
    let handle = Poller::new(&registry, agent, &fast_config(1)).spawn().unwrap();
    thread::sleep(Duration::from_millis(100));
    handle.shutdown();

    assert!(registry.get("app:type=Broken@Value").unwrap().is_empty());
    assert!(!registry.get("app:type=Healthy@Value").unwrap().is_empty());
}

#[test]
fn test_shutdown_stops_sampling() {
    let mut agent = FakeAgent::default();
    agent.values.insert("app:type=X".into(), 1.0);
    let agent = Arc::new(agent);

    let mut builder = RegistryBuilder::new(10).unwrap();
    builder.extend(keys(&["app:type=X@Value"]));
    let registry = builder.build();

    let shutdown = Arc::new(Shutdown::new());
    let handle = Poller::new(&registry, agent.clone(), &fast_config(1))
        .with_shutdown(Arc::clone(&shutdown))
        .spawn()
        .unwrap();
    thread::sleep(Duration::from_millis(50));
    shutdown.trigger();
    handle.join();

    let after_stop = agent.fetches.load(Ordering::Relaxed);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(agent.fetches.load(Ordering::Relaxed), after_stop);
    assert!(after_stop >= 1);
}

#[test]
fn test_empty_registry_spawns_nothing() {
    let registry = RegistryBuilder::new(10).unwrap().build();
    let handle = Poller::new(&registry, Arc::new(FakeAgent::default()), &fast_config(5))
        .spawn()
        .unwrap();

    assert_eq!(handle.group_count(), 0);
    handle.shutdown();
}
