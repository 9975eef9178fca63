//! Startup expansion of wildcard keys.
//!
//! Each key whose resource part is a pattern is handed to [`Discovery`]; one
//! concrete key is emitted per discovered resource, carrying the pattern's
//! attribute part. Concrete keys pass through unchanged. The result is
//! deduplicated and keeps first-seen order, so the worker partition built
//! from it is stable across restarts against the same remote.
//!
//! Resolution runs once, before the registry is built. A pattern that fails
//! to expand is logged and contributes no keys; it never stops the others.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::key::MetricKey;
use crate::source::Discovery;

/// Expands `keys` into the concrete key set.
///
/// Discovered resources are sorted before emission, since discovery order is
/// unspecified.
pub fn resolve_keys<D: Discovery + ?Sized>(keys: &[MetricKey], discovery: &D) -> Vec<MetricKey> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(keys.len());

    for key in keys {
        if !key.is_pattern() {
            if seen.insert(key.clone()) {
                resolved.push(key.clone());
            }
            continue;
        }

        let mut resources = match discovery.discover(key.resource()) {
            Ok(resources) => resources,
            Err(e) => {
                warn!(pattern = %key, error = %e, "discovery failed, pattern skipped");
                continue;
            }
        };
        resources.sort_unstable();

        if resources.is_empty() {
            warn!(pattern = %key, "pattern matched no resources");
        }

        for resource in resources {
            let concrete = key.with_resource(resource);
            if concrete.is_pattern() {
                debug!(key = %concrete, "discovered name is itself a pattern, skipped");
                continue;
            }
            if seen.insert(concrete.clone()) {
                debug!(pattern = %key, key = %concrete, "pattern expanded");
                resolved.push(concrete);
            }
        }
    }

    info!(requested = keys.len(), resolved = resolved.len(), "keys resolved");
    resolved
}
