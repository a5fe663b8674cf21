//! Endpoint rotation policy and user overrides

use crate::error::RpcError;
use crate::rpc::registry::Released;
use crate::rpc::{Endpoint, EndpointRegistry};
use std::cmp::Ordering;
use std::sync::Arc;
use url::Url;

/// Check that `raw` is a usable HTTP(S) endpoint URL, returning it trimmed
pub fn validate_endpoint_url(raw: &str) -> Result<String, RpcError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RpcError::InvalidEndpoint("URL is empty".to_string()));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| RpcError::InvalidEndpoint(format!("{}: {}", trimmed, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RpcError::InvalidEndpoint(format!(
            "{}: unsupported scheme '{}'",
            trimmed,
            parsed.scheme()
        )));
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(trimmed.to_string()),
        _ => Err(RpcError::InvalidEndpoint(format!("{}: missing host", trimmed))),
    }
}

/// First healthy endpoint scanning from `start` in pool order, wrapping once
pub(crate) fn next_healthy(endpoints: &[Endpoint], start: usize, threshold: u32) -> Option<usize> {
    let len = endpoints.len();
    (0..len)
        .map(|offset| (start + offset) % len)
        .find(|&idx| endpoints[idx].is_healthy(threshold))
}

fn latency_key(endpoint: &Endpoint) -> f64 {
    // Unmeasured endpoints sort after measured ones
    if endpoint.success_count == 0 {
        f64::INFINITY
    } else {
        endpoint.average_latency_ms
    }
}

fn by_latency(a: &Endpoint, b: &Endpoint) -> Ordering {
    latency_key(a)
        .partial_cmp(&latency_key(b))
        .unwrap_or(Ordering::Equal)
}

/// Fallback for manual rotation when nothing is healthy: fewest failures,
/// then lowest latency
pub(crate) fn least_failures(endpoints: &[Endpoint]) -> usize {
    endpoints
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.consecutive_failures
                .cmp(&b.consecutive_failures)
                .then_with(|| by_latency(a, b))
        })
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// Fallback for automatic failover when nothing is healthy: the endpoint
/// whose last failure is oldest
pub(crate) fn least_recently_failed(endpoints: &[Endpoint]) -> usize {
    endpoints
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.last_failed_at
                .cmp(&b.last_failed_at)
                .then_with(|| a.consecutive_failures.cmp(&b.consecutive_failures))
                .then_with(|| by_latency(a, b))
        })
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// Rotation and override control over a shared registry
#[derive(Clone)]
pub struct EndpointSelector {
    registry: Arc<EndpointRegistry>,
}

impl EndpointSelector {
    pub fn new(registry: Arc<EndpointRegistry>) -> Self {
        Self { registry }
    }

    /// Clear any override and advance to the next healthy endpoint in
    /// priority order, wrapping around. With nothing healthy, pick the
    /// endpoint with the fewest failures.
    pub fn switch_to_next_endpoint(&self) -> Endpoint {
        let threshold = self.registry.failure_threshold();

        let (previous, next) = self.registry.update(|state| {
            let previous = state.endpoints[state.current].url.clone();
            let start = match state.release_override() {
                Some(Released {
                    index,
                    removed: true,
                }) => index,
                Some(Released { index, .. }) => index + 1,
                None => state.current + 1,
            };

            state.current = next_healthy(&state.endpoints, start, threshold)
                .unwrap_or_else(|| least_failures(&state.endpoints));
            (previous, state.endpoints[state.current].clone())
        });

        if previous != next.url {
            tracing::info!("Switched endpoint {} -> {}", previous, next.url);
        }
        next
    }

    /// Validate `url` and pin it as the current endpoint.
    ///
    /// Invalid URLs are rejected without touching the pool.
    pub fn set_custom_endpoint(&self, url: &str) -> Result<Endpoint, RpcError> {
        let url = validate_endpoint_url(url)?;
        self.registry.set_override(&url);
        Ok(self.registry.current())
    }

    pub fn clear_override(&self) -> bool {
        self.registry.clear_override()
    }

    /// Automatic failover after `failed_url` failed a call.
    ///
    /// No-op when the current endpoint is a user override, or when another
    /// caller already rotated away from `failed_url`. Returns the new current
    /// endpoint if the pointer moved.
    pub fn rotate_after_failure(&self, failed_url: &str) -> Option<Endpoint> {
        let threshold = self.registry.failure_threshold();

        let moved = self.registry.update(|state| {
            let current = &state.endpoints[state.current];
            if current.url != failed_url || current.is_user_override {
                return None;
            }

            let next = next_healthy(&state.endpoints, state.current + 1, threshold)
                .unwrap_or_else(|| least_recently_failed(&state.endpoints));
            if next == state.current {
                return None;
            }

            state.current = next;
            Some(state.endpoints[next].clone())
        });

        if let Some(next) = &moved {
            tracing::warn!("Failing over from {} to {}", failed_url, next.url);
        }
        moved
    }
}
