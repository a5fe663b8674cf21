//! Endpoint registry: the ordered pool, the current pointer and per-endpoint health

use crate::clock::Clock;
use crate::config::{EndpointConfig, ManagerConfig, LOCAL_ENDPOINT};
use crate::rpc::selector::{least_failures, next_healthy};
use crate::rpc::Endpoint;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared routing state.
///
/// All mutable fields live behind one lock that is only held for short,
/// non-blocking sections; network calls never run under it. Every mutation
/// bumps a revision counter that observers can [`subscribe`](Self::subscribe) to.
pub struct EndpointRegistry {
    state: Mutex<PoolState>,
    threshold: u32,
    latency_weight: f64,
    clock: Arc<dyn Clock>,
    revision: watch::Sender<u64>,
}

/// Lock-protected pool contents
#[derive(Debug)]
pub(crate) struct PoolState {
    pub(crate) endpoints: Vec<Endpoint>,
    pub(crate) current: usize,
    /// URL of an override that was appended rather than found in the pool
    appended_override: Option<String>,
}

/// What happened when an override was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Released {
    /// Position the override occupied
    pub(crate) index: usize,
    /// Whether the entry was removed from the pool
    pub(crate) removed: bool,
}

impl PoolState {
    fn position(&self, url: &str) -> Option<usize> {
        self.endpoints.iter().position(|e| e.url == url)
    }

    fn current(&self) -> &Endpoint {
        &self.endpoints[self.current]
    }

    /// Pin `url` as the current endpoint, appending it if absent
    pub(crate) fn install_override(&mut self, url: &str) {
        if self.endpoints.iter().any(|e| e.is_user_override && e.url != url) {
            self.release_override();
        }

        match self.position(url) {
            Some(idx) => {
                self.endpoints[idx].is_user_override = true;
                self.current = idx;
            }
            None => {
                self.endpoints.push(Endpoint::user_override(url));
                self.appended_override = Some(url.to_string());
                self.current = self.endpoints.len() - 1;
            }
        }
    }

    /// Drop the override flag, removing the entry if it was appended.
    ///
    /// When the removed entry was current, the pointer is parked at 0 and the
    /// caller is expected to reselect.
    pub(crate) fn release_override(&mut self) -> Option<Released> {
        let index = self.endpoints.iter().position(|e| e.is_user_override)?;
        self.endpoints[index].is_user_override = false;

        let appended =
            self.appended_override.as_deref() == Some(self.endpoints[index].url.as_str());
        if !appended || self.endpoints.len() == 1 {
            return Some(Released {
                index,
                removed: false,
            });
        }

        self.endpoints.remove(index);
        self.appended_override = None;
        if self.current > index {
            self.current -= 1;
        } else if self.current == index {
            self.current = 0;
        }

        Some(Released {
            index,
            removed: true,
        })
    }
}

/// Point-in-time copy of the pool
#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    pub endpoints: Vec<Endpoint>,
    pub current: usize,
    pub override_active: bool,
}

impl PoolSnapshot {
    pub fn current(&self) -> &Endpoint {
        &self.endpoints[self.current]
    }
}

/// Inputs the network status bridge derives health from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthInputs {
    pub current_failures: u32,
    pub any_healthy: bool,
    pub threshold: u32,
}

impl EndpointRegistry {
    /// Create a registry seeded from endpoint configs, ordered by priority
    /// (highest first).
    ///
    /// An empty seed falls back to the built-in local endpoint, so the pool
    /// is never empty.
    pub fn new(
        configs: &[EndpointConfig],
        threshold: u32,
        latency_weight: f64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut endpoints: Vec<Endpoint> = Vec::with_capacity(configs.len());
        for cfg in configs {
            if endpoints.iter().any(|e| e.url == cfg.url) {
                continue;
            }
            endpoints.push(Endpoint::from(cfg));
        }

        if endpoints.is_empty() {
            endpoints.push(Endpoint::new(LOCAL_ENDPOINT, 0));
        }

        // Stable: equal priorities keep their configured order
        endpoints.sort_by(|a, b| b.priority.cmp(&a.priority));

        let (revision, _) = watch::channel(0);

        Self {
            state: Mutex::new(PoolState {
                endpoints,
                current: 0,
                appended_override: None,
            }),
            threshold: threshold.max(1),
            latency_weight,
            clock,
            revision,
        }
    }

    pub fn from_config(config: &ManagerConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            &config.endpoints,
            config.failure_threshold,
            config.latency_weight,
            clock,
        )
    }

    /// Run a mutation under the lock and notify observers afterwards
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut PoolState) -> R) -> R {
        let result = {
            let mut state = self.state.lock();
            f(&mut state)
        };
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
        result
    }

    pub fn failure_threshold(&self) -> u32 {
        self.threshold
    }

    /// All endpoints in pool order
    pub fn list(&self) -> Vec<Endpoint> {
        self.state.lock().endpoints.clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.state
            .lock()
            .endpoints
            .iter()
            .map(|e| e.url.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().endpoints.len()
    }

    /// Always false: the pool keeps at least one endpoint
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn current(&self) -> Endpoint {
        self.state.lock().current().clone()
    }

    pub fn get(&self, url: &str) -> Option<Endpoint> {
        let state = self.state.lock();
        state.position(url).map(|idx| state.endpoints[idx].clone())
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.state.lock();
        PoolSnapshot {
            endpoints: state.endpoints.clone(),
            current: state.current,
            override_active: state.endpoints.iter().any(|e| e.is_user_override),
        }
    }

    pub fn health_inputs(&self) -> HealthInputs {
        let state = self.state.lock();
        HealthInputs {
            current_failures: state.current().consecutive_failures,
            any_healthy: state
                .endpoints
                .iter()
                .any(|e| e.is_healthy(self.threshold)),
            threshold: self.threshold,
        }
    }

    /// Reset the failure count and fold `latency_ms` into the moving average
    pub fn record_success(&self, url: &str, latency_ms: f64) {
        let now = self.clock.now();
        let weight = self.latency_weight;
        let threshold = self.threshold;

        let recovered = self.update(|state| {
            let idx = state.position(url)?;
            let endpoint = &mut state.endpoints[idx];
            let was_unhealthy = !endpoint.is_healthy(threshold);
            endpoint.apply_success(latency_ms, weight, now);
            Some(was_unhealthy)
        });

        match recovered {
            Some(true) => tracing::info!("Endpoint {} recovered", url),
            Some(false) => {}
            None => tracing::debug!("Ignoring success for unknown endpoint {}", url),
        }
    }

    /// Count a failure; crossing the threshold takes the endpoint out of rotation
    pub fn record_failure(&self, url: &str, reason: &str) {
        let now = self.clock.now();
        let threshold = self.threshold;

        let failures = self.update(|state| {
            let idx = state.position(url)?;
            let endpoint = &mut state.endpoints[idx];
            endpoint.apply_failure(reason.to_string(), now);
            Some(endpoint.consecutive_failures)
        });

        match failures {
            Some(n) if n == threshold => {
                tracing::warn!(
                    "Endpoint {} marked unhealthy after {} consecutive failures: {}",
                    url,
                    n,
                    reason
                );
            }
            Some(n) => tracing::debug!("Endpoint {} failure #{}: {}", url, n, reason),
            None => tracing::debug!("Ignoring failure for unknown endpoint {}", url),
        }
    }

    /// Pin the current pointer to `url`, inserting it if absent.
    ///
    /// The URL is not validated here; see
    /// [`EndpointSelector::set_custom_endpoint`](crate::rpc::EndpointSelector::set_custom_endpoint).
    pub fn set_override(&self, url: &str) {
        self.update(|state| state.install_override(url));
        tracing::info!("Endpoint override set to {}", url);
    }

    /// Release the override, returning whether one was active
    pub fn clear_override(&self) -> bool {
        let threshold = self.threshold;

        let released = self.update(|state| {
            let released = state.release_override()?;
            if released.removed {
                state.current = next_healthy(&state.endpoints, released.index, threshold)
                    .unwrap_or_else(|| least_failures(&state.endpoints));
            }
            Some(released)
        });

        if released.is_some() {
            tracing::info!("Endpoint override cleared");
        }
        released.is_some()
    }

    /// Watch channel bumped on every mutation
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
