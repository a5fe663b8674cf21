//! Merges device connectivity with endpoint health into one status stream

use super::{Connectivity, ConnectivityMonitor, DegradedReason, NetworkHealth};
use crate::rpc::{EndpointRegistry, HealthInputs};
use futures::stream::{self, Stream};
use std::sync::Arc;
use tokio::sync::watch;

/// Derive the network status from connectivity and registry state
pub fn derive_health(connectivity: Connectivity, inputs: HealthInputs) -> NetworkHealth {
    match connectivity {
        Connectivity::Unknown => NetworkHealth::Unknown,
        Connectivity::Offline => NetworkHealth::Offline,
        Connectivity::Online(_) => {
            if inputs.current_failures == 0 {
                NetworkHealth::Healthy
            } else if inputs.current_failures < inputs.threshold || inputs.any_healthy {
                NetworkHealth::Degraded(DegradedReason::ElevatedErrors)
            } else {
                NetworkHealth::Degraded(DegradedReason::AllEndpointsImpaired)
            }
        }
    }
}

/// Observable network status.
///
/// Every stream returned by [`observe`](Self::observe) yields the current
/// value first, then each distinct change. Streams are independent, so
/// resubscribing simply starts over from the latest value.
#[derive(Clone)]
pub struct NetworkStatusBridge {
    registry: Arc<EndpointRegistry>,
    connectivity: ConnectivityMonitor,
}

struct ObserveState {
    registry: Arc<EndpointRegistry>,
    revisions: watch::Receiver<u64>,
    connectivity: watch::Receiver<Connectivity>,
    last: Option<NetworkHealth>,
}

impl ObserveState {
    fn recompute(&mut self) -> NetworkHealth {
        self.revisions.borrow_and_update();
        let connectivity = *self.connectivity.borrow_and_update();
        derive_health(connectivity, self.registry.health_inputs())
    }
}

impl NetworkStatusBridge {
    pub fn new(registry: Arc<EndpointRegistry>, connectivity: ConnectivityMonitor) -> Self {
        Self {
            registry,
            connectivity,
        }
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    /// Current status, computed on demand
    pub fn current(&self) -> NetworkHealth {
        derive_health(self.connectivity.current(), self.registry.health_inputs())
    }

    /// Lazy, infinite stream of status changes, starting with the current value
    pub fn observe(&self) -> impl Stream<Item = NetworkHealth> + Send + 'static {
        let state = ObserveState {
            registry: self.registry.clone(),
            revisions: self.registry.subscribe(),
            connectivity: self.connectivity.subscribe(),
            last: None,
        };

        stream::unfold(state, |mut state| async move {
            if state.last.is_none() {
                let health = state.recompute();
                state.last = Some(health);
                return Some((health, state));
            }

            loop {
                tokio::select! {
                    changed = state.revisions.changed() => changed.ok()?,
                    changed = state.connectivity.changed() => changed.ok()?,
                }

                let health = state.recompute();
                if state.last != Some(health) {
                    state.last = Some(health);
                    return Some((health, state));
                }
            }
        })
    }
}
