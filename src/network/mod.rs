//! Device connectivity and the derived network health signal

mod bridge;

pub use bridge::{derive_health, NetworkStatusBridge};

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Physical link type reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Wifi,
    Cellular,
    Ethernet,
    Other,
}

/// Device connectivity as reported by a platform network monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "kind", rename_all = "lowercase")]
pub enum Connectivity {
    /// Nothing reported yet
    #[default]
    Unknown,
    Offline,
    Online(ConnectionKind),
}

impl Connectivity {
    pub fn is_online(&self) -> bool {
        matches!(self, Connectivity::Online(_))
    }
}

/// Live connectivity signal, fed by the platform integration.
///
/// Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    sender: Arc<watch::Sender<Connectivity>>,
}

impl ConnectivityMonitor {
    pub fn new(initial: Connectivity) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Monitor for hosts without a platform signal (CLI, servers)
    pub fn always_online() -> Self {
        Self::new(Connectivity::Online(ConnectionKind::Other))
    }

    /// Publish a connectivity change; repeated values are not re-broadcast
    pub fn set(&self, connectivity: Connectivity) {
        self.sender.send_if_modified(|current| {
            if *current == connectivity {
                false
            } else {
                tracing::debug!("Connectivity changed: {:?} -> {:?}", current, connectivity);
                *current = connectivity;
                true
            }
        });
    }

    pub fn current(&self) -> Connectivity {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.sender.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(Connectivity::Unknown)
    }
}

/// Why the network is considered degraded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    /// The current endpoint has recent failures
    ElevatedErrors,
    /// Every endpoint in the pool is past the failure threshold
    AllEndpointsImpaired,
}

impl fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradedReason::ElevatedErrors => write!(f, "elevated latency/errors"),
            DegradedReason::AllEndpointsImpaired => write!(f, "all endpoints impaired"),
        }
    }
}

/// Externally observable network status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum NetworkHealth {
    Healthy,
    Degraded(DegradedReason),
    Offline,
    Unknown,
}

impl fmt::Display for NetworkHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkHealth::Healthy => write!(f, "healthy"),
            NetworkHealth::Degraded(reason) => write!(f, "degraded ({})", reason),
            NetworkHealth::Offline => write!(f, "offline"),
            NetworkHealth::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_dedups_updates() {
        let monitor = ConnectivityMonitor::default();
        let mut rx = monitor.subscribe();
        rx.borrow_and_update();

        monitor.set(Connectivity::Online(ConnectionKind::Wifi));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        monitor.set(Connectivity::Online(ConnectionKind::Wifi));
        assert!(!rx.has_changed().unwrap());

        monitor.set(Connectivity::Offline);
        assert_eq!(*rx.borrow_and_update(), Connectivity::Offline);
        assert!(!monitor.current().is_online());
    }

    #[test]
    fn test_health_display() {
        assert_eq!(
            NetworkHealth::Degraded(DegradedReason::ElevatedErrors).to_string(),
            "degraded (elevated latency/errors)"
        );
        assert_eq!(NetworkHealth::Offline.to_string(), "offline");
    }

    #[test]
    fn test_health_serializes_tagged() {
        let json = serde_json::to_value(NetworkHealth::Degraded(
            DegradedReason::AllEndpointsImpaired,
        ))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "degraded", "reason": "all_endpoints_impaired"})
        );
    }
}
