//! Endpoint health record

use crate::config::EndpointConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A pool member together with its live health metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Endpoint {
    /// RPC URL, unique within a pool
    pub url: String,
    /// Priority (higher = preferred)
    pub priority: u8,
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// Exponential moving average of successful call latency
    pub average_latency_ms: f64,
    /// Last time a call or probe against this endpoint completed
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Last time a call or probe against this endpoint failed
    pub last_failed_at: Option<DateTime<Utc>>,
    /// Failure reason of the last failed call
    pub last_error: Option<String>,
    /// Total successful calls, used to seed the moving average
    pub success_count: u64,
    /// Pinned by the user; automatic failover never moves off it
    pub is_user_override: bool,
    /// Optional note about the endpoint
    pub note: Option<String>,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, priority: u8) -> Self {
        Self {
            url: url.into(),
            priority,
            consecutive_failures: 0,
            average_latency_ms: 0.0,
            last_checked_at: None,
            last_failed_at: None,
            last_error: None,
            success_count: 0,
            is_user_override: false,
            note: None,
        }
    }

    /// A user-pinned endpoint that was not part of the configured pool
    pub fn user_override(url: impl Into<String>) -> Self {
        Self {
            is_user_override: true,
            ..Self::new(url, 0)
        }
    }

    /// Healthy endpoints take part in normal rotation
    pub fn is_healthy(&self, threshold: u32) -> bool {
        self.consecutive_failures < threshold
    }

    pub(crate) fn apply_success(&mut self, latency_ms: f64, weight: f64, at: DateTime<Utc>) {
        self.consecutive_failures = 0;
        self.average_latency_ms = if self.success_count == 0 {
            latency_ms
        } else {
            weight * latency_ms + (1.0 - weight) * self.average_latency_ms
        };
        self.success_count = self.success_count.saturating_add(1);
        self.last_checked_at = Some(at);
    }

    pub(crate) fn apply_failure(&mut self, reason: String, at: DateTime<Utc>) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_checked_at = Some(at);
        self.last_failed_at = Some(at);
        self.last_error = Some(reason);
    }
}

impl From<&EndpointConfig> for Endpoint {
    fn from(config: &EndpointConfig) -> Self {
        Self {
            note: config.note.clone(),
            ..Self::new(config.url.clone(), config.priority)
        }
    }
}
