//! Background health prober

use crate::config::ManagerConfig;
use crate::error::RpcError;
use crate::rpc::{EndpointRegistry, RpcRequest, RpcTransport};
use futures::future::join_all;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Probe schedule and request shape
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSettings {
    pub interval: Duration,
    pub jitter: Duration,
    pub timeout: Duration,
    pub method: String,
}

impl ProbeSettings {
    pub fn from_config(config: &ManagerConfig) -> Self {
        Self {
            interval: config.probe_interval,
            jitter: config.probe_jitter,
            timeout: config.probe_timeout,
            method: config.probe_method.clone(),
        }
    }

    /// Interval with uniform +/- jitter applied, never below zero
    pub fn next_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as i64;
        if jitter_ms == 0 {
            return self.interval;
        }

        let offset = rand::thread_rng().gen_range(-jitter_ms..=jitter_ms);
        let delay = self.interval.as_millis() as i64 + offset;
        Duration::from_millis(delay.max(0) as u64)
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self::from_config(&ManagerConfig::default())
    }
}

/// Result of probing one endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub url: String,
    /// Latency in milliseconds on success
    pub result: Result<f64, RpcError>,
    /// Block height, when the probe method returns a quantity
    pub block_number: Option<u64>,
}

/// Periodically measures every endpoint and writes results to the registry.
///
/// The prober only ever writes health data; it never moves the current
/// endpoint pointer.
pub struct HealthProber {
    registry: Arc<EndpointRegistry>,
    transport: Arc<dyn RpcTransport>,
    settings: ProbeSettings,
}

impl HealthProber {
    pub fn new(
        registry: Arc<EndpointRegistry>,
        transport: Arc<dyn RpcTransport>,
        settings: ProbeSettings,
    ) -> Self {
        Self {
            registry,
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// Probe every endpoint in the pool concurrently, override included
    pub async fn probe_once(&self) -> Vec<ProbeOutcome> {
        let urls = self.registry.urls();
        tracing::debug!("Probing {} endpoints", urls.len());

        let outcomes = join_all(urls.into_iter().map(|url| self.probe_url(url))).await;

        let healthy = outcomes.iter().filter(|o| o.result.is_ok()).count();
        tracing::debug!("Probe round done: {}/{} responded", healthy, outcomes.len());
        outcomes
    }

    /// Probe a single URL and record the outcome
    pub async fn probe_url(&self, url: String) -> ProbeOutcome {
        let request = RpcRequest::method(self.settings.method.clone());
        let timeout = self.settings.timeout;
        let started = Instant::now();

        let result =
            match tokio::time::timeout(timeout, self.transport.call(&url, &request, timeout)).await
            {
                Ok(result) => result,
                Err(_) => Err(RpcError::Timeout {
                    url: url.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };

        match result {
            Ok(response) => {
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                self.registry.record_success(&url, latency_ms);
                ProbeOutcome {
                    block_number: response.as_quantity(),
                    url,
                    result: Ok(latency_ms),
                }
            }
            Err(e) => {
                self.registry.record_failure(&url, &e.to_string());
                ProbeOutcome {
                    url,
                    result: Err(e),
                    block_number: None,
                }
            }
        }
    }

    /// Run probe rounds until `cancel` fires. The first round starts
    /// immediately.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> ProberHandle {
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            tracing::info!(
                "Health prober started (interval {:?} +/- {:?})",
                self.settings.interval,
                self.settings.jitter
            );

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = self.probe_once() => {}
                }

                let delay = self.settings.next_delay();
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            tracing::info!("Health prober stopped");
        });

        ProberHandle {
            cancel,
            task: Some(task),
        }
    }
}

/// Handle to a running prober task
pub struct ProberHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ProberHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the timer and wait for the task to exit
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Health prober task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for ProberHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::EndpointConfig;
    use crate::rpc::transport::testing::{Behavior, FakeTransport};
    use serde_json::json;

    type Fixture = (Arc<EndpointRegistry>, Arc<FakeTransport>, Arc<HealthProber>);

    fn setup(urls: &[&str], transport: FakeTransport) -> Fixture {
        let configs: Vec<_> = urls.iter().map(|u| EndpointConfig::new(*u)).collect();
        let registry = Arc::new(EndpointRegistry::new(&configs, 3, 0.3, Arc::new(SystemClock)));
        let transport = Arc::new(transport);
        let prober = Arc::new(HealthProber::new(
            registry.clone(),
            transport.clone(),
            ProbeSettings::default(),
        ));
        (registry, transport, prober)
    }

    #[test]
    fn test_jitter_bounds() {
        let settings = ProbeSettings::default();
        for _ in 0..200 {
            let delay = settings.next_delay();
            assert!(delay >= Duration::from_secs(25));
            assert!(delay <= Duration::from_secs(35));
        }

        let fixed = ProbeSettings {
            jitter: Duration::ZERO,
            ..ProbeSettings::default()
        };
        assert_eq!(fixed.next_delay(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_once_records_results() {
        let (registry, transport, prober) = setup(
            &["https://up", "https://down", "https://slow"],
            FakeTransport::new()
                .with("https://up", Behavior::Succeed(json!("0x10")))
                .with("https://down", Behavior::Fail)
                .with("https://slow", Behavior::Hang),
        );

        let outcomes = prober.probe_once().await;
        assert_eq!(outcomes.len(), 3);

        let up = outcomes.iter().find(|o| o.url == "https://up").unwrap();
        assert!(up.result.is_ok());
        assert_eq!(up.block_number, Some(16));

        let slow = outcomes.iter().find(|o| o.url == "https://slow").unwrap();
        assert!(matches!(slow.result, Err(RpcError::Timeout { timeout_ms: 5000, .. })));

        assert_eq!(registry.get("https://up").unwrap().success_count, 1);
        assert_eq!(registry.get("https://down").unwrap().consecutive_failures, 1);
        assert_eq!(registry.get("https://slow").unwrap().consecutive_failures, 1);
        assert!(transport
            .log()
            .iter()
            .all(|(_, method)| method == "eth_blockNumber"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_includes_override_and_keeps_pointer() {
        let (registry, transport, prober) = setup(
            &["https://a", "https://b"],
            FakeTransport::new().with("https://a", Behavior::Fail),
        );
        registry.set_override("https://mine");

        for _ in 0..3 {
            prober.probe_once().await;
        }

        assert_eq!(transport.calls("https://mine"), 3);
        assert_eq!(registry.get("https://a").unwrap().consecutive_failures, 3);
        // Probing never rotates
        assert_eq!(registry.current().url, "https://mine");
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_prober_runs_on_schedule_and_stops() {
        let (_registry, transport, prober) = setup(&["https://a"], FakeTransport::new());
        let handle = prober.spawn(CancellationToken::new());

        // Immediate round, then one per interval (at most 35s apart)
        tokio::time::sleep(Duration::from_secs(36)).await;
        let calls = transport.calls("https://a");
        assert!(calls >= 2, "expected at least two rounds, got {}", calls);
        assert!(handle.is_running());

        handle.shutdown().await;
        let after = transport.calls("https://a");
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.calls("https://a"), after);
    }
}
