//! Request dispatcher: one RPC call with bounded retry and failover

use crate::config::ManagerConfig;
use crate::error::RpcError;
use crate::rpc::{EndpointRegistry, EndpointSelector, RpcRequest, RpcResponse, RpcTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Retry budget and per-attempt timeout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_factor: u32,
    pub request_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ManagerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: config.backoff_base,
            backoff_factor: config.backoff_factor,
            request_timeout: config.request_timeout,
        }
    }

    /// Total attempts a call may make
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based): base * factor^(retry-1)
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let multiplier = self.backoff_factor.saturating_pow(exponent);
        self.backoff_base.saturating_mul(multiplier)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ManagerConfig::default())
    }
}

/// Executes RPC calls against the registry's current endpoint
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<EndpointRegistry>,
    selector: EndpointSelector,
    transport: Arc<dyn RpcTransport>,
    policy: RetryPolicy,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<EndpointRegistry>,
        transport: Arc<dyn RpcTransport>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            selector: EndpointSelector::new(registry.clone()),
            registry,
            transport,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Execute `request`, retrying on failure.
    ///
    /// Each failed attempt is recorded against its endpoint and, unless the
    /// endpoint is a user override, triggers failover before the next
    /// attempt. Only the final outcome is returned. Dropping the returned
    /// future mid-call records nothing for the interrupted attempt.
    pub async fn execute(&self, request: &RpcRequest) -> Result<RpcResponse, RpcError> {
        self.dispatch(request).await.map(|(_, response)| response)
    }

    /// Execute `request`, returning the URL that answered alongside the response
    async fn dispatch(&self, request: &RpcRequest) -> Result<(String, RpcResponse), RpcError> {
        let attempts = self.policy.attempts();
        let mut last_error = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = self.policy.backoff(attempt - 1);
                tracing::debug!("Retrying {} in {:?}", request.method, delay);
                tokio::time::sleep(delay).await;
            }

            let endpoint = self.registry.current();
            tracing::debug!(
                "{} attempt {}/{} via {}",
                request.method,
                attempt,
                attempts,
                endpoint.url
            );

            let started = Instant::now();
            match self.call_with_timeout(&endpoint.url, request).await {
                Ok(response) => {
                    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                    self.registry.record_success(&endpoint.url, latency_ms);
                    return Ok((endpoint.url, response));
                }
                Err(e) => {
                    tracing::debug!("{} failed on {}: {}", request.method, endpoint.url, e);
                    self.registry.record_failure(&endpoint.url, &e.to_string());
                    if !endpoint.is_user_override {
                        self.selector.rotate_after_failure(&endpoint.url);
                    }
                    last_error = Some(e);
                }
            }
        }

        let last = last_error.unwrap_or(RpcError::Cancelled);
        if self.registry.health_inputs().any_healthy {
            Err(last)
        } else {
            Err(RpcError::AllEndpointsUnhealthy {
                attempts,
                last: Box::new(last),
            })
        }
    }

    /// Like [`execute`](Self::execute), abandoning the call when `cancel` fires
    pub async fn execute_with_cancel(
        &self,
        request: &RpcRequest,
        cancel: &CancellationToken,
    ) -> Result<RpcResponse, RpcError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("{} cancelled", request.method);
                Err(RpcError::Cancelled)
            }
            result = self.execute(request) => result,
        }
    }

    /// Current block height via `eth_blockNumber`
    pub async fn block_number(&self) -> Result<u64, RpcError> {
        let (url, response) = self.dispatch(&RpcRequest::method("eth_blockNumber")).await?;
        response.as_quantity().ok_or_else(|| RpcError::Protocol {
            url,
            code: crate::rpc::types::INTERNAL_ERROR,
            message: format!("unexpected block number: {}", response.result),
        })
    }

    async fn call_with_timeout(
        &self,
        url: &str,
        request: &RpcRequest,
    ) -> Result<RpcResponse, RpcError> {
        let timeout = self.policy.request_timeout;
        match tokio::time::timeout(timeout, self.transport.call(url, request, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::EndpointConfig;
    use crate::rpc::transport::testing::{Behavior, FakeTransport};
    use serde_json::json;

    type Fixture = (Arc<EndpointRegistry>, Arc<FakeTransport>, Dispatcher);

    fn setup(urls: &[&str], transport: FakeTransport) -> Fixture {
        let configs: Vec<_> = urls.iter().map(|u| EndpointConfig::new(*u)).collect();
        let registry = Arc::new(EndpointRegistry::new(&configs, 3, 0.3, Arc::new(SystemClock)));
        let transport = Arc::new(transport);
        let dispatcher =
            Dispatcher::new(registry.clone(), transport.clone(), RetryPolicy::default());
        (registry, transport, dispatcher)
    }

    fn block_number() -> RpcRequest {
        RpcRequest::method("eth_blockNumber")
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(250));
        assert_eq!(policy.backoff(2), Duration::from_millis(500));
        assert_eq!(policy.backoff(3), Duration::from_millis(1000));
    }

    #[test]
    fn test_attempts_saturate() {
        assert_eq!(RetryPolicy::default().attempts(), 3);
        let unbounded = RetryPolicy {
            max_retries: u32::MAX,
            ..RetryPolicy::default()
        };
        assert_eq!(unbounded.attempts(), u32::MAX);
    }

    #[tokio::test]
    async fn test_block_number_error_names_answering_endpoint() {
        let (registry, _transport, dispatcher) = setup(
            &["https://rpc1", "https://rpc2"],
            FakeTransport::new().with("https://rpc1", Behavior::Succeed(json!("pending"))),
        );

        // Another caller moves the pool while rpc1 is answering
        let selector = EndpointSelector::new(registry.clone());
        let switcher = tokio::spawn(async move { selector.switch_to_next_endpoint() });

        let err = dispatcher.block_number().await.unwrap_err();
        switcher.await.unwrap();

        assert_eq!(registry.current().url, "https://rpc2");
        assert!(matches!(err, RpcError::Protocol { .. }));
        assert_eq!(err.url(), Some("https://rpc1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_records_latency() {
        let (registry, transport, dispatcher) = setup(
            &["https://rpc1"],
            FakeTransport::new().with("https://rpc1", Behavior::Succeed(json!("0x2a"))),
        );

        let response = dispatcher.execute(&block_number()).await.unwrap();
        assert_eq!(response.as_quantity(), Some(42));
        assert_eq!(transport.calls("https://rpc1"), 1);

        let ep = registry.current();
        assert_eq!(ep.consecutive_failures, 0);
        assert_eq!(ep.success_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failover_to_healthy_endpoint() {
        let (registry, transport, dispatcher) = setup(
            &["https://rpc1", "https://rpc2"],
            FakeTransport::new()
                .with("https://rpc1", Behavior::Fail)
                .with("https://rpc2", Behavior::Succeed(json!("0x1"))),
        );

        dispatcher.execute(&block_number()).await.unwrap();
        assert_eq!(transport.calls("https://rpc1"), 1);
        assert_eq!(transport.calls("https://rpc2"), 1);
        assert_eq!(registry.current().url, "https://rpc2");

        // Subsequent calls go straight to rpc2
        dispatcher.execute(&block_number()).await.unwrap();
        dispatcher.execute(&block_number()).await.unwrap();
        assert_eq!(transport.calls("https://rpc1"), 1);
        assert_eq!(transport.calls("https://rpc2"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rpc_error_code_triggers_failover() {
        let (registry, _transport, dispatcher) = setup(
            &["https://rpc1", "https://rpc2"],
            FakeTransport::new().with("https://rpc1", Behavior::RpcFail(-32005)),
        );

        dispatcher.execute(&block_number()).await.unwrap();
        assert_eq!(registry.get("https://rpc1").unwrap().consecutive_failures, 1);
        assert_eq!(registry.current().url, "https://rpc2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_exhausted() {
        let (registry, transport, dispatcher) = setup(
            &["https://rpc1"],
            FakeTransport::new().with("https://rpc1", Behavior::Fail),
        );

        let started = Instant::now();
        let err = dispatcher.execute(&block_number()).await.unwrap_err();

        // 1 attempt + 2 retries, waiting 250ms then 500ms
        assert_eq!(transport.calls("https://rpc1"), 3);
        assert!(started.elapsed() >= Duration::from_millis(750));

        match err {
            RpcError::AllEndpointsUnhealthy { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last.url(), Some("https://rpc1"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(registry.current().consecutive_failures, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_with_healthy_alternative_returns_last_error() {
        let (_registry, _transport, dispatcher) = setup(
            &["https://rpc1", "https://rpc2", "https://rpc3", "https://rpc4"],
            FakeTransport::new()
                .with("https://rpc1", Behavior::Fail)
                .with("https://rpc2", Behavior::Fail)
                .with("https://rpc3", Behavior::Fail),
        );

        let err = dispatcher.execute(&block_number()).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.url(), Some("https://rpc3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let (registry, _transport, dispatcher) = setup(
            &["https://slow", "https://fast"],
            FakeTransport::new().with("https://slow", Behavior::Hang),
        );

        dispatcher.execute(&block_number()).await.unwrap();
        let slow = registry.get("https://slow").unwrap();
        assert_eq!(slow.consecutive_failures, 1);
        assert!(slow.last_error.unwrap().contains("timed out"));
        assert_eq!(registry.current().url, "https://fast");
    }

    #[tokio::test(start_paused = true)]
    async fn test_override_is_not_rotated() {
        let (registry, transport, dispatcher) = setup(
            &["https://rpc1", "https://rpc2"],
            FakeTransport::new().with("https://mine", Behavior::Fail),
        );
        EndpointSelector::new(registry.clone())
            .set_custom_endpoint("https://mine")
            .unwrap();

        let err = dispatcher.execute(&block_number()).await.unwrap_err();
        assert_eq!(err.url(), Some("https://mine"));
        assert_eq!(transport.calls("https://mine"), 3);
        assert_eq!(transport.calls("https://rpc1"), 0);
        assert_eq!(registry.current().url, "https://mine");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_call_records_nothing() {
        let (registry, _transport, dispatcher) = setup(
            &["https://rpc1", "https://rpc2"],
            FakeTransport::new().with("https://rpc1", Behavior::Hang),
        );
        let cancel = CancellationToken::new();

        let task = {
            let dispatcher = dispatcher.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                dispatcher
                    .execute_with_cancel(&RpcRequest::method("eth_chainId"), &cancel)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();

        assert_eq!(task.await.unwrap(), Err(RpcError::Cancelled));
        let rpc1 = registry.get("https://rpc1").unwrap();
        assert_eq!(rpc1.consecutive_failures, 0);
        assert!(rpc1.last_checked_at.is_none());
        assert_eq!(registry.current().url, "https://rpc1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_with_flaky_endpoint() {
        let (registry, _transport, dispatcher) = setup(
            &["https://flaky", "https://stable"],
            FakeTransport::new().with("https://flaky", Behavior::FailEvery(3)),
        );
        let pool_size = registry.len() as u32;
        let budget = dispatcher.policy().attempts();

        let calls = (0..100).map(|_| {
            let dispatcher = dispatcher.clone();
            async move { dispatcher.execute(&block_number()).await }
        });
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(|r| r.is_ok()));
        for endpoint in registry.list() {
            assert!(endpoint.consecutive_failures <= pool_size * budget);
        }
    }
}
