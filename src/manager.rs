//! Public facade tying the pool, prober, dispatcher and status bridge together

use crate::clock::{Clock, SystemClock};
use crate::config::ManagerConfig;
use crate::error::{Result, RpcError};
use crate::network::{ConnectivityMonitor, NetworkHealth, NetworkStatusBridge};
use crate::rpc::{
    Dispatcher, Endpoint, EndpointRegistry, EndpointSelector, HealthProber, HttpTransport,
    PoolSnapshot, ProbeOutcome, ProbeSettings, ProberHandle, RetryPolicy, RpcRequest,
    RpcResponse, RpcTransport,
};
use futures::Stream;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// RPC endpoint manager.
///
/// Owns one endpoint pool and routes every call through its current
/// endpoint, failing over on errors. Background probing starts with
/// [`start`](Self::start) and stops with [`shutdown`](Self::shutdown) or
/// when the manager is dropped.
pub struct RpcManager {
    config: ManagerConfig,
    registry: Arc<EndpointRegistry>,
    selector: EndpointSelector,
    dispatcher: Dispatcher,
    prober: Arc<HealthProber>,
    bridge: NetworkStatusBridge,
    prober_handle: Mutex<Option<ProberHandle>>,
}

impl RpcManager {
    /// Build a manager from explicit collaborators
    pub fn new(
        config: ManagerConfig,
        transport: Arc<dyn RpcTransport>,
        clock: Arc<dyn Clock>,
        connectivity: ConnectivityMonitor,
    ) -> Self {
        let registry = Arc::new(EndpointRegistry::from_config(&config, clock));
        let selector = EndpointSelector::new(registry.clone());
        let dispatcher = Dispatcher::new(
            registry.clone(),
            transport.clone(),
            RetryPolicy::from_config(&config),
        );
        let prober = Arc::new(HealthProber::new(
            registry.clone(),
            transport,
            ProbeSettings::from_config(&config),
        ));
        let bridge = NetworkStatusBridge::new(registry.clone(), connectivity);

        tracing::debug!(
            "RPC manager for {} with {} endpoints",
            config.chain.display_name(),
            registry.len()
        );

        Self {
            config,
            registry,
            selector,
            dispatcher,
            prober,
            bridge,
            prober_handle: Mutex::new(None),
        }
    }

    /// Build a manager with the HTTP transport and the system clock,
    /// assuming the host is always online
    pub fn from_config(config: ManagerConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new()?);
        Ok(Self::new(
            config,
            transport,
            Arc::new(SystemClock),
            ConnectivityMonitor::always_online(),
        ))
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Start background health probing. Calling it again while the prober
    /// runs is a no-op. Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut handle = self.prober_handle.lock();
        if handle.as_ref().is_some_and(|h| h.is_running()) {
            return;
        }
        *handle = Some(self.prober.clone().spawn(CancellationToken::new()));
    }

    /// Stop background probing and wait for the prober to exit
    pub async fn shutdown(&self) {
        let handle = self.prober_handle.lock().take();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }

    pub fn is_probing(&self) -> bool {
        self.prober_handle
            .lock()
            .as_ref()
            .is_some_and(|h| h.is_running())
    }

    /// Run one probe round immediately, outside the schedule
    pub async fn probe_now(&self) -> Vec<ProbeOutcome> {
        self.prober.probe_once().await
    }

    /// Execute a JSON-RPC call with retry and failover
    pub async fn execute(&self, request: &RpcRequest) -> std::result::Result<RpcResponse, RpcError> {
        self.dispatcher.execute(request).await
    }

    pub async fn execute_with_cancel(
        &self,
        request: &RpcRequest,
        cancel: &CancellationToken,
    ) -> std::result::Result<RpcResponse, RpcError> {
        self.dispatcher.execute_with_cancel(request, cancel).await
    }

    pub async fn block_number(&self) -> std::result::Result<u64, RpcError> {
        self.dispatcher.block_number().await
    }

    /// Stream of network status changes, starting with the latest value
    pub fn observe_network_health(&self) -> impl Stream<Item = NetworkHealth> + Send + 'static {
        self.bridge.observe()
    }

    pub fn network_health(&self) -> NetworkHealth {
        self.bridge.current()
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        self.bridge.connectivity()
    }

    /// Manually advance to the next healthy endpoint, clearing any override
    pub fn switch_to_next_endpoint(&self) -> Endpoint {
        self.selector.switch_to_next_endpoint()
    }

    /// Pin a user-supplied endpoint until [`clear_override`](Self::clear_override)
    /// or [`switch_to_next_endpoint`](Self::switch_to_next_endpoint)
    pub fn set_custom_endpoint(&self, url: &str) -> std::result::Result<Endpoint, RpcError> {
        self.selector.set_custom_endpoint(url)
    }

    pub fn clear_override(&self) -> bool {
        self.selector.clear_override()
    }

    pub fn current_endpoint(&self) -> Endpoint {
        self.registry.current()
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.registry.list()
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        self.registry.snapshot()
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }
}
