//! rpc-manager - Resilient JSON-RPC endpoint management
//!
//! A Rust library and CLI that keeps a prioritized pool of RPC endpoints,
//! probes their health in the background, fails over automatically when
//! calls fail, and publishes an observable network status.
//!
//! # Example
//!
//! ```rust,no_run
//! use rpc_manager::{Chain, ManagerConfig, RpcManager, RpcRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ManagerConfig::builder()
//!         .chain(Chain::Ethereum)
//!         .max_retries(2)
//!         .build()?;
//!
//!     let manager = RpcManager::from_config(config)?;
//!     manager.start();
//!
//!     let response = manager.execute(&RpcRequest::method("eth_chainId")).await?;
//!     println!("chain id: {}", response.result);
//!
//!     manager.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod manager;
pub mod network;
pub mod rpc;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    Chain, ConfigFile, EndpointConfig, ManagerConfig, ManagerConfigBuilder, LOCAL_ENDPOINT,
};
pub use error::{ConfigError, Error, Result, RpcError};
pub use manager::RpcManager;
pub use network::{
    ConnectionKind, Connectivity, ConnectivityMonitor, DegradedReason, NetworkHealth,
    NetworkStatusBridge,
};
pub use rpc::{
    default_endpoints, validate_endpoint_url, Dispatcher, Endpoint, EndpointRegistry,
    EndpointSelector, HealthProber, HttpTransport, PoolSnapshot, ProbeOutcome, RetryPolicy,
    RpcRequest, RpcResponse, RpcTransport,
};
