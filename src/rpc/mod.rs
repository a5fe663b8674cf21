//! RPC endpoint management: the pool, health probing, rotation and dispatch

mod defaults;
mod dispatcher;
mod endpoint;
mod prober;
mod registry;
mod selector;
pub(crate) mod transport;
pub mod types;

pub use defaults::default_endpoints;
pub use dispatcher::{Dispatcher, RetryPolicy};
pub use endpoint::Endpoint;
pub use prober::{HealthProber, ProbeOutcome, ProbeSettings, ProberHandle};
pub use registry::{EndpointRegistry, HealthInputs, PoolSnapshot};
pub use selector::{validate_endpoint_url, EndpointSelector};
pub use transport::{HttpTransport, RpcTransport};
pub use types::{RpcRequest, RpcResponse};
