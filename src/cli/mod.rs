//! CLI command modules
//!
//! Each subcommand has its own module with argument definitions and handlers.

pub mod call;
pub mod config;
pub mod endpoints;
pub mod watch;

use clap::{Parser, Subcommand};
use rpc_manager::{Chain, ConfigFile, EndpointConfig, ManagerConfig, RpcManager};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rpc-manager")]
#[command(
    version,
    about = "Resilient JSON-RPC client with endpoint health probing and automatic failover"
)]
#[command(after_help = r#"EXAMPLES:
    # Current block via the best available endpoint
    rpc-manager call eth_blockNumber

    # Call with params, pinned to a specific node
    rpc-manager --pin https://my-node.example/rpc call eth_getBalance '["0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045", "latest"]'

    # Probe every endpoint once
    rpc-manager endpoints probe

    # Watch endpoint health and network status
    rpc-manager --chain polygon watch --rounds 5

CONFIG FILE:
    Default: ~/.config/rpc-manager/config.toml
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Chain to query (defaults to the config file chain, then ethereum)
    #[arg(long, global = true)]
    pub chain: Option<String>,

    /// RPC endpoint to use instead of the chain defaults (repeatable)
    #[arg(long = "rpc", value_name = "URL", global = true)]
    pub rpc: Vec<String>,

    /// Pin a custom endpoint for this run
    #[arg(long, value_name = "URL", global = true)]
    pub pin: Option<String>,

    /// Config file path
    #[arg(long, env = "RPC_MANAGER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a single JSON-RPC call
    Call(call::CallArgs),

    /// Manage and test RPC endpoints
    Endpoints {
        #[command(subcommand)]
        action: endpoints::EndpointCommands,
    },

    /// Probe endpoints periodically and report network status
    Watch(watch::WatchArgs),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: config::ConfigCommands,
    },
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(ConfigFile::default_path)
    }

    pub fn load_config_file(&self) -> anyhow::Result<Option<ConfigFile>> {
        Ok(ConfigFile::load_optional(&self.config_path())?)
    }

    /// Resolve the manager config from CLI flags layered over the config file
    pub fn manager_config(&self, file: Option<&ConfigFile>) -> anyhow::Result<ManagerConfig> {
        let chain: Chain = match self
            .chain
            .as_deref()
            .or_else(|| file.and_then(|f| f.chain.as_deref()))
        {
            Some(name) => name.parse()?,
            None => Chain::default(),
        };

        let mut builder = ManagerConfig::builder().chain(chain);
        if let Some(file) = file {
            builder = file.apply_to(builder);
        }

        if !self.rpc.is_empty() {
            builder = builder.endpoints(
                self.rpc
                    .iter()
                    .map(|url| EndpointConfig::new(url.clone()).with_priority(10)),
            );
        }

        Ok(builder.build()?)
    }

    /// Build a manager and apply the pinned endpoint, if any.
    ///
    /// `--pin` wins over the config file's `custom_endpoint`.
    pub fn build_manager(&self) -> anyhow::Result<RpcManager> {
        let file = self.load_config_file()?;
        let config = self.manager_config(file.as_ref())?;
        let manager = RpcManager::from_config(config)?;

        let pinned = self
            .pin
            .clone()
            .or_else(|| file.and_then(|f| f.custom_endpoint));
        if let Some(url) = pinned {
            let endpoint = manager.set_custom_endpoint(&url)?;
            tracing::info!("Using pinned endpoint {}", endpoint.url);
        }

        Ok(manager)
    }
}
