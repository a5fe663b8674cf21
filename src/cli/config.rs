//! Configuration management commands

use super::Cli;
use clap::Subcommand;
use rpc_manager::{validate_endpoint_url, ConfigFile};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show config file path
    Path,

    /// Show current config
    Show,

    /// Pin a custom endpoint for future runs
    SetEndpoint {
        /// RPC URL
        url: String,
    },

    /// Remove the pinned endpoint
    ClearEndpoint,
}

pub async fn handle(action: &ConfigCommands, cli: &Cli) -> anyhow::Result<()> {
    let path = cli.config_path();

    match action {
        ConfigCommands::Path => {
            println!("{}", path.display());
        }

        ConfigCommands::Show => {
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                println!("# {}\n", path.display());
                println!("{}", content);
            } else {
                println!("No config file found at: {}", path.display());
                println!("\nCreate one with:");
                println!("  rpc-manager config set-endpoint https://your-node.example/rpc");
            }
        }

        ConfigCommands::SetEndpoint { url } => {
            let url = validate_endpoint_url(url)?;
            let mut config = ConfigFile::load_optional(&path)?.unwrap_or_default();
            config.custom_endpoint = Some(url.clone());
            config.save(&path)?;
            println!("Pinned endpoint {} saved to {}", url, path.display());
        }

        ConfigCommands::ClearEndpoint => match ConfigFile::load_optional(&path)? {
            Some(mut config) if config.custom_endpoint.is_some() => {
                config.custom_endpoint = None;
                config.save(&path)?;
                println!("Pinned endpoint cleared.");
            }
            _ => println!("No pinned endpoint configured."),
        },
    }

    Ok(())
}
