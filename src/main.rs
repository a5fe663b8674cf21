//! rpc-manager CLI - Resilient JSON-RPC client with automatic failover

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match &cli.command {
        Commands::Call(args) => cli::call::handle(args, &cli).await,
        Commands::Endpoints { action } => cli::endpoints::handle(action, &cli).await,
        Commands::Watch(args) => cli::watch::handle(args, &cli).await,
        Commands::Config { action } => cli::config::handle(action, &cli).await,
    }
}
