//! RPC endpoint management commands

use super::Cli;
use clap::Subcommand;
use rpc_manager::{
    validate_endpoint_url, EndpointConfig, ManagerConfig, ProbeOutcome, RpcManager, RpcRequest,
};
use std::io::Write;

#[derive(Subcommand)]
pub enum EndpointCommands {
    /// List the endpoint pool in rotation order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Test a single endpoint
    Test {
        /// RPC URL to test
        url: String,
    },

    /// Probe every endpoint once and report health
    Probe,
}

pub async fn handle(action: &EndpointCommands, cli: &Cli) -> anyhow::Result<()> {
    match action {
        EndpointCommands::List { json } => {
            let manager = cli.build_manager()?;
            let snapshot = manager.snapshot();

            if *json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
                return Ok(());
            }

            println!(
                "RPC ENDPOINTS for {} ({} configured)\n",
                manager.config().chain.display_name(),
                snapshot.endpoints.len()
            );

            for (idx, ep) in snapshot.endpoints.iter().enumerate() {
                let marker = if idx == snapshot.current { "*" } else { " " };
                println!(
                    "{} [{:>2}] {}{}{}",
                    marker,
                    ep.priority,
                    ep.url,
                    if ep.is_user_override { " (pinned)" } else { "" },
                    ep.note
                        .as_ref()
                        .map(|n| format!(" ({})", n))
                        .unwrap_or_default()
                );
            }
        }

        EndpointCommands::Test { url } => {
            let url = validate_endpoint_url(url)?;
            println!("Testing endpoint: {}\n", url);

            let config = ManagerConfig::builder()
                .endpoint(EndpointConfig::new(url))
                .max_retries(0)
                .build()?;
            let manager = RpcManager::from_config(config)?;

            print!("[1/2] Chain id.................. ");
            std::io::stdout().flush()?;
            match manager.execute(&RpcRequest::method("eth_chainId")).await {
                Ok(response) => println!("✓ {}", response.result),
                Err(e) => {
                    println!("✗ FAILED: {}", e);
                    return Ok(());
                }
            }

            print!("[2/2] Current block............. ");
            std::io::stdout().flush()?;
            match manager.block_number().await {
                Ok(block) => println!(
                    "✓ Block {} ({:.0}ms)",
                    block,
                    manager.current_endpoint().average_latency_ms
                ),
                Err(e) => println!("✗ FAILED: {}", e),
            }

            println!("\nEndpoint test complete.");
        }

        EndpointCommands::Probe => {
            let manager = cli.build_manager()?;
            if !cli.quiet {
                eprintln!("Probing {} endpoints...", manager.endpoints().len());
            }

            let outcomes = manager.probe_now().await;
            print_outcomes(&outcomes);
            println!("\nNetwork: {}", manager.network_health());
        }
    }

    Ok(())
}

/// One line per probe result
pub fn print_outcomes(outcomes: &[ProbeOutcome]) {
    for outcome in outcomes {
        match &outcome.result {
            Ok(latency) => println!(
                "  ✓ {:<50} {:>7.0}ms{}",
                outcome.url,
                latency,
                outcome
                    .block_number
                    .map(|b| format!("  block {}", b))
                    .unwrap_or_default()
            ),
            Err(e) => println!("  ✗ {:<50} {}", outcome.url, e),
        }
    }
}
