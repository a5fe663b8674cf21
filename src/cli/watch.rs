//! Continuous health monitoring

use super::endpoints::print_outcomes;
use super::Cli;
use clap::Args;
use futures::StreamExt;

#[derive(Args)]
pub struct WatchArgs {
    /// Stop after this many probe rounds (runs until Ctrl-C by default)
    #[arg(long)]
    pub rounds: Option<u32>,
}

pub async fn handle(args: &WatchArgs, cli: &Cli) -> anyhow::Result<()> {
    let manager = cli.build_manager()?;
    let interval = manager.config().probe_interval;
    let mut health = Box::pin(manager.observe_network_health());

    if !cli.quiet {
        eprintln!(
            "Watching {} endpoints every {:?} (Ctrl-C to stop)",
            manager.endpoints().len(),
            interval
        );
    }

    let mut round = 0u32;
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            Some(status) = health.next() => {
                println!("[{}] network: {}", chrono::Utc::now().format("%H:%M:%S"), status);
            }

            _ = ticker.tick() => {
                round += 1;

                let outcomes = manager.probe_now().await;
                println!(
                    "[{}] round {}, current {}",
                    chrono::Utc::now().format("%H:%M:%S"),
                    round,
                    manager.current_endpoint().url
                );
                print_outcomes(&outcomes);

                if args.rounds.is_some_and(|max| round >= max) {
                    break;
                }
            }
        }
    }

    manager.shutdown().await;
    Ok(())
}
