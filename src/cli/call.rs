//! Single JSON-RPC call

use super::Cli;
use clap::Args;
use rpc_manager::RpcRequest;
use serde_json::Value;

#[derive(Args)]
pub struct CallArgs {
    /// JSON-RPC method (e.g. eth_blockNumber)
    pub method: String,

    /// Params as JSON: an array, or a single value wrapped as one param
    pub params: Option<String>,

    /// Print the result without pretty-printing
    #[arg(long)]
    pub raw: bool,
}

/// Parse the positional params argument into a JSON-RPC params list
pub fn parse_params(raw: Option<&str>) -> anyhow::Result<Vec<Value>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    let value: Value = serde_json::from_str(raw)
        .map_err(|e| anyhow::anyhow!("Invalid params JSON: {}", e))?;

    Ok(match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    })
}

pub async fn handle(args: &CallArgs, cli: &Cli) -> anyhow::Result<()> {
    let params = parse_params(args.params.as_deref())?;
    let manager = cli.build_manager()?;

    let request = RpcRequest::new(&args.method, params);
    let response = manager.execute(&request).await?;

    if args.raw {
        println!("{}", response.result);
    } else {
        println!("{}", serde_json::to_string_pretty(&response.result)?);
    }

    if !cli.quiet {
        eprintln!("via {}", manager.current_endpoint().url);
    }

    Ok(())
}
