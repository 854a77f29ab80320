use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use starknet_watch::{
    init_logging, AddressMapTransactions, AppConfig, ChainProvider, StarknetRpcClient, StarknetWatch, WatchList,
    WatcherError,
};

#[derive(Parser)]
#[command(name = "starknet-watcher")]
#[command(about = "Follows the Starknet head and prints watched transfers as JSON lines")]
#[command(version)]
struct Args {
    /// First block to replay; defaults to the current head
    #[arg(long)]
    start: Option<u64>,

    /// Override the RPC endpoint from the configuration
    #[arg(long)]
    rpc_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = AppConfig::load()?;
    if let Some(rpc_url) = args.rpc_url {
        config.rpc.endpoint = rpc_url;
        config.validate()?;
    }
    init_logging(&config.logging);

    let watch_list = WatchList::from_config(&config.watch);
    if watch_list.is_empty() {
        log::warn!("Watch list is empty, no transaction will ever match");
    }

    let client = Arc::new(StarknetRpcClient::new_with_timeout(
        config.rpc.endpoint.clone(),
        config.rpc.timeout_seconds,
    )?);

    let start = match args.start {
        Some(start) => start,
        None => client.get_latest_block_number().await?,
    };

    info!(
        "Following {} from block {} via {}",
        config.chain.name,
        start,
        client.endpoint()
    );

    let watch = StarknetWatch::new(config.chain, config.replay, client, Arc::new(watch_list));

    let mut on_block = |height: u64, txs: AddressMapTransactions| -> starknet_watch::Result<()> {
        if txs.is_empty() {
            return Ok(());
        }
        let line = serde_json::json!({ "blockNumber": height, "transactions": txs });
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line).map_err(|e| WatcherError::Sink(e.to_string()))?;
        stdout.flush().map_err(|e| WatcherError::Sink(e.to_string()))
    };

    tokio::select! {
        _ = watch.follow(start, &mut on_block) => {
            error!("Follow loop ended unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down watcher");
        }
    }

    Ok(())
}
