use std::sync::Arc;

use clap::{Parser, Subcommand};
use starknet_watch::{
    init_logging, AddressMapTransactions, AppConfig, ChainWatcher, StarknetRpcClient, StarknetWatch,
    WatchList,
};

#[derive(Parser)]
#[command(name = "starknet-replay")]
#[command(about = "Replays Starknet blocks or single transactions against the configured watch list")]
#[command(version)]
struct Cli {
    /// Override the RPC endpoint from the configuration
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a block range and print every non-empty block as a JSON line
    Block {
        /// First block to replay
        #[arg(long)]
        start: u64,
        /// Chain height the range is measured against; the last
        /// `min_confirmations` blocks below it are skipped
        #[arg(long)]
        end: u64,
    },
    /// Replay one transaction by hash
    Tx {
        #[arg(long)]
        hash: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Some(rpc_url) = cli.rpc_url {
        config.rpc.endpoint = rpc_url;
        config.validate()?;
    }
    init_logging(&config.logging);

    let client = StarknetRpcClient::new_with_timeout(config.rpc.endpoint.clone(), config.rpc.timeout_seconds)?;
    let watch_list = WatchList::from_config(&config.watch);

    match cli.command {
        Command::Block { start, end } => {
            let watch = StarknetWatch::new(config.chain, config.replay, Arc::new(client), Arc::new(watch_list));

            let mut on_block = |height: u64, txs: AddressMapTransactions| -> starknet_watch::Result<()> {
                if !txs.is_empty() {
                    println!("{}", serde_json::json!({ "blockNumber": height, "transactions": txs }));
                }
                Ok(())
            };

            let cursor = watch.replay_block(start, end, Some(&mut on_block)).await;
            log::info!("Replay finished, next block is {}", cursor.start);
        }
        Command::Tx { hash } => {
            let watch = StarknetWatch::new(config.chain, config.replay, Arc::new(client), Arc::new(watch_list));
            let txs = watch.replay_block_transaction(hash.into()).await?;
            println!("{}", serde_json::to_string_pretty(&txs)?);
        }
    }

    Ok(())
}
