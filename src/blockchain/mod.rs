pub mod address;
pub mod calldata;
pub mod record_builder;
pub mod rpc_client;
pub mod starknet_watch;
pub mod watch_list;

use async_trait::async_trait;

use crate::config::ChainConfig;
use crate::error::Result;
use crate::models::{AddressMapTransactions, Block, OriginTransaction, ReplayCursor, TransactionRef};

pub use address::{felts_equal, normalize_address};
pub use calldata::{CalldataShape, DecodedTransfer};
pub use record_builder::{correlate_fee, TransactionRecordBuilder};
pub use rpc_client::StarknetRpcClient;
pub use starknet_watch::StarknetWatch;
pub use watch_list::WatchList;

/// Per-block result callback: `(height, matched transactions)`.
/// Returning an error makes the replay loop retry the same block.
pub type OnBlock<'a> = dyn FnMut(u64, AddressMapTransactions) -> Result<()> + Send + 'a;

/// Source of chain data
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Block at `height` with its receipts, or `None` if the node does not have it yet
    async fn get_block(&self, height: u64) -> Result<Option<Block>>;

    async fn get_transaction(&self, hash: &str) -> Result<OriginTransaction>;

    async fn get_latest_block_number(&self) -> Result<u64>;
}

/// Answers whether a normalized address is on one of the watch lists
#[async_trait]
pub trait AddressMatcher: Send + Sync {
    async fn is_watch_wallet_address(&self, address: &str) -> Result<bool>;

    async fn is_watch_token_address(&self, address: &str) -> Result<bool>;

    async fn is_watch_contract_address(&self, address: &str) -> Result<bool>;
}

/// Capability shared by every chain-specific adapter
#[async_trait]
pub trait ChainWatcher: Send + Sync {
    fn chain_config(&self) -> &ChainConfig;

    /// Trailing blocks never processed by `replay_block`
    fn min_confirmations(&self) -> u64;

    /// Decode and match one transaction; the result holds at most one entry
    async fn replay_block_transaction(&self, tx: TransactionRef) -> Result<AddressMapTransactions>;

    /// Replay `[start, end - min_confirmations]`, calling `on_block` after each block
    async fn replay_block(
        &self,
        start: u64,
        end: u64,
        on_block: Option<&mut OnBlock<'_>>,
    ) -> ReplayCursor;
}
