use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;
use tokio::time::sleep;

use crate::backoff::FailureTracker;
use crate::blockchain::calldata::CalldataShape;
use crate::blockchain::record_builder::{apply_transfer, correlate_fee, stamp_block, TransactionRecordBuilder};
use crate::blockchain::{AddressMatcher, ChainProvider, ChainWatcher, OnBlock};
use crate::config::{ChainConfig, ReplayConfig};
use crate::error::Result;
use crate::logging::{ErrorLogger, LogContext, MetricsLogger, PerformanceMonitor};
use crate::models::{AddressMapTransactions, Block, OriginTransaction, ReplayCursor, Transaction, TransactionRef};

/// Starknet adapter: replays blocks and picks out watched transfers
pub struct StarknetWatch {
    chain: ChainConfig,
    replay: ReplayConfig,
    provider: Arc<dyn ChainProvider>,
    matcher: Arc<dyn AddressMatcher>,
    builder: TransactionRecordBuilder,
}

impl StarknetWatch {
    pub fn new(
        chain: ChainConfig,
        replay: ReplayConfig,
        provider: Arc<dyn ChainProvider>,
        matcher: Arc<dyn AddressMatcher>,
    ) -> Self {
        let builder = TransactionRecordBuilder::new(&chain);
        Self {
            chain,
            replay,
            provider,
            matcher,
            builder,
        }
    }

    fn context(&self, operation: &str) -> LogContext {
        LogContext::new("starknet_watch", operation).with_chain(&self.chain.name)
    }

    /// Highest height `replay_block` will process for a head of `end`
    pub fn last_replayable(&self, end: u64) -> Option<u64> {
        end.checked_sub(self.replay.min_confirmations)
    }

    /// Decode the calldata and, if its shape is watched, apply the transfer to `tx`.
    ///
    /// Returns false when the calldata has no known shape or the shape's
    /// recipient, token or forwarding contract is not watched.
    async fn match_transfer(&self, origin: &OriginTransaction, tx: &mut Transaction) -> Result<bool> {
        let shape = match CalldataShape::decode(origin.calldata()) {
            Some(shape) => shape,
            None => return Ok(false),
        };

        if !self.matcher.is_watch_wallet_address(shape.recipient()).await? {
            return Ok(false);
        }
        if !self.matcher.is_watch_token_address(shape.token()).await? {
            return Ok(false);
        }
        if let Some(forwarding_contract) = shape.forwarding_contract() {
            if !self.matcher.is_watch_contract_address(forwarding_contract).await? {
                return Ok(false);
            }
        }

        let shape_name = shape.name();
        let transfer = shape.into_transfer()?;
        let symbol = self.chain.token_symbol(&transfer.token).unwrap_or_default().to_string();
        if symbol.is_empty() && self.chain.debug {
            self.context("match_transfer")
                .with_address(&transfer.token)
                .debug("No symbol configured for token");
        }

        if self.chain.debug {
            self.context("match_transfer")
                .with_transaction_hash(&tx.hash)
                .with_metadata("shape", json!(shape_name))
                .debug("Calldata matched a watched transfer");
        }

        apply_transfer(tx, transfer, &symbol);
        Ok(true)
    }

    async fn replay_origin_transaction(&self, origin: &OriginTransaction) -> Result<AddressMapTransactions> {
        let mut tx = self.builder.build(origin);

        let sender_watched = self.matcher.is_watch_wallet_address(&tx.from).await?;
        let matched = self.match_transfer(origin, &mut tx).await?;

        if !matched || tx.from.is_empty() || tx.to.is_empty() {
            return Ok(AddressMapTransactions::new());
        }

        let match_address = if sender_watched {
            Some(tx.from.clone())
        } else if self.matcher.is_watch_wallet_address(&tx.to).await? {
            Some(tx.to.clone())
        } else {
            None
        };

        let match_address = match match_address {
            Some(address) => address.to_lowercase(),
            None => {
                self.context("replay_block_transaction")
                    .with_transaction_hash(&tx.hash)
                    .with_metadata("transaction", json!(tx))
                    .info("Matched calldata but neither endpoint resolved to a watched address");
                return Ok(AddressMapTransactions::new());
            }
        };

        self.context("replay_block_transaction")
            .with_transaction_hash(&tx.hash)
            .with_address(&match_address)
            .info("Matched transaction");

        Ok(AddressMapTransactions::group_by_address(std::iter::once((match_address, tx))))
    }

    /// Match every invocation of `block` and attach block position and fees
    async fn process_block(&self, block: &Block) -> Result<AddressMapTransactions> {
        let mut block_txs = AddressMapTransactions::new();

        for origin in block.invoke_transactions() {
            let matched = self.replay_origin_transaction(origin).await?;
            block_txs = block_txs.merge(matched);
        }

        for tx in block_txs.transactions_mut() {
            stamp_block(tx, block);
            correlate_fee(tx, &block.transaction_receipts);
        }

        Ok(block_txs)
    }

    /// Fetch, process and deliver one block.
    ///
    /// `Ok(false)` means the node does not have the block yet.
    async fn replay_height(&self, height: u64, end: u64, on_block: &mut Option<&mut OnBlock<'_>>) -> Result<bool> {
        let started = Instant::now();
        let monitor = PerformanceMonitor::new("get_block").with_metadata("block_number", json!(height));
        let fetched = self.provider.get_block(height).await;
        monitor.finish_with_result(&fetched);

        let block = match fetched? {
            Some(block) => block,
            None => return Ok(false),
        };

        if self.chain.debug {
            self.context("replay_block")
                .with_block_number(height)
                .with_metadata("end", json!(end))
                .with_metadata("transaction_count", json!(block.transactions.len()))
                .info(&format!("Replaying block {}/{}", height, end));
        }

        let block_txs = self.process_block(&block).await?;
        let matched_count = block_txs.transaction_count();

        if let Some(callback) = on_block.as_mut() {
            callback(height, block_txs)?;
        }

        MetricsLogger::log_block_replayed(&self.chain.name, height, matched_count, started.elapsed().as_millis() as u64);
        Ok(true)
    }

    /// Follow the chain head forever, starting at `start`.
    ///
    /// Each round replays up to the current head and then waits
    /// `block_poll_interval_ms`. Only ends if the hosting task is dropped.
    pub async fn follow(&self, start: u64, on_block: &mut OnBlock<'_>) {
        let mut cursor = start;
        let mut head_failures = FailureTracker::new(self.replay.retry.clone(), self.replay.stall_alarm_after);

        loop {
            match self.provider.get_latest_block_number().await {
                Ok(head) => {
                    head_failures.record_success();
                    let replayed = self.replay_block(cursor, head, Some(&mut *on_block)).await;
                    cursor = replayed.start;
                    sleep(Duration::from_millis(self.replay.block_poll_interval_ms)).await;
                }
                Err(e) => {
                    let delay = head_failures.record_failure();
                    ErrorLogger::log_error(&e, Some(self.context("follow").with_block_number(cursor)));
                    sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl ChainWatcher for StarknetWatch {
    fn chain_config(&self) -> &ChainConfig {
        &self.chain
    }

    fn min_confirmations(&self) -> u64 {
        self.replay.min_confirmations
    }

    async fn replay_block_transaction(&self, tx: TransactionRef) -> Result<AddressMapTransactions> {
        let origin = match tx {
            TransactionRef::Origin(origin) => origin,
            TransactionRef::Hash(hash) => self.provider.get_transaction(&hash).await?,
        };
        self.replay_origin_transaction(&origin).await
    }

    async fn replay_block(
        &self,
        start: u64,
        end: u64,
        mut on_block: Option<&mut OnBlock<'_>>,
    ) -> ReplayCursor {
        let mut start = start;
        let last = match self.last_replayable(end) {
            Some(last) => last,
            None => return ReplayCursor { start, end },
        };
        let mut failures = FailureTracker::new(self.replay.retry.clone(), self.replay.stall_alarm_after);

        if self.chain.debug {
            self.context("replay_block")
                .with_metadata("start", json!(start))
                .with_metadata("last", json!(last))
                .with_metadata("end", json!(end))
                .info(&format!("Start replayBlock {}/{}/{}", start, last, end));
        }

        while start <= last {
            match self.replay_height(start, end, &mut on_block).await {
                Ok(true) => {
                    failures.record_success();
                    start += 1;
                }
                Ok(false) => {
                    if self.chain.debug {
                        self.context("replay_block")
                            .with_block_number(start)
                            .debug("Block not available yet, polling again");
                    }
                    sleep(Duration::from_millis(self.replay.block_poll_interval_ms)).await;
                }
                Err(e) => {
                    let delay = failures.record_failure();
                    ErrorLogger::log_block_retry(
                        &self.chain.name,
                        start,
                        &e,
                        failures.consecutive_failures(),
                        delay.as_millis() as u64,
                    );
                    if failures.should_alarm() {
                        ErrorLogger::log_stall_alarm(&self.chain.name, start, failures.consecutive_failures(), &e);
                    }
                    sleep(delay).await;
                }
            }
        }

        ReplayCursor { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::BackoffPolicy;
    use crate::blockchain::WatchList;
    use crate::error::{RpcError, WatcherError};
    use serde_json::Map;
    use std::collections::HashMap;

    const WALLET: &str = "0x5ec09c04e223ec0c07f0bbb4d19737bbefcf58361812f1405017c19ae5b175f";
    const TOKEN: &str = "0x53c91253bc9682c04929ca02ed00b3e423f6710d2ee7e0d5ebb06f3ecf368a8";

    struct StaticProvider {
        transactions: HashMap<String, OriginTransaction>,
    }

    #[async_trait]
    impl ChainProvider for StaticProvider {
        async fn get_block(&self, _height: u64) -> Result<Option<Block>> {
            Ok(None)
        }

        async fn get_transaction(&self, hash: &str) -> Result<OriginTransaction> {
            self.transactions.get(hash).cloned().ok_or_else(|| {
                WatcherError::Rpc(RpcError::TransactionNotFound {
                    hash: hash.to_string(),
                })
            })
        }

        async fn get_latest_block_number(&self) -> Result<u64> {
            Ok(0)
        }
    }

    fn direct_transfer(hash: &str) -> OriginTransaction {
        let mut calldata = vec!["0x0".to_string(); 10];
        calldata[1] = TOKEN.to_string();
        calldata[6] = WALLET.to_string();
        calldata[7] = "0x3e8".to_string();
        calldata[9] = "7".to_string();
        OriginTransaction {
            transaction_hash: hash.to_string(),
            tx_type: "INVOKE".to_string(),
            sender_address: Some("0x0111".to_string()),
            calldata: Some(calldata),
            fields: Map::new(),
        }
    }

    fn watcher(transactions: Vec<OriginTransaction>) -> StarknetWatch {
        let provider = StaticProvider {
            transactions: transactions
                .into_iter()
                .map(|tx| (tx.transaction_hash.clone(), tx))
                .collect(),
        };
        let watch_list = WatchList::new().with_wallets(&[WALLET]).with_tokens(&[TOKEN]);
        let replay = ReplayConfig {
            retry: BackoffPolicy::immediate(),
            block_poll_interval_ms: 0,
            ..ReplayConfig::default()
        };
        StarknetWatch::new(ChainConfig::default(), replay, Arc::new(provider), Arc::new(watch_list))
    }

    #[test]
    fn test_last_replayable_respects_confirmations() {
        let watch = watcher(vec![]);
        assert_eq!(watch.min_confirmations(), 1);
        assert_eq!(watch.last_replayable(105), Some(104));
        assert_eq!(watch.last_replayable(0), None);
    }

    #[tokio::test]
    async fn test_replay_transaction_by_hash() {
        let watch = watcher(vec![direct_transfer("0xabc")]);

        let result = watch.replay_block_transaction("0xabc".into()).await.unwrap();

        let key = normalize_for_key(WALLET);
        let txs = result.get(&key).expect("recipient entry");
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].nonce, 7);
        assert_eq!(txs[0].value, bigdecimal::BigDecimal::from(1000));
        assert_eq!(txs[0].symbol, "USDC");
    }

    #[tokio::test]
    async fn test_replay_unknown_hash_propagates_error() {
        let watch = watcher(vec![]);

        let err = watch.replay_block_transaction("0xdead".into()).await.unwrap_err();
        assert!(matches!(
            err,
            WatcherError::Rpc(RpcError::TransactionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_range_returns_immediately() {
        let watch = watcher(vec![]);
        let mut calls = 0;
        let mut on_block = |_: u64, _: AddressMapTransactions| -> Result<()> {
            calls += 1;
            Ok(())
        };

        let cursor = watch.replay_block(10, 10, Some(&mut on_block)).await;

        assert_eq!(cursor, ReplayCursor { start: 10, end: 10 });
        assert_eq!(calls, 0);
    }

    fn normalize_for_key(address: &str) -> String {
        crate::blockchain::normalize_address(address).to_lowercase()
    }
}
