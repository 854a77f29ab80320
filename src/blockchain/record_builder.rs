use bigdecimal::BigDecimal;
use num_traits::Zero;
use serde_json::{json, Value};

use crate::blockchain::address::{felts_equal, normalize_address};
use crate::blockchain::calldata::{parse_decimal, DecodedTransfer};
use crate::config::ChainConfig;
use crate::logging::LogContext;
use crate::models::{Block, OriginTransaction, Transaction, TransactionReceipt, TransactionStatus};

/// Provenance tag of records built from node data
pub const RPC_SOURCE: &str = "rpc";

/// Builds canonical `Transaction` records for one chain
#[derive(Debug, Clone)]
pub struct TransactionRecordBuilder {
    chain_id: String,
    fee_token: String,
}

impl TransactionRecordBuilder {
    pub fn new(chain_config: &ChainConfig) -> Self {
        Self {
            chain_id: chain_config.chain_id.clone(),
            fee_token: chain_config.native_currency.symbol.clone(),
        }
    }

    /// Record with deterministic defaults: no recipient, zero value and nonce,
    /// zeroed block position and status `Fail`
    pub fn build(&self, origin: &OriginTransaction) -> Transaction {
        Transaction {
            chain_id: self.chain_id.clone(),
            hash: origin.transaction_hash.clone(),
            from: normalize_address(origin.sender()),
            to: String::new(),
            value: BigDecimal::zero(),
            nonce: 0,
            block_hash: String::new(),
            block_number: 0,
            transaction_index: 0,
            gas: 0,
            gas_price: 0,
            fee: BigDecimal::zero(),
            fee_token: self.fee_token.clone(),
            input: String::new(),
            symbol: String::new(),
            token_address: String::new(),
            status: TransactionStatus::Fail,
            timestamp: 0,
            extra: origin.extra(),
            source: RPC_SOURCE.to_string(),
        }
    }
}

/// Overwrite the transfer fields of `tx` with a matched calldata transfer
pub fn apply_transfer(tx: &mut Transaction, transfer: DecodedTransfer, symbol: &str) {
    tx.symbol = symbol.to_string();
    tx.token_address = transfer.token;
    tx.to = transfer.recipient;
    tx.nonce = transfer.nonce;
    tx.value = transfer.value;
    if let Some(auxiliary) = transfer.auxiliary {
        tx.extra.insert("ext".to_string(), Value::String(auxiliary));
    }
}

/// Copy block position from the header
pub fn stamp_block(tx: &mut Transaction, block: &Block) {
    tx.block_hash = block.block_hash.clone();
    tx.block_number = block.block_number;
    tx.timestamp = block.timestamp;
}

/// Set `fee` from the receipt with the same hash.
///
/// Returns whether a receipt was found. A missing receipt or an unreadable
/// fee leaves the fee at zero.
pub fn correlate_fee(tx: &mut Transaction, receipts: &[TransactionReceipt]) -> bool {
    let receipt = match receipts.iter().find(|r| felts_equal(&r.transaction_hash, &tx.hash)) {
        Some(receipt) => receipt,
        None => return false,
    };

    if let Some(actual_fee) = &receipt.actual_fee {
        match parse_decimal("actual_fee", actual_fee.amount()) {
            Ok(fee) => tx.fee = fee,
            Err(e) => LogContext::new("record_builder", "correlate_fee")
                .with_transaction_hash(&tx.hash)
                .with_metadata("actual_fee", json!(actual_fee.amount()))
                .warn(&format!("Ignoring unreadable fee: {}", e)),
        }
    }
    true
}
