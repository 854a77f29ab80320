use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Transaction types that carry an invocation calldata list.
/// `INVOKE` is the JSON-RPC name, `INVOKE_FUNCTION` the legacy gateway name.
pub const INVOKE_TRANSACTION_TYPES: &[&str] = &["INVOKE", "INVOKE_FUNCTION"];

const LEGACY_SENDER_KEY: &str = "contract_address";

/// Block payload as handed over by a `ChainProvider`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub block_hash: String,
    pub block_number: u64,
    pub timestamp: u64,
    #[serde(default)]
    pub transactions: Vec<OriginTransaction>,
    #[serde(default)]
    pub transaction_receipts: Vec<TransactionReceipt>,
}

impl Block {
    /// Invocation transactions in block order
    pub fn invoke_transactions(&self) -> impl Iterator<Item = &OriginTransaction> {
        self.transactions.iter().filter(|tx| tx.is_invoke())
    }
}

/// A transaction as it appears on chain.
///
/// Only the fields the watcher reads are typed; everything else is kept
/// verbatim in `fields` and ends up in `Transaction::extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OriginTransaction {
    pub transaction_hash: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calldata: Option<Vec<String>>,
    /// Untyped fields, including the legacy `contract_address` sender
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl OriginTransaction {
    pub fn is_invoke(&self) -> bool {
        INVOKE_TRANSACTION_TYPES.contains(&self.tx_type.as_str())
    }

    /// Invoking account: `sender_address`, or `contract_address` on legacy
    /// v0 invokes. Empty when neither is present.
    pub fn sender(&self) -> &str {
        self.sender_address
            .as_deref()
            .or_else(|| self.fields.get(LEGACY_SENDER_KEY).and_then(Value::as_str))
            .unwrap_or_default()
    }

    pub fn calldata(&self) -> &[String] {
        self.calldata.as_deref().unwrap_or_default()
    }

    /// Every field except the transaction hash, under the keys the node used
    pub fn extra(&self) -> Map<String, Value> {
        let mut extra = self.fields.clone();
        extra.insert("type".to_string(), Value::String(self.tx_type.clone()));
        if let Some(sender) = &self.sender_address {
            extra.insert("sender_address".to_string(), Value::String(sender.clone()));
        }
        if let Some(calldata) = &self.calldata {
            extra.insert(
                "calldata".to_string(),
                Value::Array(calldata.iter().cloned().map(Value::String).collect()),
            );
        }
        extra
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub actual_fee: Option<ActualFee>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Fee charged for a transaction. Older nodes report a bare felt, newer ones
/// an amount together with its unit (`WEI` or `FRI`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ActualFee {
    Priced {
        amount: String,
        #[serde(default)]
        unit: String,
    },
    Amount(String),
}

impl ActualFee {
    pub fn amount(&self) -> &str {
        match self {
            ActualFee::Priced { amount, .. } => amount,
            ActualFee::Amount(amount) => amount,
        }
    }
}

/// Input of a single-transaction replay: either the payload itself or a
/// hash to resolve through the provider
#[derive(Debug, Clone)]
pub enum TransactionRef {
    Hash(String),
    Origin(OriginTransaction),
}

impl From<OriginTransaction> for TransactionRef {
    fn from(tx: OriginTransaction) -> Self {
        TransactionRef::Origin(tx)
    }
}

impl From<&str> for TransactionRef {
    fn from(hash: &str) -> Self {
        TransactionRef::Hash(hash.to_string())
    }
}

impl From<String> for TransactionRef {
    fn from(hash: String) -> Self {
        TransactionRef::Hash(hash)
    }
}
