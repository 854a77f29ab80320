use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::blockchain::ChainProvider;
use crate::error::{Result, RpcError, WatcherError};
use crate::logging::{LogContext, MetricsLogger, PerformanceMonitor};
use crate::models::{Block, OriginTransaction, TransactionReceipt};

/// JSON-RPC error code for an unknown block
pub const BLOCK_NOT_FOUND_CODE: i64 = 24;
/// JSON-RPC error code for an unknown transaction hash
pub const TXN_HASH_NOT_FOUND_CODE: i64 = 29;

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Vec<Value>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    result: Option<Value>,
    error: Option<JsonRpcError>,
    #[allow(dead_code)]
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Block body as returned by `starknet_getBlockWithReceipts`
#[derive(Debug, Deserialize)]
struct BlockWithReceipts {
    block_hash: String,
    block_number: u64,
    timestamp: u64,
    #[serde(default)]
    transactions: Vec<TransactionWithReceipt>,
}

#[derive(Debug, Deserialize)]
struct TransactionWithReceipt {
    transaction: Map<String, Value>,
    receipt: TransactionReceipt,
}

impl BlockWithReceipts {
    fn into_block(self) -> Result<Block> {
        let mut transactions = Vec::with_capacity(self.transactions.len());
        let mut transaction_receipts = Vec::with_capacity(self.transactions.len());

        for entry in self.transactions {
            let mut transaction = entry.transaction;
            transaction
                .entry("transaction_hash")
                .or_insert_with(|| Value::String(entry.receipt.transaction_hash.clone()));
            let transaction: OriginTransaction =
                serde_json::from_value(Value::Object(transaction)).map_err(RpcError::Json)?;
            transactions.push(transaction);
            transaction_receipts.push(entry.receipt);
        }

        Ok(Block {
            block_hash: self.block_hash,
            block_number: self.block_number,
            timestamp: self.timestamp,
            transactions,
            transaction_receipts,
        })
    }
}

/// Starknet JSON-RPC provider
#[derive(Clone)]
pub struct StarknetRpcClient {
    client: Client,
    endpoint: String,
    timeout_seconds: u64,
}

impl StarknetRpcClient {
    pub fn new(endpoint: String) -> Result<Self> {
        Self::new_with_timeout(endpoint, 30)
    }

    pub fn new_with_timeout(endpoint: String, timeout_seconds: u64) -> Result<Self> {
        let context = LogContext::new("rpc_client", "initialization")
            .with_metadata("endpoint", json!(endpoint))
            .with_metadata("timeout_seconds", json!(timeout_seconds));
        context.info("Initializing Starknet RPC client");

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(RpcError::Http)?;

        Ok(Self {
            client,
            endpoint,
            timeout_seconds,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn make_request(&self, method: &str, params: Vec<Value>) -> std::result::Result<Value, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: 1,
        };

        LogContext::new("rpc_client", "make_request")
            .with_metadata("method", json!(method))
            .trace(&format!("Sending RPC request: {}", method));

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Timeout { seconds: self.timeout_seconds }
                } else if e.is_connect() {
                    RpcError::Connection(e.to_string())
                } else {
                    RpcError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Connection(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response.text().await?;
        let rpc_response: JsonRpcResponse = serde_json::from_str(&body)?;

        if let Some(error) = rpc_response.error {
            return Err(RpcError::Method {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| RpcError::InvalidResponse("No result in response".to_string()))
    }

    /// Issue a request and record its latency
    async fn timed_request(&self, method: &str, params: Vec<Value>) -> std::result::Result<Value, RpcError> {
        let monitor = PerformanceMonitor::new(&format!("rpc_{}", method));
        let result = self.make_request(method, params).await;
        let duration = monitor.finish_with_result(&result);
        MetricsLogger::log_rpc_call(method, duration, result.is_ok());
        result
    }
}

#[async_trait]
impl ChainProvider for StarknetRpcClient {
    async fn get_block(&self, height: u64) -> Result<Option<Block>> {
        let params = vec![json!({ "block_number": height })];

        let value = match self.timed_request("starknet_getBlockWithReceipts", params).await {
            Ok(value) => value,
            Err(RpcError::Method { code, .. }) if code == BLOCK_NOT_FOUND_CODE => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if value.is_null() {
            return Ok(None);
        }

        let body: BlockWithReceipts = serde_json::from_value(value).map_err(RpcError::Json)?;
        let block = body.into_block()?;

        LogContext::new("rpc_client", "get_block")
            .with_block_number(height)
            .with_metadata("transaction_count", json!(block.transactions.len()))
            .debug(&format!("Retrieved block {} with {} transactions", height, block.transactions.len()));

        Ok(Some(block))
    }

    async fn get_transaction(&self, hash: &str) -> Result<OriginTransaction> {
        let params = vec![json!(hash)];

        let value = match self.timed_request("starknet_getTransactionByHash", params).await {
            Ok(value) => value,
            Err(RpcError::Method { code, .. }) if code == TXN_HASH_NOT_FOUND_CODE => {
                return Err(RpcError::TransactionNotFound { hash: hash.to_string() }.into())
            }
            Err(e) => return Err(e.into()),
        };

        let mut transaction = match value {
            Value::Object(map) => map,
            other => {
                return Err(WatcherError::Rpc(RpcError::InvalidResponse(format!(
                    "Transaction {} is not an object: {}",
                    hash, other
                ))))
            }
        };
        transaction
            .entry("transaction_hash")
            .or_insert_with(|| Value::String(hash.to_string()));

        let transaction = serde_json::from_value(Value::Object(transaction)).map_err(RpcError::Json)?;
        Ok(transaction)
    }

    async fn get_latest_block_number(&self) -> Result<u64> {
        let value = self.timed_request("starknet_blockNumber", vec![]).await?;
        value.as_u64().ok_or_else(|| {
            WatcherError::Rpc(RpcError::InvalidResponse(format!("Block number is not an integer: {}", value)))
        })
    }
}
