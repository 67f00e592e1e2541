//! JSON-RPC client for Ethereum nodes
//!
//! Provides a typed interface to Ethereum JSON-RPC endpoints.
//! Error classification happens here, at the client boundary: callers
//! see a closed set of error kinds and never inspect message text.

use crate::types::{Block, Log, LogFilter, Receipt, Transaction};
use alloy_primitives::{Address, B256};
use serde_json::{json, Value};
use std::time::Duration;

/// Per-request timeout; expirations surface as [`RpcError::Timeout`].
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error kinds a chain read can produce.
///
/// `is_transient` drives the retry executor; `LogQueryTooBroad` is the
/// provider-capability rejection handled by log-query chunk fallback
/// rather than generic retry.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Request timed out before the node responded
    #[error("request timed out")]
    Timeout,

    /// Node returned a response that could not be parsed
    #[error("malformed response: {0}")]
    BadResponse(String),

    /// Node or provider signalled rate limiting
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Provider rejected a log query for exceeding its filter limits
    #[error("log query too broad: {0}")]
    LogQueryTooBroad(String),

    /// Node-reported JSON-RPC error other than the kinds above
    #[error("rpc error: {0}")]
    Rpc(String),

    /// Transport or other unclassified failure
    #[error("{0}")]
    Other(String),
}

impl RpcError {
    /// Whether the retry executor should retry this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RpcError::Timeout | RpcError::BadResponse(_) | RpcError::RateLimited(_)
        )
    }
}

/// Classify a node-reported JSON-RPC error object.
///
/// Providers disagree on codes, so the message text is inspected once
/// here and nowhere else.
fn classify_rpc_error(error: &Value) -> RpcError {
    let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("")
        .to_string();
    let lowered = message.to_lowercase();

    if code == 429 || lowered.contains("rate limit") || lowered.contains("too many requests") {
        return RpcError::RateLimited(message);
    }
    if lowered.contains("limit exceeded")
        || lowered.contains("query returned more than")
        || lowered.contains("too broad")
    {
        return RpcError::LogQueryTooBroad(message);
    }
    if lowered.contains("request timeout") || lowered.contains("timed out") {
        return RpcError::Timeout;
    }
    RpcError::Rpc(message)
}

/// Read-only blockchain client interface.
///
/// The indexer expresses all its chain needs through this trait; the
/// production implementation is [`RpcClient`], tests substitute a mock.
pub trait ChainClient {
    /// Get the current chain height.
    async fn get_block_number(&self) -> Result<u64, RpcError>;

    /// Get a block by number.
    ///
    /// `include_bodies` controls whether the node returns full transaction
    /// objects; either way only the hashes are retained.
    async fn get_block(&self, number: u64, include_bodies: bool) -> Result<Block, RpcError>;

    /// Get a transaction by hash. `None` if the node does not know it.
    async fn get_transaction(&self, hash: B256) -> Result<Option<Transaction>, RpcError>;

    /// Get a transaction receipt by hash. `None` if not yet available.
    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<Receipt>, RpcError>;

    /// Get logs matching a filter.
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, RpcError>;

    /// Execute a read-only contract call (`eth_call`), returning raw bytes.
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, RpcError>;
}

/// JSON-RPC client for Ethereum nodes.
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
}

impl RpcClient {
    /// Create a new RPC client.
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Make a JSON-RPC call.
    async fn rpc(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let response = self
            .client
            .post(&self.url)
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Timeout
                } else {
                    RpcError::Other(e.to_string())
                }
            })?;

        if response.status().as_u16() == 429 {
            return Err(RpcError::RateLimited("HTTP 429".to_string()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RpcError::BadResponse(e.to_string()))?;

        if let Some(error) = body.get("error") {
            return Err(classify_rpc_error(error));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| RpcError::BadResponse("response missing 'result' field".to_string()))
    }

    /// Decode a non-null RPC result into a typed value.
    fn decode<T: serde::de::DeserializeOwned>(result: Value, what: &str) -> Result<T, RpcError> {
        serde_json::from_value(result)
            .map_err(|e| RpcError::BadResponse(format!("failed to deserialize {}: {}", what, e)))
    }
}

impl ChainClient for RpcClient {
    async fn get_block_number(&self) -> Result<u64, RpcError> {
        let result = self.rpc("eth_blockNumber", json!([])).await?;
        let number_str = result
            .as_str()
            .ok_or_else(|| RpcError::BadResponse("block number is not a string".to_string()))?;
        let number_str = number_str.strip_prefix("0x").unwrap_or(number_str);
        if number_str.is_empty() {
            return Err(RpcError::BadResponse("block number is empty".to_string()));
        }
        u64::from_str_radix(number_str, 16)
            .map_err(|e| RpcError::BadResponse(format!("failed to parse block number: {}", e)))
    }

    async fn get_block(&self, number: u64, include_bodies: bool) -> Result<Block, RpcError> {
        let params = json!([format!("0x{:x}", number), include_bodies]);
        let result = self.rpc("eth_getBlockByNumber", params).await?;
        if result.is_null() {
            return Err(RpcError::BadResponse(format!(
                "node returned null for block {}",
                number
            )));
        }
        Self::decode(result, "block")
    }

    async fn get_transaction(&self, hash: B256) -> Result<Option<Transaction>, RpcError> {
        let params = json!([format!("0x{:x}", hash)]);
        let result = self.rpc("eth_getTransactionByHash", params).await?;
        if result.is_null() {
            return Ok(None);
        }
        Self::decode(result, "transaction").map(Some)
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<Receipt>, RpcError> {
        let params = json!([format!("0x{:x}", hash)]);
        let result = self.rpc("eth_getTransactionReceipt", params).await?;
        if result.is_null() {
            return Ok(None);
        }
        Self::decode(result, "receipt").map(Some)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Log>, RpcError> {
        let topics: Vec<Value> = filter
            .topics
            .iter()
            .map(|position| match position {
                None => Value::Null,
                Some(list) => json!(list),
            })
            .collect();
        let params = json!([{
            "fromBlock": format!("0x{:x}", filter.from_block),
            "toBlock": format!("0x{:x}", filter.to_block),
            "topics": topics,
        }]);
        let result = self.rpc("eth_getLogs", params).await?;
        Self::decode(result, "logs")
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        let params = json!([
            {
                "to": format!("0x{:x}", to),
                "data": format!("0x{}", hex::encode(&data)),
            },
            "latest"
        ]);
        let result = self.rpc("eth_call", params).await?;
        let out = result
            .as_str()
            .ok_or_else(|| RpcError::BadResponse("call result is not a string".to_string()))?;
        let out = out.strip_prefix("0x").unwrap_or(out);
        if out.is_empty() {
            return Ok(Vec::new());
        }
        hex::decode(out).map_err(|e| RpcError::BadResponse(format!("invalid call result: {}", e)))
    }
}
