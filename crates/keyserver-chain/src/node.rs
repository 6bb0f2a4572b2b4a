//! Ledger node access.
//!
//! The [`LedgerNode`] trait is the seam between the gateway and a running
//! chain node. [`TendermintRpc`] implements it over Tendermint's HTTP
//! JSON-RPC 2.0 interface:
//!
//! | Operation | RPC method | Parameters |
//! |-----------|------------|------------|
//! | simulate | `abci_query` | `path = "/app/simulate"`, `data = hex(tx)` |
//! | broadcast | `broadcast_tx_async` | `tx = base64(tx)` |
//!
//! Every call is bounded by the configured timeout. Nothing is retried.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use keyserver_core::config::NodeConfig;
use keyserver_core::error::NodeError;
use keyserver_core::types::{BroadcastResult, GasEstimate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::amino::decode_gas_used;

/// Result type for node operations.
pub type NodeResult<T> = Result<T, NodeError>;

/// ABCI query path of the simulation endpoint.
pub const SIMULATE_PATH: &str = "/app/simulate";

// ============================================================================
// LedgerNode Trait
// ============================================================================

/// A chain node that can simulate and accept transactions.
///
/// Both operations take a transaction in amino binary wire form.
#[async_trait]
pub trait LedgerNode: Send + Sync {
    /// Dry-runs a transaction and reports the gas it used.
    ///
    /// # Errors
    ///
    /// - [`NodeError::Rejected`] if the simulation failed, carrying the node's log
    /// - [`NodeError::Transport`], [`NodeError::Timeout`], [`NodeError::Rpc`] or
    ///   [`NodeError::Decode`] if the call itself failed
    async fn simulate(&self, tx_bytes: &[u8]) -> NodeResult<GasEstimate>;

    /// Submits a transaction to the mempool without waiting for a block.
    ///
    /// A non-zero `code` in the result is the node's verdict and is returned
    /// as data, not as an error.
    ///
    /// # Errors
    ///
    /// Returns a [`NodeError`] if the call itself failed.
    async fn broadcast_async(&self, tx_bytes: &[u8]) -> NodeResult<BroadcastResult>;
}

// ============================================================================
// JSON-RPC wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl RpcErrorObject {
    fn into_error(self, method: &str) -> NodeError {
        let message = match self.data {
            Some(Value::String(data)) if !data.is_empty() => format!("{}: {data}", self.message),
            _ => self.message,
        };
        NodeError::Rpc {
            method: method.to_string(),
            code: self.code,
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AbciQueryResult {
    response: AbciQueryResponse,
}

#[derive(Debug, Deserialize)]
struct AbciQueryResponse {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BroadcastTxResult {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    data: String,
    #[serde(default)]
    log: String,
    hash: String,
}

// ============================================================================
// TendermintRpc
// ============================================================================

/// [`LedgerNode`] backed by a Tendermint JSON-RPC endpoint.
#[derive(Debug)]
pub struct TendermintRpc {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    next_id: AtomicU64,
}

impl TendermintRpc {
    /// Creates a client for the node at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Transport`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> NodeResult<Self> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NodeError::transport(url.clone(), e.to_string()))?;

        Ok(Self {
            client,
            url,
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    /// Creates a client from the `[node]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &NodeConfig) -> NodeResult<Self> {
        Self::new(config.url.clone(), Duration::from_secs(config.timeout_secs))
    }

    /// The node URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Value) -> NodeResult<Value> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        debug!(method, url = %self.url, "ledger node request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.request_error(method, &e))?;

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| self.request_error(method, &e))?;

        if let Some(error) = body.error {
            return Err(error.into_error(method));
        }

        body.result
            .ok_or_else(|| NodeError::decode(format!("{method} response has no result")))
    }

    fn request_error(&self, method: &str, error: &reqwest::Error) -> NodeError {
        if error.is_timeout() {
            NodeError::Timeout {
                method: method.to_string(),
                secs: self.timeout.as_secs(),
            }
        } else if error.is_decode() {
            NodeError::decode(format!("{method}: {error}"))
        } else {
            NodeError::transport(self.url.clone(), error.to_string())
        }
    }
}

#[async_trait]
impl LedgerNode for TendermintRpc {
    async fn simulate(&self, tx_bytes: &[u8]) -> NodeResult<GasEstimate> {
        let params = json!({
            "path": SIMULATE_PATH,
            "data": hex::encode(tx_bytes),
            "height": "0",
            "prove": false,
        });

        let result = self.call("abci_query", params).await?;
        let result: AbciQueryResult = serde_json::from_value(result)
            .map_err(|e| NodeError::decode(format!("abci_query: {e}")))?;
        let response = result.response;

        if response.code != 0 {
            return Err(NodeError::Rejected {
                code: response.code,
                log: response.log,
            });
        }

        let value = response.value.unwrap_or_default();
        let value = STANDARD
            .decode(value.as_bytes())
            .map_err(|e| NodeError::decode(format!("abci_query value: {e}")))?;

        let gas_used = decode_gas_used(&value)?;
        debug!(gas_used, "simulation finished");

        Ok(GasEstimate { gas_used })
    }

    async fn broadcast_async(&self, tx_bytes: &[u8]) -> NodeResult<BroadcastResult> {
        let params = json!({ "tx": STANDARD.encode(tx_bytes) });

        let result = self.call("broadcast_tx_async", params).await?;
        let result: BroadcastTxResult = serde_json::from_value(result)
            .map_err(|e| NodeError::decode(format!("broadcast_tx_async: {e}")))?;

        debug!(tx_hash = %result.hash, code = result.code, "broadcast accepted by node");

        Ok(BroadcastResult {
            height: 0,
            tx_hash: result.hash.to_uppercase(),
            code: result.code,
            data: result.data.to_uppercase(),
            log: result.log,
        })
    }
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

/// Failure a [`MockNode`] can be configured to return.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockNodeError {
    /// The node rejects the transaction with this log.
    Rejected(String),
    /// The node cannot be reached.
    Unreachable,
}

#[cfg(any(test, feature = "mock"))]
impl MockNodeError {
    fn to_node_error(&self) -> NodeError {
        match self {
            Self::Rejected(log) => NodeError::Rejected {
                code: 1,
                log: log.clone(),
            },
            Self::Unreachable => NodeError::transport("mock://node", "connection refused"),
        }
    }
}

/// An in-memory ledger node for tests.
///
/// Every submitted transaction is recorded in `submitted`.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Default)]
pub struct MockNode {
    /// Gas reported by `simulate`.
    pub gas_used: u64,
    /// Error returned by `simulate` instead of an estimate.
    pub simulate_error: Option<MockNodeError>,
    /// Error returned by `broadcast_async` instead of a result.
    pub broadcast_error: Option<MockNodeError>,
    /// Delay before answering, for timeout tests.
    pub delay: Option<Duration>,
    /// Transactions received, in order.
    pub submitted: std::sync::Mutex<Vec<Vec<u8>>>,
}

#[cfg(any(test, feature = "mock"))]
impl MockNode {
    /// A node whose simulations use `gas_used`.
    #[must_use]
    pub fn with_gas(gas_used: u64) -> Self {
        Self {
            gas_used,
            ..Self::default()
        }
    }

    /// Snapshot of the transactions received so far.
    #[must_use]
    pub fn submitted(&self) -> Vec<Vec<u8>> {
        self.submitted
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    async fn receive(&self, tx_bytes: &[u8]) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Ok(mut guard) = self.submitted.lock() {
            guard.push(tx_bytes.to_vec());
        }
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl LedgerNode for MockNode {
    async fn simulate(&self, tx_bytes: &[u8]) -> NodeResult<GasEstimate> {
        self.receive(tx_bytes).await;
        match &self.simulate_error {
            Some(error) => Err(error.to_node_error()),
            None => Ok(GasEstimate {
                gas_used: self.gas_used,
            }),
        }
    }

    async fn broadcast_async(&self, tx_bytes: &[u8]) -> NodeResult<BroadcastResult> {
        self.receive(tx_bytes).await;
        if let Some(error) = &self.broadcast_error {
            return Err(error.to_node_error());
        }

        let hash = <sha2::Sha256 as sha2::Digest>::digest(tx_bytes);
        Ok(BroadcastResult {
            height: 0,
            tx_hash: hex::encode_upper(hash),
            ..BroadcastResult::default()
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
