//! Broadcast relay.
//!
//! Re-encodes a signed amino JSON transaction to wire form and hands it to
//! the ledger node for asynchronous acceptance. The node's acknowledgement is
//! returned unchanged; confirmation polling and retries are left to the
//! caller.

use keyserver_core::error::GatewayError;
use keyserver_core::types::{BroadcastResult, StdTx};
use tracing::info;

use crate::amino::encode_std_tx;
use crate::node::LedgerNode;

/// Decodes, encodes and submits a signed transaction.
///
/// # Errors
///
/// - `Validation` if the JSON does not describe a transaction or a message
///   has no binary encoding
/// - `Upstream` if the node call fails
pub async fn broadcast(
    node: &dyn LedgerNode,
    signed_tx_json: &[u8],
) -> Result<BroadcastResult, GatewayError> {
    let tx = StdTx::from_json(signed_tx_json)?;
    broadcast_tx(node, &tx).await
}

/// Submits an already-parsed transaction.
///
/// # Errors
///
/// See [`broadcast`].
pub async fn broadcast_tx(
    node: &dyn LedgerNode,
    tx: &StdTx,
) -> Result<BroadcastResult, GatewayError> {
    let tx_bytes = encode_std_tx(tx)?;
    let result = node.broadcast_async(&tx_bytes).await?;

    info!(
        tx_hash = %result.tx_hash,
        code = result.code,
        signatures = tx.signatures.len(),
        "transaction broadcast"
    );

    Ok(result)
}
