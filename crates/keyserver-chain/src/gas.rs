//! Gas estimation and fee finalization.
//!
//! A transaction's gas limit cannot be chosen until its messages and fee
//! amount are fixed, and its cost cannot be known without running it. The
//! finalizer resolves this in three steps:
//!
//! 1. **Simulate** the unsigned transaction, carrying one placeholder
//!    signature, against the ledger node
//! 2. **Adjust** the reported gas by the client's multiplier, if any
//! 3. **Finalize** by re-emitting the transaction with the new gas limit and
//!    no signatures, so it must be signed against the real fee
//!
//! No state survives between the finalize call and a later sign call; the
//! client carries the finalized transaction from one to the other.

use keyserver_core::address::AccAddress;
use keyserver_core::error::{GatewayError, TxError};
use keyserver_core::types::{Coins, GasEstimate, Msg, MsgSend, StdFee, StdSignature, StdTx};
use tracing::info;

use crate::amino::encode_std_tx;
use crate::node::LedgerNode;

/// Gas limit placed on a transaction before it has been simulated.
pub const DEFAULT_SIMULATION_GAS: u64 = 20_000;

/// A validated gas adjustment multiplier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasAdjustment(f64);

impl GasAdjustment {
    /// Parses a client-supplied multiplier such as `"1.5"`.
    ///
    /// An empty or absent string means no adjustment.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::InvalidGasAdjustment`] unless the string is a
    /// finite, non-negative number.
    ///
    /// # Example
    ///
    /// ```
    /// use keyserver_chain::gas::GasAdjustment;
    ///
    /// let adjustment = GasAdjustment::parse(Some("1.5")).unwrap().unwrap();
    /// assert_eq!(adjustment.apply(100_000), 150_000);
    /// assert!(GasAdjustment::parse(None).unwrap().is_none());
    /// assert!(GasAdjustment::parse(Some("lots")).is_err());
    /// ```
    pub fn parse(input: Option<&str>) -> Result<Option<Self>, TxError> {
        let Some(input) = input.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let invalid = || TxError::InvalidGasAdjustment {
            value: input.to_string(),
        };
        let value: f64 = input.parse().map_err(|_| invalid())?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid());
        }

        Ok(Some(Self(value)))
    }

    /// The multiplier.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Scales `gas_used`, rounding to the nearest integer.
    ///
    /// Results beyond `u64::MAX` saturate.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn apply(self, gas_used: u64) -> u64 {
        (gas_used as f64 * self.0).round() as u64
    }
}

/// The gas limit to finalize with.
///
/// A zero estimate is never adjusted.
#[must_use]
pub fn final_gas(estimate: GasEstimate, adjustment: Option<GasAdjustment>) -> u64 {
    match adjustment {
        Some(adjustment) if estimate.gas_used != 0 => adjustment.apply(estimate.gas_used),
        _ => estimate.gas_used,
    }
}

/// The transaction as it is sent for simulation: same content, one
/// placeholder signature.
#[must_use]
pub fn simulation_tx(tx: &StdTx) -> StdTx {
    StdTx::new(
        tx.msgs.clone(),
        tx.fee.clone(),
        vec![StdSignature::default()],
        tx.memo.clone(),
    )
}

/// Builds the unsigned bank-send transaction that gets simulated.
#[must_use]
pub fn bank_send_tx(
    sender: AccAddress,
    receiver: AccAddress,
    amount: Coins,
    fees: Coins,
    memo: impl Into<String>,
) -> StdTx {
    let msg = MsgSend {
        from_address: sender,
        to_address: receiver,
        amount,
    };
    StdTx::new(
        vec![Msg::Send(msg)],
        StdFee::new(DEFAULT_SIMULATION_GAS, fees),
        vec![StdSignature::default()],
        memo,
    )
}

/// Simulates `tx`, applies `adjustment` and returns the finalized, unsigned
/// transaction together with the raw estimate.
///
/// The adjustment is parsed before anything is sent to the node.
///
/// # Errors
///
/// - `Validation` for an invalid adjustment or a message with no binary encoding
/// - `Upstream` (client-attributable) when the node rejects the simulation
/// - `Upstream` when the node cannot be reached or answers garbage
pub async fn estimate_and_finalize(
    node: &dyn LedgerNode,
    tx: &StdTx,
    adjustment: Option<&str>,
) -> Result<(StdTx, GasEstimate), GatewayError> {
    let adjustment = GasAdjustment::parse(adjustment)?;

    let tx_bytes = encode_std_tx(&simulation_tx(tx))?;
    let estimate = node.simulate(&tx_bytes).await?;

    let gas = final_gas(estimate, adjustment);
    info!(
        gas_used = estimate.gas_used,
        gas_adjustment = adjustment.map(GasAdjustment::value),
        gas,
        "transaction fee finalized"
    );

    let finalized = tx.with_fee_unsigned(StdFee::new(gas, tx.fee.amount.clone()));
    Ok((finalized, estimate))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::float_cmp)]

    use super::*;
    use crate::node::{MockNode, MockNodeError};
    use keyserver_core::U256;
    use keyserver_core::types::Coin;

    fn addr(byte: u8) -> AccAddress {
        AccAddress::new(vec![byte; 20])
    }

    fn send() -> StdTx {
        bank_send_tx(
            addr(1),
            addr(2),
            Coins::from_vec(vec![Coin::new("stake", U256::from(10u64))]),
            Coins::parse("5stake").unwrap(),
            "memo",
        )
    }

    #[test]
    fn test_adjustment_parsing() {
        assert_eq!(GasAdjustment::parse(Some("1.5")).unwrap().unwrap().value(), 1.5);
        assert_eq!(GasAdjustment::parse(Some(" 2 ")).unwrap().unwrap().value(), 2.0);
        assert_eq!(GasAdjustment::parse(Some("0")).unwrap().unwrap().value(), 0.0);
        assert!(GasAdjustment::parse(Some("")).unwrap().is_none());
        assert!(GasAdjustment::parse(None).unwrap().is_none());

        for bad in ["abc", "-1", "NaN", "inf", "1.5x"] {
            assert!(
                matches!(
                    GasAdjustment::parse(Some(bad)),
                    Err(TxError::InvalidGasAdjustment { .. })
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_final_gas() {
        let adj = GasAdjustment::parse(Some("1.5")).unwrap();
        assert_eq!(final_gas(GasEstimate { gas_used: 100_000 }, adj), 150_000);
        assert_eq!(final_gas(GasEstimate { gas_used: 100_000 }, None), 100_000);
        assert_eq!(final_gas(GasEstimate { gas_used: 0 }, adj), 0);
        assert_eq!(final_gas(GasEstimate { gas_used: 3 }, adj), 5);
    }

    #[test]
    fn test_apply_saturates() {
        let adj = GasAdjustment::parse(Some("1e300")).unwrap().unwrap();
        assert_eq!(adj.apply(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_simulation_tx_has_one_placeholder() {
        let mut tx = send();
        tx.signatures.clear();
        let sim = simulation_tx(&tx);
        assert_eq!(sim.signatures, vec![StdSignature::default()]);
        assert_eq!(sim.fee, tx.fee);
    }

    #[tokio::test]
    async fn test_finalize_replaces_gas_and_clears_signatures() {
        let node = MockNode::with_gas(100_000);
        let tx = send();

        let (finalized, estimate) = estimate_and_finalize(&node, &tx, Some("1.5"))
            .await
            .unwrap();

        assert_eq!(estimate.gas_used, 100_000);
        assert_eq!(finalized.fee.gas, 150_000);
        assert_eq!(finalized.fee.amount, tx.fee.amount);
        assert!(finalized.signatures.is_empty());
        assert_eq!(finalized.msgs, tx.msgs);
        assert_eq!(finalized.memo, "memo");

        let submitted = node.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0], encode_std_tx(&simulation_tx(&tx)).unwrap());
    }

    #[tokio::test]
    async fn test_finalize_without_adjustment() {
        let node = MockNode::with_gas(48_000);
        let (finalized, _) = estimate_and_finalize(&node, &send(), None).await.unwrap();
        assert_eq!(finalized.fee.gas, 48_000);
    }

    #[tokio::test]
    async fn test_bad_adjustment_fails_before_simulation() {
        let node = MockNode::with_gas(1);
        let err = estimate_and_finalize(&node, &send(), Some("lots"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(node.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_simulation_surfaces_log() {
        let node = MockNode {
            simulate_error: Some(MockNodeError::Rejected("insufficient funds".into())),
            ..MockNode::default()
        };
        let err = estimate_and_finalize(&node, &send(), None).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "insufficient funds");
    }

    #[tokio::test]
    async fn test_unreachable_node_is_server_error() {
        let node = MockNode {
            simulate_error: Some(MockNodeError::Unreachable),
            ..MockNode::default()
        };
        let err = estimate_and_finalize(&node, &send(), None).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
}
