//! # keyserver-chain
//!
//! Ledger-facing transaction handling for the keyserver gateway.
//!
//! This crate is an internal implementation detail of the `keyserver` binary;
//! its API may change between any two versions.
//!
//! ## Modules
//!
//! - [`sign_doc`] - Canonical sign documents
//! - [`amino`] - Amino binary wire codec
//! - [`gas`] - Simulate, adjust and finalize the fee of an unsigned transaction
//! - [`broadcast`] - Submit signed transactions
//! - [`node`] - The [`LedgerNode`] trait and its Tendermint RPC client
//!
//! ## Flow
//!
//! ```text
//! unsigned tx ──► gas::estimate_and_finalize ──► finalized unsigned tx
//!                        │ simulate                      │
//!                        ▼                               ▼ (client signs via /tx/sign)
//!                   LedgerNode ◄── broadcast::broadcast ◄── signed tx
//! ```
//!
//! ## Crate Features
//!
//! - `mock` - Enable [`MockNode`] for use in other crates' tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod amino;
pub mod broadcast;
pub mod gas;
pub mod node;
pub mod sign_doc;

pub use broadcast::broadcast;
pub use gas::{estimate_and_finalize, GasAdjustment, DEFAULT_SIMULATION_GAS};
pub use node::{LedgerNode, TendermintRpc};
pub use sign_doc::SignDocument;

// Re-export MockNode when the mock feature is enabled or in tests
#[cfg(any(test, feature = "mock"))]
pub use node::{MockNode, MockNodeError};
