//! # keyserver-core
//!
//! Core types and error definitions for the keyserver gateway.
//!
//! This crate is an internal implementation detail of the `keyserver` binary;
//! its API may change between any two versions.
//!
//! ## Modules
//!
//! - [`error`] - Domain error enums and the client-facing [`GatewayError`] taxonomy
//! - [`config`] / [`config_loader`] - TOML configuration and its loader
//! - [`address`] - Bech32 rendering and the [`AddressVariant`] enumeration
//! - [`types`] - Transaction data model ([`StdTx`], [`Coins`], [`SignContext`], ...)
//! - [`serde_util`] - Amino JSON serde adapters
//!
//! ## Error Handling
//!
//! Every domain error converts into a [`GatewayError`], which carries the
//! HTTP status it is reported with:
//!
//! ```rust
//! use keyserver_core::error::{GatewayError, NodeError};
//!
//! let err: GatewayError = NodeError::Rejected {
//!     code: 5,
//!     log: "insufficient funds".to_string(),
//! }
//! .into();
//!
//! assert_eq!(err.status_code(), 400);
//! assert_eq!(err.to_string(), "insufficient funds");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod address;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod serde_util;
pub mod types;

// Re-export commonly used error types at crate root for convenience
pub use error::{ConfigError, GatewayError, NodeError, Result, StoreError, TxError};

// Re-export config types at crate root for convenience
pub use config::{Config, ConfigBuilder, KeysConfig, NodeConfig, ServerConfig};

// Re-export config loader types at crate root for convenience
pub use config_loader::{expand_path, ConfigLoader};

pub use address::{AccAddress, AddressVariant, UnknownVariant};

pub use types::{
    BroadcastResult, Coin, Coins, GasEstimate, Msg, MsgSend, PubKey, SignContext, StdFee,
    StdSignature, StdTx,
};

// Re-export U256 from alloy_primitives for working with coin amounts
pub use alloy_primitives::U256;
