//! # CLI Module
//!
//! Command-line interface for the key gateway.
//!
//! - [`args`] - Argument parsing and CLI structure definitions
//! - [`commands`] - Command handler implementations
//!
//! `serve` and `config` work locally. `keys` and `tx` are thin HTTP clients
//! of a running server.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, ConfigAction, KeysCommands, TxCommands};
