//! # CLI Command Handlers
//!
//! - [`serve`] - Start the REST server
//! - [`config`] - Configuration file management
//! - [`version`] - Build information
//! - [`keys`] - Key management client
//! - [`tx`] - Transaction client
//! - [`client`] - The HTTP client shared by `keys` and `tx`
//!
//! Command handlers return a per-command error enum. `main` turns any error
//! into a message on stderr and [`exit_codes::EXIT_ERROR`].

pub mod client;
pub mod config;
pub mod exit_codes;
pub mod keys;
pub mod serve;
pub mod tx;
pub mod version;

pub use client::{ApiClient, ClientError};
pub use config::{load_effective_config, resolve_config_path, ConfigCommand, ConfigCommandError};
pub use exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
pub use keys::KeysCommand;
pub use serve::{ServeCommand, ServeError};
pub use tx::TxCommand;
pub use version::VersionCommand;
