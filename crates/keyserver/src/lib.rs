//! # keyserver
//!
//! Key custody and transaction signing gateway for Cosmos SDK chains.
//!
//! The crate is both the `keyserver` binary and a library exposing the
//! pieces the binary is built from:
//!
//! - [`server`] - The REST façade (axum router, handlers, lifecycle)
//! - [`validate`] - Credential validation for key creation and changes
//! - [`signing`] - Sign orchestration over the keystore
//! - [`logging`] - Structured logging setup
//! - [`cli`] - Command-line interface definitions and handlers
//!
//! ## Usage
//!
//! ```no_run
//! use keyserver::server::{AppState, KeyServer};
//! use keyserver_core::config_loader::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = AppState::from_config(ConfigLoader::new()?.load()?)?;
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
//!     KeyServer::new(state).run(shutdown_rx).await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cli;
pub mod logging;
pub mod server;
pub mod signing;
pub mod validate;

pub use logging::{
    init_logging, log_security_event, new_correlation_id, redact_sensitive, verbosity_to_level,
    LogConfig, LogError, LogFormat, LogGuard, LogLevel,
};
pub use server::{build_router, AppState, KeyServer};
