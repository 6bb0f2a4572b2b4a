//! # keyserver
//!
//! Key custody and transaction signing gateway for Cosmos SDK chains.
//!
//! ```bash
//! # Write ~/.keyserver/config.toml and start the server
//! keyserver config init
//! keyserver serve
//!
//! # Talk to it
//! keyserver keys add jack 123456789
//! keyserver keys show jack --bech val
//! keyserver tx send <sender> <receiver> 10stake my-chain --gas-adjustment 1.2 > unsigned.json
//! keyserver tx sign jack 123456789 my-chain 0 0 unsigned.json > signed.json
//! keyserver tx broadcast signed.json
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::future::Future;

use clap::Parser;
use keyserver::cli::commands::{
    ApiClient, ConfigCommand, KeysCommand, ServeCommand, TxCommand, VersionCommand,
    EXIT_ERROR,
};
use keyserver::cli::{Cli, Commands};
use keyserver::logging::{init_logging, verbosity_to_level, LogConfig, LogError, LogGuard};

/// Set up logging from the global flags.
///
/// # Errors
///
/// Returns [`LogError`] if logging initialization fails.
fn setup_logging(cli: &Cli) -> Result<LogGuard, LogError> {
    let config = LogConfig {
        level: verbosity_to_level(cli.verbose),
        format: cli.log_format,
        file_path: None,
    };
    init_logging(&config)
}

/// Run a future on a fresh multi-threaded runtime.
fn block_on<F: Future>(future: F) -> F::Output {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(future),
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {e}");
            std::process::exit(EXIT_ERROR);
        }
    }
}

/// Main entry point for the keyserver application.
fn main() {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            std::process::exit(EXIT_ERROR);
        }
    };

    let result = match cli.command {
        Commands::Serve => {
            let cmd = ServeCommand {
                config_path: cli.config,
            };
            block_on(cmd.run()).map_err(|e| e.to_string())
        }
        Commands::Config { action } => {
            let cmd = ConfigCommand::new(action, cli.config);
            cmd.run().map_err(|e| e.to_string())
        }
        Commands::Version => {
            VersionCommand.run();
            Ok(())
        }
        Commands::Keys { command } => {
            ApiClient::resolve(cli.server.as_deref(), cli.config.as_deref())
                .and_then(|client| block_on(KeysCommand::new(client, command).run()))
                .map_err(|e| e.to_string())
        }
        Commands::Tx { command } => {
            ApiClient::resolve(cli.server.as_deref(), cli.config.as_deref())
                .and_then(|client| block_on(TxCommand::new(client, command).run()))
                .map_err(|e| e.to_string())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(EXIT_ERROR);
    }
}
