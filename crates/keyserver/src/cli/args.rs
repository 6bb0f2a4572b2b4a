//! # CLI Argument Definitions
//!
//! - `keyserver serve` - Start the REST server
//! - `keyserver config [init|show|path]` - Manage the configuration file
//! - `keyserver version` - Print build information
//! - `keyserver keys ...` - Key management through a running server
//! - `keyserver tx ...` - Transaction helpers through a running server
//!
//! ## Global Options
//!
//! - `-v, --verbose` - Increase verbosity level
//! - `-c, --config <PATH>` - Path to configuration file
//! - `--log-format <FORMAT>` - `pretty`, `json` or `compact`
//! - `--server <URL>` - Server targeted by client commands

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

/// Key custody and transaction signing gateway for Cosmos SDK chains.
#[derive(Debug, Parser)]
#[command(name = "keyserver")]
#[command(author, version, about = "Key custody and signing gateway for Cosmos SDK chains")]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    ///
    /// Defaults to `~/.keyserver/config.toml`.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Base URL of the server for client commands
    ///
    /// Defaults to `http://localhost:<server.port>`.
    #[arg(long, global = true, value_name = "URL", env = "KEYSERVER_URL")]
    pub server: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the REST server
    ///
    /// Binds `server.listen_addr:server.port` and serves until SIGINT or
    /// SIGTERM.
    Serve,

    /// Manage the configuration file
    Config {
        /// Configuration action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print version, commit and branch
    Version,

    /// Key management (requires a running server)
    Keys {
        /// Key command to execute
        #[command(subcommand)]
        command: KeysCommands,
    },

    /// Transaction helpers (requires a running server)
    Tx {
        /// Transaction command to execute
        #[command(subcommand)]
        command: TxCommands,
    },
}

/// Configuration-related actions.
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

/// Key commands.
#[derive(Debug, Clone, Subcommand)]
pub enum KeysCommands {
    /// List all keys
    List,

    /// Create a key, generating a mnemonic unless one is given
    Add {
        /// Key name
        name: String,
        /// Password protecting the key
        password: String,
        /// BIP-39 mnemonic to recover from
        mnemonic: Option<String>,
        /// BIP-44 account
        #[arg(long, default_value_t = 0)]
        account: u32,
        /// BIP-44 address index
        #[arg(long, default_value_t = 0)]
        index: u32,
    },

    /// Show one key
    Show {
        /// Key name
        name: String,
        /// Address variant: acc, val or cons
        #[arg(long, default_value = "acc")]
        bech: String,
    },

    /// Change a key's password
    Update {
        /// Key name
        name: String,
        /// Current password
        old_password: String,
        /// New password
        new_password: String,
    },

    /// Delete a key
    Delete {
        /// Key name
        name: String,
        /// Key password
        password: String,
    },
}

/// Transaction commands.
#[derive(Debug, Clone, Subcommand)]
pub enum TxCommands {
    /// Sign a transaction read from a file
    Sign {
        /// Signing key name
        name: String,
        /// Signing key password
        password: String,
        /// Chain id
        chain_id: String,
        /// Signer's account number
        account_number: String,
        /// Signer's sequence
        sequence: String,
        /// File holding the amino JSON transaction
        tx_file: PathBuf,
    },

    /// Broadcast a signed transaction read from a file
    Broadcast {
        /// File holding the signed amino JSON transaction
        tx_file: PathBuf,
    },

    /// Build a bank send with simulated gas
    Send {
        /// Sender address
        sender: String,
        /// Receiver address
        receiver: String,
        /// Amount, e.g. `10stake`
        amount: String,
        /// Chain id
        chain_id: String,
        /// Memo
        #[arg(long, default_value = "")]
        memo: String,
        /// Fees, e.g. `5stake`
        #[arg(long, default_value = "")]
        fees: String,
        /// Multiplier applied to the simulated gas
        #[arg(long)]
        gas_adjustment: Option<String>,
    },
}
