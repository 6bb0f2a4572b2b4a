//! Configuration types for the keyserver gateway.
//!
//! The configuration is constructed once at startup and shared read-only with
//! every request handler. It covers three concerns:
//!
//! - **Server**: listen address, port and per-request timeout
//! - **Keys**: keystore directory, keystore call timeout and KDF cost
//! - **Node**: ledger node RPC URL and call timeout
//!
//! # Configuration File
//!
//! Configuration is stored in TOML format at `~/.keyserver/config.toml`.
//!
//! # Examples
//!
//! ```
//! use keyserver_core::config::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.server.port, 3000);
//! assert_eq!(config.node.url, "http://localhost:26657");
//!
//! let toml_str = Config::default_toml();
//! let parsed: Config = toml::from_str(&toml_str).expect("valid TOML");
//! assert_eq!(parsed, config);
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Minimum Argon2 memory cost accepted by [`Config::validate`], in KiB.
pub const MIN_KDF_MEMORY_KIB: u32 = 8;

/// Maximum Argon2 memory cost accepted by [`Config::validate`], in KiB (4 GiB).
pub const MAX_KDF_MEMORY_KIB: u32 = 4 * 1024 * 1024;

/// Top-level configuration for the keyserver gateway.
///
/// # Examples
///
/// ```
/// use keyserver_core::config::Config;
///
/// let toml_str = r#"
/// [server]
/// port = 1317
///
/// [node]
/// url = "http://node.internal:26657"
/// "#;
///
/// let config: Config = toml::from_str(toml_str).expect("valid TOML");
/// assert_eq!(config.server.port, 1317);
/// assert_eq!(config.server.listen_addr, "0.0.0.0");
/// assert_eq!(config.node.url, "http://node.internal:26657");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Keystore configuration.
    #[serde(default)]
    pub keys: KeysConfig,

    /// Ledger node configuration.
    #[serde(default)]
    pub node: NodeConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_request_timeout() -> u64 {
    30
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind.
    ///
    /// Default: `0.0.0.0`
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Port to bind.
    ///
    /// Default: `3000`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on the time a single request may take, in seconds.
    ///
    /// Default: 30 seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    /// The `host:port` string the server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen_addr, self.port)
    }
}

fn default_keys_dir() -> String {
    "~/.keyserver".to_string()
}

const fn default_keystore_timeout() -> u64 {
    10
}

const fn default_kdf_memory() -> u32 {
    65536
}

const fn default_kdf_iterations() -> u32 {
    3
}

const fn default_kdf_parallelism() -> u32 {
    4
}

/// Keystore configuration.
///
/// Key records are stored as encrypted JSON files in `directory`:
///
/// ```text
/// ~/.keyserver/
/// ├── config.toml
/// └── keys/
///     ├── jack.json
///     └── validator.json
/// ```
///
/// The KDF parameters apply when a record is encrypted (on creation and on
/// password update). Existing records carry the parameters they were written
/// with, so changing these values never locks out old keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeysConfig {
    /// Keystore home directory. Records live in its `keys/` subdirectory.
    ///
    /// The path supports `~` expansion for the home directory.
    ///
    /// Default: `~/.keyserver`
    #[serde(default = "default_keys_dir")]
    pub directory: String,

    /// Upper bound on a single keystore call, in seconds.
    ///
    /// Default: 10 seconds
    #[serde(default = "default_keystore_timeout")]
    pub keystore_timeout_secs: u64,

    /// Argon2id memory cost in KiB.
    ///
    /// Default: 65536 (64 MiB)
    #[serde(default = "default_kdf_memory")]
    pub kdf_memory_kib: u32,

    /// Argon2id iteration count.
    ///
    /// Default: 3
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2id parallelism.
    ///
    /// Default: 4
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            directory: default_keys_dir(),
            keystore_timeout_secs: default_keystore_timeout(),
            kdf_memory_kib: default_kdf_memory(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
        }
    }
}

fn default_node_url() -> String {
    "http://localhost:26657".to_string()
}

const fn default_node_timeout() -> u64 {
    10
}

/// Ledger node configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeConfig {
    /// Tendermint RPC endpoint.
    ///
    /// Default: `http://localhost:26657`
    #[serde(default = "default_node_url")]
    pub url: String,

    /// Upper bound on a single node call, in seconds.
    ///
    /// Default: 10 seconds
    #[serde(default = "default_node_timeout")]
    pub timeout_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            url: default_node_url(),
            timeout_secs: default_node_timeout(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - `server.listen_addr` is empty
    /// - `server.port` is zero
    /// - any timeout is zero
    /// - `keys.directory` or `node.url` is empty
    /// - `node.url` is not an `http://` or `https://` URL
    /// - a KDF parameter is out of range
    ///
    /// # Examples
    ///
    /// ```
    /// use keyserver_core::config::Config;
    ///
    /// let config = Config::default();
    /// assert!(config.validate().is_ok());
    ///
    /// let mut invalid = Config::default();
    /// invalid.server.port = 0;
    /// assert!(invalid.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen_addr.is_empty() {
            return Err(ConfigError::invalid_value("server.listen_addr", "<empty>"));
        }

        if self.server.port == 0 {
            return Err(ConfigError::invalid_value("server.port", "0"));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_secs",
                "0",
            ));
        }

        if self.keys.directory.is_empty() {
            return Err(ConfigError::invalid_value("keys.directory", "<empty>"));
        }

        if self.keys.keystore_timeout_secs == 0 {
            return Err(ConfigError::invalid_value("keys.keystore_timeout_secs", "0"));
        }

        if !(MIN_KDF_MEMORY_KIB..=MAX_KDF_MEMORY_KIB).contains(&self.keys.kdf_memory_kib) {
            return Err(ConfigError::invalid_value(
                "keys.kdf_memory_kib",
                self.keys.kdf_memory_kib.to_string(),
            ));
        }

        if self.keys.kdf_iterations == 0 {
            return Err(ConfigError::invalid_value("keys.kdf_iterations", "0"));
        }

        if self.keys.kdf_parallelism == 0 {
            return Err(ConfigError::invalid_value("keys.kdf_parallelism", "0"));
        }

        if self.node.url.is_empty() {
            return Err(ConfigError::invalid_value("node.url", "<empty>"));
        }

        if !(self.node.url.starts_with("http://") || self.node.url.starts_with("https://")) {
            return Err(ConfigError::invalid_value("node.url", self.node.url.clone()));
        }

        if self.node.timeout_secs == 0 {
            return Err(ConfigError::invalid_value("node.timeout_secs", "0"));
        }

        Ok(())
    }

    /// Generates the default configuration as a commented TOML string.
    #[must_use]
    pub fn default_toml() -> String {
        r#"[server]
listen_addr = "0.0.0.0"
port = 3000
request_timeout_secs = 30

[keys]
directory = "~/.keyserver"
keystore_timeout_secs = 10
# Argon2id cost used when (re)encrypting key records
kdf_memory_kib = 65536
kdf_iterations = 3
kdf_parallelism = 4

[node]
url = "http://localhost:26657"
timeout_secs = 10
"#
        .to_string()
    }

    /// Creates a configuration builder for customizing values.
    ///
    /// # Examples
    ///
    /// ```
    /// use keyserver_core::config::Config;
    ///
    /// let config = Config::builder()
    ///     .port(1317)
    ///     .node_url("http://127.0.0.1:26657")
    ///     .build();
    ///
    /// assert_eq!(config.server.port, 1317);
    /// assert_eq!(config.node.url, "http://127.0.0.1:26657");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for creating customized [`Config`] instances.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new configuration builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Sets the listen address.
    #[must_use]
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server.listen_addr = addr.into();
        self
    }

    /// Sets the listen port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Sets the per-request timeout in seconds.
    #[must_use]
    pub const fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.server.request_timeout_secs = secs;
        self
    }

    /// Sets the keystore home directory.
    #[must_use]
    pub fn keys_directory(mut self, dir: impl Into<String>) -> Self {
        self.config.keys.directory = dir.into();
        self
    }

    /// Sets the keystore call timeout in seconds.
    #[must_use]
    pub const fn keystore_timeout_secs(mut self, secs: u64) -> Self {
        self.config.keys.keystore_timeout_secs = secs;
        self
    }

    /// Sets the Argon2id cost parameters.
    #[must_use]
    pub const fn kdf(mut self, memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        self.config.keys.kdf_memory_kib = memory_kib;
        self.config.keys.kdf_iterations = iterations;
        self.config.keys.kdf_parallelism = parallelism;
        self
    }

    /// Sets the ledger node RPC URL.
    #[must_use]
    pub fn node_url(mut self, url: impl Into<String>) -> Self {
        self.config.node.url = url.into();
        self
    }

    /// Sets the ledger node call timeout in seconds.
    #[must_use]
    pub const fn node_timeout_secs(mut self, secs: u64) -> Self {
        self.config.node.timeout_secs = secs;
        self
    }

    /// Builds the final configuration.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
}
