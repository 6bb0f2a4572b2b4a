//! Error types for the keyserver gateway.
//!
//! Errors are organised by domain, and every domain error converts into the
//! external taxonomy carried by [`GatewayError`]:
//!
//! - [`StoreError`] - Keystore failures (missing keys, wrong passwords, I/O)
//! - [`TxError`] - Transaction decoding, encoding and field parsing failures
//! - [`NodeError`] - Ledger node transport and rejection failures
//! - [`ConfigError`] - Configuration loading failures
//! - [`GatewayError`] - What a client sees, with a fixed HTTP status per kind
//!
//! # Example
//!
//! ```rust
//! use keyserver_core::error::{GatewayError, StoreError};
//!
//! let err: GatewayError = StoreError::key_not_found("jack").into();
//! assert_eq!(err.status_code(), 404);
//! assert_eq!(err.to_string(), "key not found: jack");
//! ```

// ============================================================================
// GatewayError
// ============================================================================

/// Client-facing error taxonomy.
///
/// Each variant maps to exactly one HTTP status through
/// [`GatewayError::status_code`]. The display string is the message placed in
/// the `{"error": "..."}` response body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Malformed or out-of-range input, or an unknown address variant.
    #[error("{message}")]
    Validation {
        /// Human-readable description of the invalid input.
        message: String,
    },

    /// A key with the requested name already exists.
    #[error("{message}")]
    Conflict {
        /// Human-readable description of the conflict.
        message: String,
    },

    /// The supplied password does not unlock the key.
    #[error("{message}")]
    Unauthorized {
        /// Human-readable description of the failure.
        message: String,
    },

    /// The named key does not exist.
    #[error("{message}")]
    NotFound {
        /// Human-readable description of what was missing.
        message: String,
    },

    /// A collaborator (keystore or ledger node) failed.
    ///
    /// When `client_attributable` is set the ledger node itself rejected the
    /// request and `message` carries the node's diagnostic log.
    #[error("{message}")]
    Upstream {
        /// Diagnostic message, verbatim from the node when available.
        message: String,
        /// Whether the node attributed the failure to the client's input.
        client_attributable: bool,
    },

    /// Serialization or other internal failure.
    #[error("{message}")]
    Internal {
        /// Human-readable description of the failure.
        message: String,
    },
}

impl GatewayError {
    /// Create a `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create an `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an `Upstream` error for a failure not attributable to the client.
    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            client_attributable: false,
        }
    }

    /// Create an `Upstream` error for a request the ledger node rejected.
    #[must_use]
    pub fn rejected(log: impl Into<String>) -> Self {
        Self::Upstream {
            message: log.into(),
            client_attributable: true,
        }
    }

    /// Create an `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The HTTP status code for this error.
    ///
    /// | Kind | Status |
    /// |------|--------|
    /// | `Validation`, `Conflict` | 400 |
    /// | `Unauthorized` | 401 |
    /// | `NotFound` | 404 |
    /// | `Upstream` (node rejected) | 400 |
    /// | `Upstream`, `Internal` | 500 |
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. }
            | Self::Conflict { .. }
            | Self::Upstream {
                client_attributable: true,
                ..
            } => 400,
            Self::Unauthorized { .. } => 401,
            Self::NotFound { .. } => 404,
            Self::Upstream { .. } | Self::Internal { .. } => 500,
        }
    }

    /// Short machine-readable name of the error kind, used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Conflict { .. } => "conflict",
            Self::Unauthorized { .. } => "unauthorized",
            Self::NotFound { .. } => "not_found",
            Self::Upstream { .. } => "upstream",
            Self::Internal { .. } => "internal",
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(error: StoreError) -> Self {
        let message = error.to_string();
        match error {
            StoreError::KeyNotFound { .. } => Self::not_found(message),
            StoreError::DecryptionFailed => Self::unauthorized(message),
            StoreError::KeyExists { .. } => Self::conflict(message),
            StoreError::InvalidName { .. } | StoreError::InvalidMnemonic => {
                Self::validation(message)
            }
            StoreError::IoError(_)
            | StoreError::EncryptionFailed
            | StoreError::InvalidFormat
            | StoreError::PermissionDenied
            | StoreError::Derivation { .. } => Self::upstream(message),
        }
    }
}

impl From<TxError> for GatewayError {
    fn from(error: TxError) -> Self {
        let message = error.to_string();
        match error {
            TxError::Encode { .. } => Self::internal(message),
            _ => Self::validation(message),
        }
    }
}

impl From<NodeError> for GatewayError {
    fn from(error: NodeError) -> Self {
        match error {
            NodeError::Rejected { log, .. } => Self::rejected(log),
            NodeError::Rpc { message, .. } => Self::rejected(message),
            other => Self::upstream(other.to_string()),
        }
    }
}

impl From<ConfigError> for GatewayError {
    fn from(error: ConfigError) -> Self {
        Self::internal(error.to_string())
    }
}

// ============================================================================
// StoreError
// ============================================================================

/// Errors that can occur during keystore operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// File system I/O error.
    #[error("I/O error: {0}")]
    IoError(#[source] std::io::Error),

    /// Key encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Key decryption failed (likely wrong password).
    #[error("decryption failed (wrong password?)")]
    DecryptionFailed,

    /// A key with this name already exists.
    #[error("key {name} already exists")]
    KeyExists {
        /// The name of the existing key.
        name: String,
    },

    /// The requested key does not exist.
    #[error("key not found: {name}")]
    KeyNotFound {
        /// The name of the key that was not found.
        name: String,
    },

    /// The key name contains characters the store cannot persist safely.
    #[error("invalid key name: {name:?}")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// The mnemonic failed the BIP-39 word list or checksum test.
    #[error("invalid mnemonic")]
    InvalidMnemonic,

    /// HD key derivation failed.
    #[error("key derivation failed: {context}")]
    Derivation {
        /// Context about the failure.
        context: String,
    },

    /// The key file format is invalid.
    #[error("invalid key file format")]
    InvalidFormat,

    /// Insufficient file system permissions.
    #[error("permission denied")]
    PermissionDenied,
}

impl StoreError {
    /// Create an `IoError` from a `std::io::Error`.
    #[must_use]
    pub const fn io_error(error: std::io::Error) -> Self {
        Self::IoError(error)
    }

    /// Create a `KeyExists` error.
    #[must_use]
    pub fn key_exists(name: impl Into<String>) -> Self {
        Self::KeyExists { name: name.into() }
    }

    /// Create a `KeyNotFound` error.
    #[must_use]
    pub fn key_not_found(name: impl Into<String>) -> Self {
        Self::KeyNotFound { name: name.into() }
    }

    /// Create an `InvalidName` error.
    #[must_use]
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Create a `Derivation` error.
    #[must_use]
    pub fn derivation(context: impl Into<String>) -> Self {
        Self::Derivation {
            context: context.into(),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::IoError(error),
        }
    }
}

// ============================================================================
// TxError
// ============================================================================

/// Errors raised while decoding, validating or encoding transactions.
#[derive(Debug, thiserror::Error)]
pub enum TxError {
    /// The JSON payload could not be decoded into the expected shape.
    #[error("invalid transaction JSON: {context}")]
    InvalidJson {
        /// Decoder message.
        context: String,
    },

    /// A numeric field did not hold a non-negative decimal integer.
    #[error("invalid {field}: {value:?}")]
    InvalidNumber {
        /// The field being parsed.
        field: String,
        /// The rejected value.
        value: String,
    },

    /// A coin list did not parse.
    #[error("failed to parse {field} {input:?} into coins: {reason}")]
    InvalidCoins {
        /// Which request field held the coins.
        field: String,
        /// The rejected input.
        input: String,
        /// Why parsing failed.
        reason: String,
    },

    /// A Bech32 address did not decode or had the wrong prefix.
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress {
        /// The rejected address string.
        address: String,
        /// Why decoding failed.
        reason: String,
    },

    /// The message type has no binary wire encoding in this gateway.
    #[error("unsupported message type for binary encoding: {kind}")]
    UnsupportedMsg {
        /// The amino type name of the message.
        kind: String,
    },

    /// The gas adjustment was not a finite, non-negative number.
    #[error("failed to parse gas adjustment {value:?} into a number")]
    InvalidGasAdjustment {
        /// The rejected value.
        value: String,
    },

    /// Binary or JSON encoding failed.
    #[error("encoding failed: {context}")]
    Encode {
        /// Context about the failure.
        context: String,
    },

    /// Binary decoding of a node payload failed.
    #[error("decoding failed: {context}")]
    Decode {
        /// Context about the failure.
        context: String,
    },
}

impl TxError {
    /// Create an `InvalidJson` error.
    #[must_use]
    pub fn invalid_json(context: impl Into<String>) -> Self {
        Self::InvalidJson {
            context: context.into(),
        }
    }

    /// Create an `InvalidNumber` error.
    #[must_use]
    pub fn invalid_number(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an `InvalidCoins` error.
    #[must_use]
    pub fn invalid_coins(
        field: impl Into<String>,
        input: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidCoins {
            field: field.into(),
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create an `InvalidAddress` error.
    #[must_use]
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create an `UnsupportedMsg` error.
    #[must_use]
    pub fn unsupported_msg(kind: impl Into<String>) -> Self {
        Self::UnsupportedMsg { kind: kind.into() }
    }

    /// Create an `Encode` error.
    #[must_use]
    pub fn encode(context: impl Into<String>) -> Self {
        Self::Encode {
            context: context.into(),
        }
    }

    /// Create a `Decode` error.
    #[must_use]
    pub fn decode(context: impl Into<String>) -> Self {
        Self::Decode {
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for TxError {
    fn from(error: serde_json::Error) -> Self {
        Self::invalid_json(error.to_string())
    }
}

// ============================================================================
// NodeError
// ============================================================================

/// Errors talking to the ledger node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// The HTTP request could not be completed.
    #[error("ledger node unreachable at {url}: {context}")]
    Transport {
        /// Node URL.
        url: String,
        /// Transport error message.
        context: String,
    },

    /// The call did not finish within the configured bound.
    #[error("ledger node {method} call timed out after {secs}s")]
    Timeout {
        /// RPC method that timed out.
        method: String,
        /// The timeout in seconds.
        secs: u64,
    },

    /// The node answered with a JSON-RPC error object.
    #[error("ledger node {method} error {code}: {message}")]
    Rpc {
        /// RPC method that failed.
        method: String,
        /// JSON-RPC error code.
        code: i64,
        /// Error message and data from the node.
        message: String,
    },

    /// The node processed the request and rejected it.
    #[error("{log}")]
    Rejected {
        /// ABCI response code.
        code: u32,
        /// The node's diagnostic log.
        log: String,
    },

    /// The node's response did not have the expected shape.
    #[error("unexpected ledger node response: {context}")]
    Decode {
        /// Context about the failure.
        context: String,
    },
}

impl NodeError {
    /// Create a `Transport` error.
    #[must_use]
    pub fn transport(url: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            context: context.into(),
        }
    }

    /// Create a `Decode` error.
    #[must_use]
    pub fn decode(context: impl Into<String>) -> Self {
        Self::Decode {
            context: context.into(),
        }
    }
}

impl From<TxError> for NodeError {
    fn from(error: TxError) -> Self {
        Self::decode(error.to_string())
    }
}

// ============================================================================
// ConfigError
// ============================================================================

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {context}")]
    ParseFailed {
        /// Context about the parsing failure.
        context: String,
    },

    /// A configuration value is invalid.
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// The field name with the invalid value.
        field: String,
        /// The invalid value.
        value: String,
    },

    /// The file exists and overwriting was not requested.
    #[error("configuration already exists at {path}; use --force to overwrite")]
    AlreadyExists {
        /// The existing file.
        path: String,
    },

    /// The home directory could not be determined.
    #[error("could not determine home directory")]
    NoHomeDirectory,

    /// An I/O error occurred.
    #[error("{context}: {source}")]
    Io {
        /// What was being done.
        context: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create a `FileNotFound` error.
    #[must_use]
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a `ParseFailed` error.
    #[must_use]
    pub fn parse_failed(context: impl Into<String>) -> Self {
        Self::ParseFailed {
            context: context.into(),
        }
    }

    /// Create an `InvalidValue` error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    /// Create a `NoHomeDirectory` error.
    #[must_use]
    pub const fn no_home_directory() -> Self {
        Self::NoHomeDirectory
    }

    /// Create an `Io` error with context.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

// ============================================================================
// Result type aliases
// ============================================================================

/// A `Result` type alias using [`GatewayError`] as the error type.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// A `Result` type alias for keystore operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A `Result` type alias for transaction operations.
pub type TxResult<T> = std::result::Result<T, TxError>;

/// A `Result` type alias for ledger node operations.
pub type NodeResult<T> = std::result::Result<T, NodeError>;

/// A `Result` type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ============================================================================
// Unit Tests
// ============================================================================
