//! Shared handler state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use keyserver_chain::{LedgerNode, TendermintRpc};
use keyserver_core::config::Config;
use keyserver_core::config_loader::expand_path;
use keyserver_core::error::{ConfigError, GatewayError};
use keyserver_crypto::{FileKeystore, KdfParams, Keystore};

/// Everything a request handler needs.
///
/// Cloning is cheap; every field is reference counted. Nothing in here is
/// mutated after startup.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    keystore: Arc<dyn Keystore>,
    node: Arc<dyn LedgerNode>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates state from already-built collaborators.
    #[must_use]
    pub fn new(config: Config, keystore: Arc<dyn Keystore>, node: Arc<dyn LedgerNode>) -> Self {
        Self {
            config: Arc::new(config),
            keystore,
            node,
        }
    }

    /// Opens the file keystore and the Tendermint RPC client named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the keys directory cannot be expanded or
    /// opened, or the node client cannot be built.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let home = expand_path(&config.keys.directory)?;
        let keystore = FileKeystore::open(&home, KdfParams::from_config(&config.keys))
            .map_err(|e| ConfigError::invalid_value("keys.directory", e.to_string()))?;
        let node = TendermintRpc::from_config(&config.node)
            .map_err(|e| ConfigError::invalid_value("node.url", e.to_string()))?;

        tracing::debug!(
            keys_dir = %keystore.keys_dir().display(),
            node_url = node.url(),
            "collaborators ready"
        );

        Ok(Self::new(config, Arc::new(keystore), Arc::new(node)))
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The ledger node client.
    #[must_use]
    pub fn node(&self) -> &dyn LedgerNode {
        self.node.as_ref()
    }

    /// Runs a keystore operation on a blocking thread, bounded by
    /// `keys.keystore_timeout_secs`.
    ///
    /// A timed-out operation keeps running on its thread; only the response
    /// is abandoned.
    ///
    /// # Errors
    ///
    /// Returns the operation's own error, `Upstream` on timeout, or
    /// `Internal` if the blocking task panicked.
    pub async fn with_keystore<T, F>(&self, op: F) -> Result<T, GatewayError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Keystore) -> Result<T, GatewayError> + Send + 'static,
    {
        let keystore = Arc::clone(&self.keystore);
        let secs = self.config.keys.keystore_timeout_secs;
        let task = tokio::task::spawn_blocking(move || op(keystore.as_ref()));

        match tokio::time::timeout(Duration::from_secs(secs), task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(GatewayError::internal(format!(
                "keystore task failed: {join_error}"
            ))),
            Err(_) => {
                tracing::warn!(timeout_secs = secs, "keystore call timed out");
                Err(GatewayError::upstream(format!(
                    "keystore call timed out after {secs}s"
                )))
            }
        }
    }

    /// Awaits a ledger node call, bounded by `node.timeout_secs`.
    ///
    /// # Errors
    ///
    /// Returns the call's own error, or `Upstream` on timeout.
    pub async fn with_node_timeout<T, Fut>(&self, call: Fut) -> Result<T, GatewayError>
    where
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let secs = self.config.node.timeout_secs;
        tokio::time::timeout(Duration::from_secs(secs), call)
            .await
            .unwrap_or_else(|_| {
                tracing::warn!(timeout_secs = secs, "ledger node call timed out");
                Err(GatewayError::upstream(format!(
                    "ledger node call timed out after {secs}s"
                )))
            })
    }
}
