//! # Test Utilities
//!
//! - [`load_fixture`] - Load a JSON fixture from `tests/fixtures/`
//! - [`temp_data_dir`] - An isolated temporary directory
//! - [`TestServer`] - A gateway on a real TCP port, backed by a temporary
//!   keystore and a [`MockNode`]
//!
//! ## Proptest Strategies
//!
//! - [`key_name`] - Names the keystore accepts
//! - [`coin_amount`] - Coin strings such as `42stake`

#![allow(dead_code)]
#![allow(clippy::expect_used)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use keyserver::server::{AppState, KeyServer, ServerError};
use keyserver_chain::MockNode;
use keyserver_core::config::ConfigBuilder;
use keyserver_crypto::{FileKeystore, KdfParams};
use proptest::prelude::*;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Error type for fixture loading operations.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// The fixture file could not be found.
    #[error("Fixture not found: {0}")]
    NotFound(String),

    /// The fixture file could not be read.
    #[error("Failed to read fixture: {0}")]
    ReadError(#[from] std::io::Error),

    /// The fixture JSON could not be parsed.
    #[error("Failed to parse fixture JSON: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Load a JSON fixture relative to `tests/fixtures/`, e.g. `"keys/jack.json"`.
pub fn load_fixture(path: &str) -> Result<serde_json::Value, FixtureError> {
    let fixture_path = fixtures_dir().join(path);

    if !fixture_path.exists() {
        return Err(FixtureError::NotFound(fixture_path.display().to_string()));
    }

    let content = std::fs::read_to_string(&fixture_path)?;
    Ok(serde_json::from_str(&content)?)
}

fn fixtures_dir() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(manifest_dir).join("tests").join("fixtures")
}

/// Create a temporary directory for test data.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
#[must_use]
pub fn temp_data_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("keyserver-test-")
        .tempdir()
        .expect("Failed to create temporary directory for test")
}

// =============================================================================
// Test server
// =============================================================================

/// A running gateway. Shuts down when dropped.
pub struct TestServer {
    /// `http://127.0.0.1:<port>`
    pub base_url: String,
    /// The node the gateway talks to.
    pub node: Arc<MockNode>,
    /// HTTP client for the tests.
    pub http: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<(), ServerError>>>,
    dir: TempDir,
}

impl TestServer {
    /// Starts a gateway whose node reports `gas_used` for every simulation.
    pub async fn start(gas_used: u64) -> Self {
        Self::with_node(MockNode::with_gas(gas_used)).await
    }

    /// Starts a gateway in front of `node`.
    pub async fn with_node(node: MockNode) -> Self {
        let dir = temp_data_dir();
        let config = ConfigBuilder::new()
            .listen_addr("127.0.0.1")
            .keys_directory(dir.path().display().to_string())
            .keystore_timeout_secs(10)
            .node_timeout_secs(2)
            .build();
        let keystore =
            FileKeystore::open(dir.path(), KdfParams::new(64, 1, 1)).expect("open keystore");
        let node = Arc::new(node);
        let state = AppState::new(config, Arc::new(keystore), node.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(KeyServer::new(state).serve(listener, shutdown_rx));

        Self {
            base_url: format!("http://{addr}"),
            node,
            http: reqwest::Client::new(),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
            dir,
        }
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Stops the server and waits for it to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("server stops within 5s")
                .expect("server task joins")
                .expect("server exits cleanly");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
    }
}

// =============================================================================
// Proptest Strategies
// =============================================================================

/// Key names the keystore accepts.
pub fn key_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9._-]{0,31}"
}

/// Coin strings with a valid denomination.
pub fn coin_amount() -> impl Strategy<Value = String> {
    (0u64..1_000_000_000, "[a-z][a-z0-9]{2,15}").prop_map(|(amount, denom)| format!("{amount}{denom}"))
}
