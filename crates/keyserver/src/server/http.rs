//! HTTP server for the key gateway.
//!
//! # Example
//!
//! ```no_run
//! use keyserver::server::{AppState, KeyServer};
//! use keyserver_core::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = AppState::from_config(Config::default())?;
//!     let server = KeyServer::new(state);
//!
//!     let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
//!     // In another task: shutdown_tx.send(()).ok();
//!     # drop(shutdown_tx);
//!     server.run(shutdown_rx).await?;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Uri};
use axum::routing::{get, post};
use axum::Router;
use keyserver_core::error::GatewayError;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::error::ApiError;
use super::handlers;
use super::state::AppState;
use crate::logging::new_correlation_id;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Errors that can occur while running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind the listen address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that failed to bind.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The accept loop failed.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Builds the router with every route and middleware layer.
pub fn build_router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config().server.request_timeout_secs);

    Router::new()
        .route("/version", get(handlers::version))
        .route("/keys", get(handlers::list_keys).post(handlers::create_key))
        .route(
            "/keys/:name",
            get(handlers::get_key)
                .put(handlers::update_key)
                .delete(handlers::delete_key),
        )
        .route("/tx/sign", post(handlers::sign))
        .route("/tx/broadcast", post(handlers::broadcast))
        .route("/tx/bank/send", post(handlers::bank_send))
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        correlation_id = %new_correlation_id(),
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError(GatewayError::not_found(format!("no route for {}", uri.path())))
}

/// The REST server.
#[derive(Debug, Clone)]
pub struct KeyServer {
    state: AppState,
}

impl KeyServer {
    /// Creates a server over `state`.
    #[must_use]
    pub const fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Binds the configured `listen_addr:port`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address is unavailable.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self.state.config().server.bind_address();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Binds and serves until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// See [`KeyServer::bind`] and [`KeyServer::serve`].
    pub async fn run(self, shutdown: oneshot::Receiver<()>) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serves on an already-bound listener until `shutdown` fires or its
    /// sender is dropped. In-flight requests are allowed to finish.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Serve`] if the accept loop fails.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: oneshot::Receiver<()>,
    ) -> Result<(), ServerError> {
        let local_addr: Option<SocketAddr> = listener.local_addr().ok();
        if let Some(addr) = local_addr {
            tracing::info!(%addr, "Listening on {addr}");
        }

        let router = build_router(self.state);
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                shutdown.await.ok();
                tracing::info!("Shutdown signal received");
            })
            .await
            .map_err(ServerError::Serve)?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::indexing_slicing
    )]

    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use keyserver_chain::{MockNode, MockNodeError};
    use keyserver_core::config::ConfigBuilder;
    use keyserver_crypto::{FileKeystore, KdfParams};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;

    const MNEMONIC: &str = "marine intact tone element chest certain school village sound guilt nothing deposit cart skirt unveil bulk unit dust peasant cannon faith lyrics swear regret";
    const ADDRESS: &str = "cosmos1yv6alpum5r0nmnzkk4esp3cs5d58h8g95mvs50";

    struct Harness {
        router: Router,
        node: Arc<MockNode>,
        _dir: TempDir,
    }

    fn harness(node: MockNode) -> Harness {
        let dir = TempDir::new().unwrap();
        let config = ConfigBuilder::new()
            .keys_directory(dir.path().display().to_string())
            .build();
        let keystore = FileKeystore::open(dir.path(), KdfParams::new(64, 1, 1)).unwrap();
        let node = Arc::new(node);
        let state = AppState::new(config, Arc::new(keystore), node.clone());
        Harness {
            router: build_router(state),
            node,
            _dir: dir,
        }
    }

    async fn call(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let body = body.map_or_else(Body::empty, |v| Body::from(v.to_string()));
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    fn json_of(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    async fn create_jack(router: &Router) {
        let (status, _) = call(
            router,
            Method::POST,
            "/keys",
            Some(json!({"name": "jack", "password": "123456789", "mnemonic": MNEMONIC})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_version() {
        let h = harness(MockNode::default());
        let (status, body) = call(&h.router, Method::GET, "/version", None).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_of(&body);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["commit"].is_string());
        assert!(body["branch"].is_string());
    }

    #[tokio::test]
    async fn test_empty_key_list_is_array() {
        let h = harness(MockNode::default());
        let (status, body) = call(&h.router, Method::GET, "/keys", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"[]");
    }

    #[tokio::test]
    async fn test_create_returns_mnemonic_and_address() {
        let h = harness(MockNode::default());
        let (status, body) = call(
            &h.router,
            Method::POST,
            "/keys",
            Some(json!({"name": "jack", "password": "123456789", "mnemonic": MNEMONIC})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body = json_of(&body);
        assert_eq!(body["address"], ADDRESS);
        assert_eq!(body["mnemonic"], MNEMONIC);
        assert_eq!(body["type"], "local");
    }

    #[tokio::test]
    async fn test_duplicate_create_is_bad_request() {
        let h = harness(MockNode::default());
        create_jack(&h.router).await;
        let (status, body) = call(
            &h.router,
            Method::POST,
            "/keys",
            Some(json!({"name": "jack", "password": "other"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json_of(&body)["error"]
            .as_str()
            .unwrap()
            .contains("already exists"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let h = harness(MockNode::default());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/keys")
            .body(Body::from("{not json"))
            .unwrap();
        let response = h.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_variant_checked_before_lookup() {
        let h = harness(MockNode::default());
        let (status, body) = call(&h.router, Method::GET, "/keys/ghost?bech=foo", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json_of(&body)["error"].as_str().unwrap().contains("foo"));

        let (status, _) = call(&h.router, Method::GET, "/keys/ghost?bech=acc", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_lookup_with_unstorable_name_is_not_found() {
        let h = harness(MockNode::default());
        create_jack(&h.router).await;

        let (status, body) = call(&h.router, Method::GET, "/keys/bad%20name", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json_of(&body)["error"].as_str().unwrap().contains("bad name"));

        let (status, _) = call(
            &h.router,
            Method::PUT,
            "/keys/.jack",
            Some(json!({"old_password": "123456789", "new_password": "foobarbaz"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &h.router,
            Method::DELETE,
            "/keys/bad%20name",
            Some(json!({"password": "123456789"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &h.router,
            Method::POST,
            "/keys",
            Some(json!({"name": "bad name", "password": "123456789"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_key_variants() {
        let h = harness(MockNode::default());
        create_jack(&h.router).await;

        let (_, plain) = call(&h.router, Method::GET, "/keys/jack", None).await;
        assert_eq!(json_of(&plain)["address"], ADDRESS);

        let (_, val) = call(&h.router, Method::GET, "/keys/jack?bech=val", None).await;
        assert_eq!(
            json_of(&val)["address"],
            "cosmosvaloper1yv6alpum5r0nmnzkk4esp3cs5d58h8g930c9cu"
        );

        let (_, cons) = call(&h.router, Method::GET, "/keys/jack?bech=cons", None).await;
        assert_eq!(
            json_of(&cons)["address"],
            "cosmosvalcons1yv6alpum5r0nmnzkk4esp3cs5d58h8g99ute5a"
        );
    }

    #[tokio::test]
    async fn test_update_and_delete_statuses() {
        let h = harness(MockNode::default());
        create_jack(&h.router).await;

        let (status, _) = call(
            &h.router,
            Method::PUT,
            "/keys/jack",
            Some(json!({"old_password": "wrong", "new_password": "foobarbaz"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(
            &h.router,
            Method::PUT,
            "/keys/jack",
            Some(json!({"old_password": "123456789", "new_password": "foobarbaz"})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());

        let (status, _) = call(
            &h.router,
            Method::DELETE,
            "/keys/jack",
            Some(json!({"password": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &h.router,
            Method::DELETE,
            "/keys/jack",
            Some(json!({"password": "foobarbaz"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        let (status, _) = call(&h.router, Method::GET, "/keys/jack", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bank_send_adjusts_gas() {
        let h = harness(MockNode::with_gas(100_000));
        let (status, body) = call(
            &h.router,
            Method::POST,
            "/tx/bank/send",
            Some(json!({
                "sender": ADDRESS,
                "reciever": ADDRESS,
                "amount": "10stake",
                "chain-id": "test-chain",
                "fees": "5stake",
                "gas_adjustment": "1.5",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let tx = json_of(&body);
        assert_eq!(tx["type"], "auth/StdTx");
        assert_eq!(tx["value"]["fee"]["gas"], "150000");
        assert_eq!(h.node.submitted().len(), 1);
    }

    #[tokio::test]
    async fn test_bank_send_bad_amount() {
        let h = harness(MockNode::with_gas(100_000));
        let (status, body) = call(
            &h.router,
            Method::POST,
            "/tx/bank/send",
            Some(json!({"sender": ADDRESS, "reciever": ADDRESS, "amount": "ten"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json_of(&body)["error"].as_str().unwrap().contains("amount"));
        assert!(h.node.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_bank_send_node_rejection_is_bad_request() {
        let node = MockNode {
            simulate_error: Some(MockNodeError::Rejected("insufficient funds".into())),
            ..MockNode::default()
        };
        let h = harness(node);
        let (status, body) = call(
            &h.router,
            Method::POST,
            "/tx/bank/send",
            Some(json!({"sender": ADDRESS, "reciever": ADDRESS, "amount": "10stake"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_of(&body)["error"], "insufficient funds");
    }

    #[tokio::test]
    async fn test_sign_then_broadcast() {
        let h = harness(MockNode::with_gas(50_000));
        create_jack(&h.router).await;

        let (_, unsigned) = call(
            &h.router,
            Method::POST,
            "/tx/bank/send",
            Some(json!({"sender": ADDRESS, "reciever": ADDRESS, "amount": "10stake"})),
        )
        .await;

        let (status, signed) = call(
            &h.router,
            Method::POST,
            "/tx/sign",
            Some(json!({
                "tx": json_of(&unsigned),
                "name": "jack",
                "passphrase": "123456789",
                "chain_id": "test-chain",
                "account_number": "0",
                "sequence": "0",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let signed = json_of(&signed);
        assert_eq!(signed["value"]["signatures"].as_array().unwrap().len(), 1);

        let (status, ack) = call(&h.router, Method::POST, "/tx/broadcast", Some(signed)).await;
        assert_eq!(status, StatusCode::OK);
        let ack = json_of(&ack);
        assert_eq!(ack["height"], "0");
        assert_eq!(ack["txhash"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn test_sign_wrong_passphrase() {
        let h = harness(MockNode::default());
        create_jack(&h.router).await;
        let (status, _) = call(
            &h.router,
            Method::POST,
            "/tx/sign",
            Some(json!({
                "tx": {"type": "auth/StdTx", "value": {"msg": [], "fee": {"amount": null, "gas": "0"}, "signatures": null, "memo": ""}},
                "name": "jack",
                "passphrase": "nope",
                "chain_id": "c",
                "account_number": "0",
                "sequence": "0",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let h = harness(MockNode::default());
        let (status, body) = call(&h.router, Method::GET, "/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json_of(&body)["error"].as_str().unwrap().contains("/nope"));
    }

    #[tokio::test]
    async fn test_body_limit() {
        let h = harness(MockNode::default());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/tx/broadcast")
            .body(Body::from(vec![b' '; MAX_BODY_BYTES + 1]))
            .unwrap();
        let response = h.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let dir = TempDir::new().unwrap();
        let config = ConfigBuilder::new()
            .keys_directory(dir.path().display().to_string())
            .build();
        let keystore = FileKeystore::open(dir.path(), KdfParams::new(64, 1, 1)).unwrap();
        let state = AppState::new(config, Arc::new(keystore), Arc::new(MockNode::default()));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(KeyServer::new(state).serve(listener, shutdown_rx));

        shutdown_tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server stops")
            .expect("task joins");
        assert!(result.is_ok());
    }
}
