//! HTTP client used by the `keys` and `tx` commands.

use std::path::Path;

use keyserver_core::error::ConfigError;
use reqwest::Method;

use super::config::load_effective_config;
use crate::server::ErrorBody;

/// Errors a client command can report.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The configuration needed to find the server could not be loaded.
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    /// The server could not be reached.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Target URL.
        url: String,
        /// Underlying failure.
        message: String,
    },

    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status.
        status: u16,
        /// The `error` field of the body, or the raw body.
        message: String,
    },

    /// A local file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadFile {
        /// File path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Input or output was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(String),
}

/// A thin client for the REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Creates a client for `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Targets `server` if given, else `http://localhost:<server.port>` from
    /// the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the configuration is needed and
    /// cannot be loaded.
    pub fn resolve(server: Option<&str>, config_path: Option<&Path>) -> Result<Self, ClientError> {
        if let Some(url) = server {
            return Ok(Self::new(url));
        }
        let config = load_effective_config(config_path)?;
        Ok(Self::new(format!("http://localhost:{}", config.server.port)))
    }

    /// The server base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a request and returns the body of a 2xx response.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Transport`] if the server cannot be reached
    /// - [`ClientError::Status`] for any non-2xx status
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, ClientError> {
        let url = format!("{}{path}", self.base_url);
        let mut builder = self.http.request(method, &url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let transport = |e: reqwest::Error| ClientError::Transport {
            url: url.clone(),
            message: e.to_string(),
        };
        let response = builder.send().await.map_err(transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport)?;

        if status.is_success() {
            return Ok(bytes.to_vec());
        }

        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .map(|body| body.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// Encodes a request body.
pub(crate) fn json_body(value: &serde_json::Value) -> Result<Vec<u8>, ClientError> {
    serde_json::to_vec(value).map_err(|e| ClientError::Json(e.to_string()))
}

/// Reads a JSON document from disk.
pub(crate) fn read_json_file(path: &Path) -> Result<serde_json::Value, ClientError> {
    let bytes = std::fs::read(path).map_err(|source| ClientError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Json(format!("{}: {e}", path.display())))
}

/// Pretty-prints a JSON response; empty bodies print nothing.
pub(crate) fn print_response(body: &[u8]) {
    if body.is_empty() {
        return;
    }
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{text}"),
            Err(_) => println!("{}", String::from_utf8_lossy(body)),
        },
        Err(_) => println!("{}", String::from_utf8_lossy(body)),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use tempfile::TempDir;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        format!("http://{addr}/")
    }

    #[test]
    fn test_explicit_server_skips_config() {
        let client = ApiClient::resolve(
            Some("http://gateway:9000/"),
            Some(Path::new("/definitely/not/here.toml")),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://gateway:9000");
    }

    #[test]
    fn test_default_server_uses_configured_port() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 4317\n").unwrap();
        let client = ApiClient::resolve(None, Some(&path)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:4317");
    }

    #[tokio::test]
    async fn test_error_body_becomes_status_error() {
        let router = Router::new()
            .route("/ok", get(|| async { Json(serde_json::json!([])) }))
            .route(
                "/bad",
                get(|| async {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(ErrorBody {
                            error: "invalid mnemonic".into(),
                        }),
                    )
                }),
            );
        let client = ApiClient::new(serve(router).await);

        let body = client.request(Method::GET, "/ok", &[], None).await.unwrap();
        assert_eq!(body, b"[]");

        match client.request(Method::GET, "/bad", &[], None).await {
            Err(ClientError::Status { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid mnemonic");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(format!("http://{addr}"));
        assert!(matches!(
            client.request(Method::GET, "/keys", &[], None).await,
            Err(ClientError::Transport { .. })
        ));
    }

    #[test]
    fn test_read_json_file_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("tx.json");
        assert!(matches!(
            read_json_file(&missing),
            Err(ClientError::ReadFile { .. })
        ));

        std::fs::write(&missing, "{").unwrap();
        assert!(matches!(read_json_file(&missing), Err(ClientError::Json(_))));
    }
}
