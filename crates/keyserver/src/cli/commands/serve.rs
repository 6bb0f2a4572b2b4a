//! # Serve Command
//!
//! Starts the REST server as a long-running process.
//!
//! - Loads and validates the configuration
//! - Opens the keystore directory and the node client
//! - Binds `server.listen_addr:server.port`
//! - Serves until SIGTERM/SIGINT, letting in-flight requests finish

use std::path::PathBuf;

use keyserver_core::error::ConfigError;
use tokio::sync::oneshot;

use super::config::load_effective_config;
use crate::server::{AppState, KeyServer, ServerError};

/// Command to start the server.
///
/// # Example
///
/// ```no_run
/// use keyserver::cli::commands::ServeCommand;
///
/// #[tokio::main]
/// async fn main() {
///     let cmd = ServeCommand { config_path: None };
///     if let Err(e) = cmd.run().await {
///         eprintln!("Error: {e}");
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ServeCommand {
    /// File given with `-c`.
    pub config_path: Option<PathBuf>,
}

/// Errors that can occur when running the serve command.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Configuration could not be loaded or the collaborators not opened.
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    /// Binding or serving failed.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Signal handlers could not be installed.
    #[error("Signal handling failed: {0}")]
    Signal(String),
}

impl ServeCommand {
    /// Run the serve command.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError`] if the configuration is invalid, the address
    /// cannot be bound, or the server fails.
    pub async fn run(&self) -> Result<(), ServeError> {
        let config = load_effective_config(self.config_path.as_deref())?;
        let state = AppState::from_config(config)?;
        let server = KeyServer::new(state);

        let listener = server.bind().await.map_err(|e| {
            tracing::error!(error = %e, "fatal: cannot bind listen address");
            e
        })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let signals = tokio::spawn(async move {
            if let Err(e) = wait_for_shutdown().await {
                tracing::error!(error = %e, "stopping: signal handling unavailable");
            }
            shutdown_tx.send(()).ok();
        });

        let result = server.serve(listener, shutdown_rx).await;
        signals.abort();
        result?;

        tracing::info!("Server shut down gracefully");
        Ok(())
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown() -> Result<(), ServeError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| ServeError::Signal(format!("failed to register SIGTERM handler: {e}")))?;

        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| ServeError::Signal(format!("failed to register SIGINT handler: {e}")))?;

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| ServeError::Signal(format!("failed to wait for Ctrl+C: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_invalid_config_fails_before_binding() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[node]\nurl = \"ftp://node\"\n").unwrap();

        let cmd = ServeCommand {
            config_path: Some(path),
        };
        assert!(matches!(cmd.run().await, Err(ServeError::Config(_))));
    }

    #[tokio::test]
    async fn test_port_in_use_is_bind_error() {
        let dir = TempDir::new().unwrap();
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!(
                "[server]\nlisten_addr = \"127.0.0.1\"\nport = {port}\n\n[keys]\ndirectory = \"{}\"\n",
                dir.path().join("home").display()
            ),
        )
        .unwrap();

        let cmd = ServeCommand {
            config_path: Some(path),
        };
        assert!(matches!(
            cmd.run().await,
            Err(ServeError::Server(ServerError::Bind { .. }))
        ));
    }
}
