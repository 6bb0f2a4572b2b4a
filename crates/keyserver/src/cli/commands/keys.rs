//! # Keys Command
//!
//! Key management through a running server.
//!
//! ```text
//! keyserver keys list
//! keyserver keys add <name> <password> [mnemonic] [--account N] [--index N]
//! keyserver keys show <name> [--bech acc|val|cons]
//! keyserver keys update <name> <old-password> <new-password>
//! keyserver keys delete <name> <password>
//! ```

use reqwest::Method;
use serde_json::json;

use super::client::{json_body, print_response, ApiClient, ClientError};
use crate::cli::args::KeysCommands;

/// The `keyserver keys` command handler.
#[derive(Debug, Clone)]
pub struct KeysCommand {
    client: ApiClient,
    command: KeysCommands,
}

impl KeysCommand {
    /// Create a new `KeysCommand`.
    #[must_use]
    pub const fn new(client: ApiClient, command: KeysCommands) -> Self {
        Self { client, command }
    }

    /// Sends the request and returns the response body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the server is unreachable or answers with
    /// a non-2xx status.
    pub async fn execute(&self) -> Result<Vec<u8>, ClientError> {
        match &self.command {
            KeysCommands::List => self.client.request(Method::GET, "/keys", &[], None).await,
            KeysCommands::Add {
                name,
                password,
                mnemonic,
                account,
                index,
            } => {
                let body = json!({
                    "name": name,
                    "password": password,
                    "mnemonic": mnemonic,
                    "account": account,
                    "index": index,
                });
                self.client
                    .request(Method::POST, "/keys", &[], Some(json_body(&body)?))
                    .await
            }
            KeysCommands::Show { name, bech } => {
                self.client
                    .request(
                        Method::GET,
                        &format!("/keys/{name}"),
                        &[("bech", bech.as_str())],
                        None,
                    )
                    .await
            }
            KeysCommands::Update {
                name,
                old_password,
                new_password,
            } => {
                let body = json!({
                    "old_password": old_password,
                    "new_password": new_password,
                });
                self.client
                    .request(
                        Method::PUT,
                        &format!("/keys/{name}"),
                        &[],
                        Some(json_body(&body)?),
                    )
                    .await
            }
            KeysCommands::Delete { name, password } => {
                let body = json!({ "password": password });
                self.client
                    .request(
                        Method::DELETE,
                        &format!("/keys/{name}"),
                        &[],
                        Some(json_body(&body)?),
                    )
                    .await
            }
        }
    }

    /// Run the command and print the response.
    ///
    /// # Errors
    ///
    /// See [`KeysCommand::execute`].
    pub async fn run(&self) -> Result<(), ClientError> {
        let body = self.execute().await?;
        print_response(&body);
        Ok(())
    }
}
