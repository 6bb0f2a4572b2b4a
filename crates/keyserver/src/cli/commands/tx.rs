//! # Tx Command
//!
//! Transaction helpers through a running server.
//!
//! ```text
//! keyserver tx send <sender> <receiver> <amount> <chain-id> [--memo M] [--fees F] [--gas-adjustment X]
//! keyserver tx sign <name> <password> <chain-id> <account-number> <sequence> <tx-file>
//! keyserver tx broadcast <tx-file>
//! ```
//!
//! `send` prints an unsigned transaction; save it to a file, `sign` it, then
//! `broadcast` the result.

use reqwest::Method;
use serde_json::json;

use super::client::{json_body, print_response, read_json_file, ApiClient, ClientError};
use crate::cli::args::TxCommands;

/// The `keyserver tx` command handler.
#[derive(Debug, Clone)]
pub struct TxCommand {
    client: ApiClient,
    command: TxCommands,
}

impl TxCommand {
    /// Create a new `TxCommand`.
    #[must_use]
    pub const fn new(client: ApiClient, command: TxCommands) -> Self {
        Self { client, command }
    }

    /// Sends the request and returns the response body.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if a transaction file cannot be read, the
    /// server is unreachable, or it answers with a non-2xx status.
    pub async fn execute(&self) -> Result<Vec<u8>, ClientError> {
        match &self.command {
            TxCommands::Sign {
                name,
                password,
                chain_id,
                account_number,
                sequence,
                tx_file,
            } => {
                let body = json!({
                    "tx": read_json_file(tx_file)?,
                    "name": name,
                    "passphrase": password,
                    "chain_id": chain_id,
                    "account_number": account_number,
                    "sequence": sequence,
                });
                self.client
                    .request(Method::POST, "/tx/sign", &[], Some(json_body(&body)?))
                    .await
            }
            TxCommands::Broadcast { tx_file } => {
                let tx = read_json_file(tx_file)?;
                self.client
                    .request(Method::POST, "/tx/broadcast", &[], Some(json_body(&tx)?))
                    .await
            }
            TxCommands::Send {
                sender,
                receiver,
                amount,
                chain_id,
                memo,
                fees,
                gas_adjustment,
            } => {
                let body = json!({
                    "sender": sender,
                    "reciever": receiver,
                    "amount": amount,
                    "chain-id": chain_id,
                    "memo": memo,
                    "fees": fees,
                    "gas_adjustment": gas_adjustment,
                });
                self.client
                    .request(Method::POST, "/tx/bank/send", &[], Some(json_body(&body)?))
                    .await
            }
        }
    }

    /// Run the command and print the response.
    ///
    /// # Errors
    ///
    /// See [`TxCommand::execute`].
    pub async fn run(&self) -> Result<(), ClientError> {
        let body = self.execute().await?;
        print_response(&body);
        Ok(())
    }
}
