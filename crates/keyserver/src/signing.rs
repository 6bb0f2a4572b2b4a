//! Sign orchestration.
//!
//! Signing is split in two so the pure part can run on the request task and
//! only the keystore call goes to a blocking thread:
//!
//! - [`prepare`] parses the request and builds the canonical sign document
//! - [`sign_prepared`] has the keystore sign those bytes and appends the
//!   signature to the transaction
//!
//! Existing signatures are kept in order, so a transaction can collect
//! signatures from several keys one request at a time.

use std::fmt;

use keyserver_chain::SignDocument;
use keyserver_core::error::GatewayError;
use keyserver_core::types::{PubKey, SignContext, StdSignature, StdTx};
use keyserver_crypto::Keystore;
use serde::{Deserialize, Serialize};

/// Body of `POST /tx/sign`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SignRequest {
    /// The unsigned (or partially signed) transaction in amino JSON.
    #[serde(default)]
    pub tx: serde_json::Value,
    /// Name of the signing key.
    #[serde(default)]
    pub name: String,
    /// Password of the signing key.
    #[serde(default)]
    pub passphrase: String,
    /// Chain the signature is valid on.
    #[serde(default)]
    pub chain_id: String,
    /// Signer's account number, as a decimal string.
    #[serde(default)]
    pub account_number: String,
    /// Signer's sequence, as a decimal string.
    #[serde(default)]
    pub sequence: String,
}

impl fmt::Debug for SignRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignRequest")
            .field("name", &self.name)
            .field("chain_id", &self.chain_id)
            .field("account_number", &self.account_number)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// A parsed transaction and the bytes its next signature must cover.
#[derive(Debug, Clone)]
pub struct PreparedSign {
    /// The transaction to extend.
    pub tx: StdTx,
    /// Its sign document.
    pub document: SignDocument,
}

/// Parses the transaction and signing context and builds the sign document.
///
/// # Errors
///
/// Returns `Validation` if the transaction, account number or sequence does
/// not parse.
pub fn prepare(request: &SignRequest) -> Result<PreparedSign, GatewayError> {
    let tx = StdTx::from_value(request.tx.clone())?;
    let context = SignContext::parse(
        request.chain_id.as_str(),
        &request.account_number,
        &request.sequence,
    )?;
    let document = SignDocument::new(&tx, &context)?;

    Ok(PreparedSign { tx, document })
}

/// Signs a prepared document and appends the signature.
///
/// # Errors
///
/// - `NotFound` if the key does not exist
/// - `Unauthorized` if the password is wrong
/// - `Upstream` for any other keystore failure
pub fn sign_prepared(
    keystore: &dyn Keystore,
    name: &str,
    passphrase: &str,
    prepared: PreparedSign,
) -> Result<StdTx, GatewayError> {
    let PreparedSign { mut tx, document } = prepared;

    let (signature, pubkey) = keystore.sign(name, passphrase, document.as_bytes())?;
    tx.signatures
        .push(StdSignature::new(PubKey::new(pubkey), signature.to_vec()));

    Ok(tx)
}
