//! Client-facing rendering of key records.
//!
//! The same address and public-key bytes are rendered under the Bech32
//! prefixes of the requested [`AddressVariant`]; only the text changes.

use keyserver_core::address::AddressVariant;
use keyserver_core::error::TxError;
use serde::{Deserialize, Serialize};

use crate::store::KeyInfo;

/// Key type reported for records held by this keystore.
pub const LOCAL_KEY_TYPE: &str = "local";

/// A key as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOutput {
    /// Key name.
    pub name: String,
    /// Key type, always `local`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Bech32 address.
    pub address: String,
    /// Bech32 public key.
    pub pub_key: String,
    /// The mnemonic, only present right after creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
}

impl KeyOutput {
    /// Attaches the mnemonic a key was created from.
    #[must_use]
    pub fn with_mnemonic(mut self, mnemonic: impl Into<String>) -> Self {
        self.mnemonic = Some(mnemonic.into());
        self
    }
}

/// Renders a key under the given variant.
///
/// # Errors
///
/// Returns [`TxError::Encode`] if Bech32 encoding fails.
pub fn format_key(info: &KeyInfo, variant: AddressVariant) -> Result<KeyOutput, TxError> {
    Ok(KeyOutput {
        name: info.name.clone(),
        kind: LOCAL_KEY_TYPE.to_string(),
        address: variant.encode_address(&info.address)?,
        pub_key: variant.encode_pubkey(&info.pubkey)?,
        mnemonic: None,
    })
}

/// Renders a list of keys with account prefixes.
///
/// # Errors
///
/// Returns [`TxError::Encode`] if any key fails to encode.
pub fn format_keys(infos: &[KeyInfo]) -> Result<Vec<KeyOutput>, TxError> {
    infos
        .iter()
        .map(|info| format_key(info, AddressVariant::Account))
        .collect()
}
