//! Request validation for key custody operations.
//!
//! Every check here runs before the keystore is asked to change anything.
//! Creation is validated in this order, stopping at the first failure:
//!
//! 1. name and password are present
//! 2. a mnemonic is generated if none was supplied
//! 3. the mnemonic passes the BIP-39 checksum test
//! 4. `account` and `index` lie in `0..=2^31-1`
//! 5. no key with the name exists yet
//!
//! The existence check is advisory. Two concurrent requests for the same name
//! can both pass it; the keystore decides at commit time and its
//! `KeyExists` error is the one the losing client sees.

use std::fmt;

use keyserver_core::error::{GatewayError, StoreError};
use keyserver_crypto::hd::{validate_mnemonic, DEFAULT_BIP39_PASSPHRASE, MAX_PATH_COMPONENT};
use keyserver_crypto::{format_key, Keystore, KeyOutput};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Passphrase handed to the keystore when the gateway generates a mnemonic.
pub const DEFAULT_MNEMONIC_PASSPHRASE: &str = "123456789";

/// Message for a creation request without a name or password.
pub const MISSING_CREDENTIALS: &str = "must include both password and name with request";

// ============================================================================
// Request bodies
// ============================================================================

/// A BIP-44 path component as clients send it: a decimal string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathComponent {
    /// A JSON number.
    Number(i64),
    /// A decimal string such as `"0"`.
    Text(String),
}

impl PathComponent {
    /// The component as a hardened-path value, or `None` if it is not an
    /// integer in `0..=2^31-1`.
    ///
    /// An empty string counts as zero.
    #[must_use]
    pub fn value(&self) -> Option<u32> {
        let raw = match self {
            Self::Number(n) => *n,
            Self::Text(s) if s.trim().is_empty() => 0,
            Self::Text(s) => s.trim().parse().ok()?,
        };
        u32::try_from(raw)
            .ok()
            .filter(|value| *value <= MAX_PATH_COMPONENT)
    }
}

impl From<u32> for PathComponent {
    fn from(value: u32) -> Self {
        Self::Text(value.to_string())
    }
}

/// Body of `POST /keys`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct NewKeyRequest {
    /// Key name.
    #[serde(default)]
    pub name: String,
    /// Password that will encrypt the key.
    #[serde(default)]
    pub password: String,
    /// Mnemonic to restore; a new one is generated when absent or empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    /// BIP-44 account, default 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<PathComponent>,
    /// BIP-44 address index, default 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<PathComponent>,
}

impl fmt::Debug for NewKeyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewKeyRequest")
            .field("name", &self.name)
            .field("password", &"[REDACTED]")
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "[REDACTED]"))
            .field("account", &self.account)
            .field("index", &self.index)
            .finish()
    }
}

/// Body of `PUT /keys/{name}`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct UpdateKeyRequest {
    /// Current password.
    #[serde(default)]
    pub old_password: String,
    /// Replacement password.
    #[serde(default)]
    pub new_password: String,
}

impl fmt::Debug for UpdateKeyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UpdateKeyRequest { .. }")
    }
}

/// Body of `DELETE /keys/{name}`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct DeleteKeyRequest {
    /// Current password.
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for DeleteKeyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeleteKeyRequest { .. }")
    }
}

// ============================================================================
// Validation
// ============================================================================

/// A creation request that passed every check.
pub struct ValidatedKey {
    /// Key name.
    pub name: String,
    /// Encryption password.
    pub password: Zeroizing<String>,
    /// Checksum-valid mnemonic, supplied or generated.
    pub mnemonic: Zeroizing<String>,
    /// BIP-44 account.
    pub account: u32,
    /// BIP-44 address index.
    pub index: u32,
}

impl fmt::Debug for ValidatedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedKey")
            .field("name", &self.name)
            .field("account", &self.account)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// Validates a creation request against `keystore`.
///
/// # Errors
///
/// - `Validation` for a missing name or password, an invalid mnemonic or an
///   out-of-range account or index
/// - `Conflict` if the name is taken
/// - `Upstream` if the keystore cannot generate a mnemonic or be read
pub fn validate_new_key(
    request: NewKeyRequest,
    keystore: &dyn Keystore,
) -> Result<ValidatedKey, GatewayError> {
    let NewKeyRequest {
        name,
        password,
        mnemonic,
        account,
        index,
    } = request;
    let password = Zeroizing::new(password);

    if name.is_empty() || password.is_empty() {
        return Err(GatewayError::validation(MISSING_CREDENTIALS));
    }

    let mnemonic = match mnemonic.filter(|m| !m.is_empty()) {
        Some(supplied) => Zeroizing::new(supplied),
        None => Zeroizing::new(keystore.create_mnemonic(DEFAULT_MNEMONIC_PASSPHRASE)?),
    };

    validate_mnemonic(&mnemonic)?;

    let account = path_component(account.as_ref())
        .ok_or_else(|| GatewayError::validation("invalid account number"))?;
    let index = path_component(index.as_ref())
        .ok_or_else(|| GatewayError::validation("invalid index number"))?;

    if keystore.exists(&name)? {
        return Err(StoreError::key_exists(name).into());
    }

    Ok(ValidatedKey {
        name,
        password,
        mnemonic,
        account,
        index,
    })
}

fn path_component(component: Option<&PathComponent>) -> Option<u32> {
    component.map_or(Some(0), PathComponent::value)
}

/// Validates and creates a key, returning it formatted with its mnemonic.
///
/// # Errors
///
/// Any error of [`validate_new_key`], plus whatever the keystore reports at
/// commit time (`Conflict` if another request created the name first).
pub fn create_key(
    request: NewKeyRequest,
    keystore: &dyn Keystore,
) -> Result<KeyOutput, GatewayError> {
    let key = validate_new_key(request, keystore)?;

    let info = keystore.create_account(
        &key.name,
        &key.mnemonic,
        DEFAULT_BIP39_PASSPHRASE,
        &key.password,
        key.account,
        key.index,
    )?;

    let output = format_key(&info, keyserver_core::AddressVariant::Account)?;
    Ok(output.with_mnemonic(key.mnemonic.as_str()))
}

/// Checks that a password change carries both passwords.
///
/// # Errors
///
/// Returns `Validation` if either password is empty.
pub fn validate_update(request: &UpdateKeyRequest) -> Result<(), GatewayError> {
    if request.old_password.is_empty() || request.new_password.is_empty() {
        return Err(GatewayError::validation(
            "must include both old_password and new_password with request",
        ));
    }
    Ok(())
}

/// Checks that a deletion carries a password.
///
/// # Errors
///
/// Returns `Validation` if the password is empty.
pub fn validate_delete(request: &DeleteKeyRequest) -> Result<(), GatewayError> {
    if request.password.is_empty() {
        return Err(GatewayError::validation("must include password with request"));
    }
    Ok(())
}
