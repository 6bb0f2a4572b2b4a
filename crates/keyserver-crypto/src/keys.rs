//! secp256k1 key material with secure memory handling.
//!
//! [`SecretKey`] zeroizes itself on drop, never prints its bytes and compares
//! in constant time. It is the only place private key bytes live between
//! decryption and signing.
//!
//! # Example
//!
//! ```
//! use keyserver_crypto::keys::{address_from_pubkey, SecretKey};
//!
//! let key = SecretKey::new([0x42u8; 32]);
//! let pubkey = key.public_key().expect("valid scalar");
//! let (signature, signer) = key.sign(b"sign me").expect("signing succeeds");
//!
//! assert_eq!(signer, pubkey);
//! assert_eq!(signature.len(), 64);
//! assert_eq!(address_from_pubkey(&pubkey).len(), 20);
//! ```

use k256::ecdsa::{signature::Signer, Signature, SigningKey};
use keyserver_core::address::{ADDRESS_LEN, PUBKEY_LEN};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The length of a secret key in bytes.
pub const SECRET_KEY_LEN: usize = 32;

/// The length of a compact `r || s` signature in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// A 32-byte secp256k1 secret key with automatic zeroization.
///
/// This type intentionally does not implement `Clone`; keys are moved, not
/// copied.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; SECRET_KEY_LEN],
}

impl SecretKey {
    /// Create a new `SecretKey` from raw bytes.
    ///
    /// The caller should zeroize the source bytes if they are no longer needed.
    #[must_use]
    pub const fn new(bytes: [u8; SECRET_KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Expose the raw bytes for cryptographic operations.
    ///
    /// The returned reference must not be stored or copied beyond the
    /// immediate operation.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.bytes
    }

    fn signing_key(&self) -> Result<SigningKey, SecretKeyError> {
        SigningKey::from_bytes((&self.bytes).into()).map_err(|_| SecretKeyError::InvalidKey)
    }

    /// The 33-byte compressed public key.
    ///
    /// # Errors
    ///
    /// Returns [`SecretKeyError::InvalidKey`] if the bytes are not a valid
    /// secp256k1 scalar (zero, or not below the curve order).
    pub fn public_key(&self) -> Result<[u8; PUBKEY_LEN], SecretKeyError> {
        let signing_key = self.signing_key()?;
        compressed_pubkey(&signing_key)
    }

    /// Sign a message.
    ///
    /// The message is hashed with SHA-256 and signed with RFC 6979
    /// deterministic ECDSA. The signature is normalized to low-S.
    ///
    /// Returns the 64-byte `r || s` signature and the signer's compressed
    /// public key.
    ///
    /// # Errors
    ///
    /// Returns [`SecretKeyError::InvalidKey`] if the key bytes are invalid.
    pub fn sign(
        &self,
        message: &[u8],
    ) -> Result<([u8; SIGNATURE_LEN], [u8; PUBKEY_LEN]), SecretKeyError> {
        let signing_key = self.signing_key()?;
        let signature: Signature = signing_key.sign(message);
        let signature = signature.normalize_s().unwrap_or(signature);

        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(&signature.to_bytes());

        Ok((out, compressed_pubkey(&signing_key)?))
    }
}

fn compressed_pubkey(signing_key: &SigningKey) -> Result<[u8; PUBKEY_LEN], SecretKeyError> {
    let point = signing_key.verifying_key().to_encoded_point(true);
    point
        .as_bytes()
        .try_into()
        .map_err(|_| SecretKeyError::InvalidKey)
}

/// Account address of a compressed public key: `RIPEMD-160(SHA-256(pubkey))`.
#[must_use]
pub fn address_from_pubkey(pubkey: &[u8]) -> [u8; ADDRESS_LEN] {
    let sha = Sha256::digest(pubkey);
    Ripemd160::digest(sha).into()
}

/// Errors related to secret key operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SecretKeyError {
    /// The provided bytes do not represent a valid secret key.
    #[error("invalid secret key bytes")]
    InvalidKey,
}

// Prevent accidental debug printing of secrets
impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

// Constant-time equality comparison to prevent timing attacks
impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for SecretKey {}

impl From<[u8; SECRET_KEY_LEN]> for SecretKey {
    fn from(bytes: [u8; SECRET_KEY_LEN]) -> Self {
        Self::new(bytes)
    }
}
