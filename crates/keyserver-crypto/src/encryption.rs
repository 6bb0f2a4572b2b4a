//! AEAD encryption for key material at rest.
//!
//! Private keys are encrypted with ChaCha20-Poly1305 under a key derived from
//! the record password with Argon2id. Each encryption draws a fresh salt and
//! nonce from the OS RNG, and derived keys are zeroized after use.
//!
//! # Encrypted Key Format
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │ version: 1 (1 byte)                 │
//! │ salt: [u8; 16]                      │
//! │ nonce: [u8; 12]                     │
//! │ ciphertext: [u8; 32]                │
//! │ tag: [u8; 16]                       │
//! └─────────────────────────────────────┘
//! ```
//!
//! The Argon2id cost is not part of this blob; it is stored alongside it in
//! the key record as [`KdfParams`] so records stay readable when the
//! configured cost changes.
//!
//! # Example
//!
//! ```rust
//! use keyserver_crypto::encryption::{decrypt_key, encrypt_key, EncryptedKey, KdfParams};
//! use keyserver_crypto::keys::SecretKey;
//!
//! let params = KdfParams::new(64, 1, 1);
//! let key = SecretKey::new([7u8; 32]);
//!
//! let bytes = encrypt_key(&key, "password", params).expect("encrypts").to_bytes();
//! let encrypted = EncryptedKey::from_bytes(&bytes).expect("well formed");
//! let decrypted = decrypt_key(&encrypted, "password", params).expect("decrypts");
//! assert_eq!(decrypted, key);
//! ```

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use keyserver_core::config::KeysConfig;
use keyserver_core::error::StoreError;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::keys::{SecretKey, SECRET_KEY_LEN};

// ============================================================================
// Constants
// ============================================================================

/// Current encryption format version.
pub const ENCRYPTION_VERSION: u8 = 1;

/// Length of the salt in bytes.
pub const SALT_LEN: usize = 16;

/// Length of the nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Length of the authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Total length of a serialized encrypted key.
pub const ENCRYPTED_KEY_LEN: usize = 1 + SALT_LEN + NONCE_LEN + SECRET_KEY_LEN + TAG_LEN;

const ARGON2_OUTPUT_LEN: usize = 32;

// ============================================================================
// Types
// ============================================================================

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl KdfParams {
    /// Creates a parameter set.
    #[must_use]
    pub const fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }

    /// The parameters configured for new records.
    #[must_use]
    pub const fn from_config(keys: &KeysConfig) -> Self {
        Self::new(keys.kdf_memory_kib, keys.kdf_iterations, keys.kdf_parallelism)
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::from_config(&KeysConfig::default())
    }
}

/// An encrypted secret key container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedKey {
    /// Format version (currently always 1).
    pub version: u8,
    /// Random salt used for Argon2id key derivation.
    pub salt: [u8; SALT_LEN],
    /// Random nonce used for ChaCha20-Poly1305 encryption.
    pub nonce: [u8; NONCE_LEN],
    /// Encrypted key material with authentication tag.
    pub ciphertext: Vec<u8>,
}

impl EncryptedKey {
    /// Serialize as `version || salt || nonce || ciphertext || tag`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(ENCRYPTED_KEY_LEN);
        bytes.push(self.version);
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Deserialize an encrypted key from bytes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidFormat` if the length or version byte is wrong.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != ENCRYPTED_KEY_LEN {
            return Err(StoreError::InvalidFormat);
        }

        let (&version, rest) = bytes.split_first().ok_or(StoreError::InvalidFormat)?;
        if version != ENCRYPTION_VERSION {
            return Err(StoreError::InvalidFormat);
        }

        let (salt, rest) = rest.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        Ok(Self {
            version,
            salt: salt.try_into().map_err(|_| StoreError::InvalidFormat)?,
            nonce: nonce.try_into().map_err(|_| StoreError::InvalidFormat)?,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

// ============================================================================
// Key Derivation
// ============================================================================

fn derive_key(
    password: &str,
    salt: &[u8; SALT_LEN],
    params: KdfParams,
) -> Result<[u8; ARGON2_OUTPUT_LEN], StoreError> {
    let params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(ARGON2_OUTPUT_LEN),
    )
    .map_err(|_| StoreError::InvalidFormat)?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = [0u8; ARGON2_OUTPUT_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut output)
        .map_err(|_| StoreError::EncryptionFailed)?;

    Ok(output)
}

// ============================================================================
// Encryption / Decryption
// ============================================================================

/// Encrypt a secret key with a password.
///
/// # Errors
///
/// Returns `StoreError::InvalidFormat` if the KDF parameters are rejected by
/// Argon2 and `StoreError::EncryptionFailed` if derivation or encryption fails.
pub fn encrypt_key(
    secret_key: &SecretKey,
    password: &str,
    params: KdfParams,
) -> Result<EncryptedKey, StoreError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let mut encryption_key = derive_key(password, &salt, params)?;

    let cipher = ChaCha20Poly1305::new_from_slice(&encryption_key)
        .map_err(|_| StoreError::EncryptionFailed);
    encryption_key.zeroize();

    let ciphertext = cipher?
        .encrypt(Nonce::from_slice(&nonce_bytes), secret_key.as_bytes().as_ref())
        .map_err(|_| StoreError::EncryptionFailed)?;

    Ok(EncryptedKey {
        version: ENCRYPTION_VERSION,
        salt,
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt a secret key with a password.
///
/// # Errors
///
/// Returns `StoreError::InvalidFormat` for an unknown version or a
/// ciphertext of the wrong length, and `StoreError::DecryptionFailed` when
/// the password is wrong or the ciphertext was tampered with.
pub fn decrypt_key(
    encrypted: &EncryptedKey,
    password: &str,
    params: KdfParams,
) -> Result<SecretKey, StoreError> {
    if encrypted.version != ENCRYPTION_VERSION {
        return Err(StoreError::InvalidFormat);
    }

    if encrypted.ciphertext.len() != SECRET_KEY_LEN + TAG_LEN {
        return Err(StoreError::InvalidFormat);
    }

    let mut encryption_key = derive_key(password, &encrypted.salt, params)?;

    let cipher = ChaCha20Poly1305::new_from_slice(&encryption_key)
        .map_err(|_| StoreError::DecryptionFailed);
    encryption_key.zeroize();

    let mut plaintext = cipher?
        .decrypt(Nonce::from_slice(&encrypted.nonce), encrypted.ciphertext.as_ref())
        .map_err(|_| StoreError::DecryptionFailed)?;

    let bytes: Result<[u8; SECRET_KEY_LEN], _> = plaintext.as_slice().try_into();
    plaintext.zeroize();

    Ok(SecretKey::new(bytes.map_err(|_| StoreError::InvalidFormat)?))
}
