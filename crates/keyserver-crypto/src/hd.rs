//! BIP-39 mnemonics and BIP-32/44 derivation.
//!
//! Keys are derived along `m/44'/118'/{account}'/0/{index}`, the Cosmos
//! coin type path. Both `account` and `index` must fit in 31 bits because the
//! account level is hardened.
//!
//! # Example
//!
//! ```
//! use keyserver_crypto::hd::{derive_secret_key, generate_mnemonic, validate_mnemonic};
//!
//! let phrase = generate_mnemonic().expect("entropy available");
//! assert_eq!(phrase.split(' ').count(), 24);
//!
//! let mnemonic = validate_mnemonic(&phrase).expect("generated phrases are valid");
//! let key = derive_secret_key(&mnemonic, "", 0, 0).expect("derivation succeeds");
//! assert!(key.public_key().is_ok());
//! ```

use bip32::{DerivationPath, XPrv};
use bip39::{Language, Mnemonic};
use keyserver_core::error::StoreError;
use rand::RngCore;
use zeroize::Zeroize;

use crate::keys::SecretKey;

/// BIP-44 coin type registered for the Cosmos Hub.
pub const COIN_TYPE: u32 = 118;

/// Largest account or index value a derivation path accepts.
pub const MAX_PATH_COMPONENT: u32 = 0x7FFF_FFFF;

/// BIP-39 passphrase applied when deriving seeds from mnemonics.
pub const DEFAULT_BIP39_PASSPHRASE: &str = "";

/// Entropy drawn for a generated mnemonic (256 bits, 24 words).
const MNEMONIC_ENTROPY_LEN: usize = 32;

/// Generates a fresh 24-word English mnemonic from OS entropy.
///
/// # Errors
///
/// Returns [`StoreError::Derivation`] if the entropy cannot be encoded, which
/// only happens for entropy lengths BIP-39 does not define.
pub fn generate_mnemonic() -> Result<String, StoreError> {
    let mut entropy = [0u8; MNEMONIC_ENTROPY_LEN];
    rand::rngs::OsRng.fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
        .map_err(|e| StoreError::derivation(e.to_string()));
    entropy.zeroize();

    Ok(mnemonic?.to_string())
}

/// Checks a phrase against the English word list and its checksum.
///
/// # Errors
///
/// Returns [`StoreError::InvalidMnemonic`] for unknown words, a bad word
/// count or a checksum mismatch.
pub fn validate_mnemonic(phrase: &str) -> Result<Mnemonic, StoreError> {
    Mnemonic::parse_in(Language::English, phrase).map_err(|_| StoreError::InvalidMnemonic)
}

/// The derivation path for an account and address index.
#[must_use]
pub fn derivation_path(account: u32, index: u32) -> String {
    format!("m/44'/{COIN_TYPE}'/{account}'/0/{index}")
}

/// Derives the secp256k1 secret key for an account and address index.
///
/// # Errors
///
/// Returns [`StoreError::Derivation`] if `account` or `index` is above
/// [`MAX_PATH_COMPONENT`] or the derivation itself fails.
pub fn derive_secret_key(
    mnemonic: &Mnemonic,
    bip39_passphrase: &str,
    account: u32,
    index: u32,
) -> Result<SecretKey, StoreError> {
    if account > MAX_PATH_COMPONENT {
        return Err(StoreError::derivation(format!("account {account} out of range")));
    }
    if index > MAX_PATH_COMPONENT {
        return Err(StoreError::derivation(format!("index {index} out of range")));
    }

    let path: DerivationPath = derivation_path(account, index)
        .parse()
        .map_err(|e: bip32::Error| StoreError::derivation(e.to_string()))?;

    let mut seed = mnemonic.to_seed(bip39_passphrase);
    let child = XPrv::derive_from_path(&seed, &path);
    seed.zeroize();

    let child = child.map_err(|e| StoreError::derivation(e.to_string()))?;
    let mut bytes: [u8; 32] = child.private_key().to_bytes().into();
    let key = SecretKey::new(bytes);
    bytes.zeroize();

    Ok(key)
}
