//! # keyserver-crypto
//!
//! Key custody for the keyserver gateway.
//!
//! This crate is an internal implementation detail of the `keyserver` binary;
//! its API may change between any two versions.
//!
//! ## Modules
//!
//! - [`keys`] - Secret key type with zeroization, signing and address derivation
//! - [`hd`] - BIP-39 mnemonics and `m/44'/118'/{account}'/0/{index}` derivation
//! - [`encryption`] - Argon2id + ChaCha20-Poly1305 encryption at rest
//! - [`store`] - The [`Keystore`] trait and its file-backed implementation
//! - [`format`] - Bech32 rendering of key records for API responses
//!
//! ## Security
//!
//! - Secret keys are zeroized on drop and never printed
//! - Records are encrypted with a password-derived key
//! - Key files are written with restrictive permissions (0600)

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod encryption;
pub mod format;
pub mod hd;
pub mod keys;
pub mod store;

pub use encryption::KdfParams;
pub use format::{format_key, format_keys, KeyOutput};
pub use keys::{address_from_pubkey, SecretKey, SecretKeyError};
pub use store::{FileKeystore, KeyInfo, Keystore};
