//! Key custody: the [`Keystore`] capability and its file-backed implementation.
//!
//! A keystore owns named key records. Each record holds the public key, the
//! derived address and the password-encrypted private key; callers only ever
//! see the [`KeyInfo`] projection. All password checks and signing happen
//! inside the keystore.
//!
//! # Security Properties
//!
//! - **Encryption at rest**: private keys are encrypted with Argon2id + ChaCha20-Poly1305
//! - **Restricted permissions**: directory 0700, files 0600
//! - **Atomic writes**: records are written to a temp file and then linked or renamed into place
//! - **Uniqueness at commit**: creating a record fails if the name appeared after any earlier check
//!
//! # Example
//!
//! ```no_run
//! use keyserver_crypto::encryption::KdfParams;
//! use keyserver_crypto::store::{FileKeystore, Keystore};
//! use std::path::PathBuf;
//!
//! let store = FileKeystore::open(PathBuf::from("/tmp/keyserver"), KdfParams::default())
//!     .expect("failed to open keystore");
//!
//! let mnemonic = store.create_mnemonic("123456789").expect("entropy available");
//! let info = store
//!     .create_account("jack", &mnemonic, "", "password", 0, 0)
//!     .expect("failed to create key");
//!
//! let (signature, pubkey) = store.sign("jack", "password", b"payload").expect("signs");
//! assert_eq!(pubkey, info.pubkey);
//! assert_eq!(signature.len(), 64);
//! ```

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use keyserver_core::address::{ADDRESS_LEN, PUBKEY_LEN};
use keyserver_core::error::StoreError;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::encryption::{decrypt_key, encrypt_key, EncryptedKey, KdfParams};
use crate::hd;
use crate::keys::{address_from_pubkey, SecretKey, SIGNATURE_LEN};

/// Subdirectory of the keystore home holding the records.
const KEYS_SUBDIR: &str = "keys";

/// Extension of record files.
const RECORD_EXTENSION: &str = "json";

/// Longest accepted key name.
pub const MAX_NAME_LEN: usize = 128;

// ============================================================================
// KeyInfo
// ============================================================================

/// Public projection of a key record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Unique key name.
    pub name: String,
    /// Compressed secp256k1 public key.
    pub pubkey: [u8; PUBKEY_LEN],
    /// Account address, `RIPEMD-160(SHA-256(pubkey))`.
    pub address: [u8; ADDRESS_LEN],
}

impl KeyInfo {
    /// Builds the projection for a public key.
    #[must_use]
    pub fn new(name: impl Into<String>, pubkey: [u8; PUBKEY_LEN]) -> Self {
        Self {
            name: name.into(),
            address: address_from_pubkey(&pubkey),
            pubkey,
        }
    }
}

// ============================================================================
// Keystore Trait
// ============================================================================

/// Named, password-protected key custody.
///
/// Implementations are synchronous and may block on I/O or key derivation;
/// async callers should run them on a blocking thread.
pub trait Keystore: Send + Sync {
    /// Generate a new mnemonic.
    ///
    /// `passphrase` is accepted for compatibility with callers that supply a
    /// fixed entropy-derivation passphrase. The phrase is drawn from OS
    /// entropy and does not depend on it.
    ///
    /// # Errors
    /// - `StoreError::Derivation` if the phrase cannot be produced
    fn create_mnemonic(&self, passphrase: &str) -> Result<String, StoreError>;

    /// Derive a key from a mnemonic and store it under `name`.
    ///
    /// # Errors
    /// - `StoreError::InvalidName` if the name cannot be stored
    /// - `StoreError::InvalidMnemonic` if the mnemonic fails validation
    /// - `StoreError::KeyExists` if the name is already taken at commit time
    /// - `StoreError::EncryptionFailed` / `StoreError::IoError` on storage failures
    fn create_account(
        &self,
        name: &str,
        mnemonic: &str,
        bip39_passphrase: &str,
        password: &str,
        account: u32,
        index: u32,
    ) -> Result<KeyInfo, StoreError>;

    /// Look up a key by name.
    ///
    /// # Errors
    /// - `StoreError::KeyNotFound` if no key exists with this name
    fn get(&self, name: &str) -> Result<KeyInfo, StoreError>;

    /// All keys, sorted by name.
    ///
    /// # Errors
    /// - `StoreError::IoError` if the directory cannot be read
    fn list(&self) -> Result<Vec<KeyInfo>, StoreError>;

    /// Re-encrypt a key under a new password.
    ///
    /// # Errors
    /// - `StoreError::KeyNotFound` if no key exists with this name
    /// - `StoreError::DecryptionFailed` if `old_password` is wrong
    fn update(&self, name: &str, old_password: &str, new_password: &str)
        -> Result<(), StoreError>;

    /// Delete a key after checking its password.
    ///
    /// # Errors
    /// - `StoreError::KeyNotFound` if no key exists with this name
    /// - `StoreError::DecryptionFailed` if `password` is wrong
    fn delete(&self, name: &str, password: &str) -> Result<(), StoreError>;

    /// Sign `message` with the named key.
    ///
    /// Returns the 64-byte signature and the signer's compressed public key.
    ///
    /// # Errors
    /// - `StoreError::KeyNotFound` if no key exists with this name
    /// - `StoreError::DecryptionFailed` if `password` is wrong
    fn sign(
        &self,
        name: &str,
        password: &str,
        message: &[u8],
    ) -> Result<([u8; SIGNATURE_LEN], [u8; PUBKEY_LEN]), StoreError>;

    /// Whether a key with this name exists.
    ///
    /// # Errors
    /// Propagates any lookup failure other than `StoreError::KeyNotFound`.
    fn exists(&self, name: &str) -> Result<bool, StoreError> {
        match self.get(name) {
            Ok(_) => Ok(true),
            Err(StoreError::KeyNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// On-disk record
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct KeyRecord {
    name: String,
    #[serde(with = "hex::serde")]
    pubkey: Vec<u8>,
    #[serde(with = "hex::serde")]
    address: Vec<u8>,
    kdf: KdfParams,
    #[serde(with = "hex::serde")]
    encrypted_key: Vec<u8>,
}

impl KeyRecord {
    fn seal(
        name: &str,
        key: &SecretKey,
        password: &str,
        kdf: KdfParams,
    ) -> Result<Self, StoreError> {
        let pubkey = key.public_key().map_err(|_| StoreError::EncryptionFailed)?;
        let info = KeyInfo::new(name, pubkey);
        let encrypted = encrypt_key(key, password, kdf)?;

        Ok(Self {
            name: info.name,
            pubkey: info.pubkey.to_vec(),
            address: info.address.to_vec(),
            kdf,
            encrypted_key: encrypted.to_bytes(),
        })
    }

    fn unseal(&self, password: &str) -> Result<SecretKey, StoreError> {
        let encrypted = EncryptedKey::from_bytes(&self.encrypted_key)?;
        decrypt_key(&encrypted, password, self.kdf)
    }

    fn info(&self) -> Result<KeyInfo, StoreError> {
        let pubkey: [u8; PUBKEY_LEN] = self
            .pubkey
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::InvalidFormat)?;
        let info = KeyInfo::new(self.name.clone(), pubkey);

        if info.address.as_slice() != self.address.as_slice() {
            return Err(StoreError::InvalidFormat);
        }

        Ok(info)
    }
}

// ============================================================================
// FileKeystore Implementation
// ============================================================================

/// File-backed keystore storing one JSON record per key under `<home>/keys/`.
///
/// New records are encrypted with the configured [`KdfParams`]; each record
/// stores the parameters it was written with.
#[derive(Debug, Clone)]
pub struct FileKeystore {
    keys_dir: PathBuf,
    kdf: KdfParams,
}

impl FileKeystore {
    /// Open (creating if needed) the keystore rooted at `home`.
    ///
    /// # Errors
    /// - `StoreError::IoError` if directory creation fails
    /// - `StoreError::PermissionDenied` if permissions cannot be set
    pub fn open(home: impl AsRef<Path>, kdf: KdfParams) -> Result<Self, StoreError> {
        let keys_dir = home.as_ref().join(KEYS_SUBDIR);

        if !keys_dir.exists() {
            fs::create_dir_all(&keys_dir)?;
        }

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&keys_dir)?.permissions();
            perms.set_mode(0o700);
            fs::set_permissions(&keys_dir, perms)?;
        }

        Ok(Self { keys_dir, kdf })
    }

    /// The directory holding the key records.
    #[must_use]
    pub fn keys_dir(&self) -> &Path {
        &self.keys_dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.keys_dir.join(format!("{name}.{RECORD_EXTENSION}"))
    }

    /// Validate a key name.
    ///
    /// Valid names are 1 to [`MAX_NAME_LEN`] characters of ASCII
    /// alphanumerics, `-`, `_` and `.`, and do not start with `.`.
    ///
    /// # Errors
    /// - `StoreError::InvalidName` otherwise
    pub fn validate_name(name: &str) -> Result<(), StoreError> {
        let valid = !name.is_empty()
            && name.len() <= MAX_NAME_LEN
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if valid {
            Ok(())
        } else {
            Err(StoreError::invalid_name(name))
        }
    }

    /// A name that could never have been stored is reported as not found.
    fn read_record(&self, name: &str) -> Result<KeyRecord, StoreError> {
        if Self::validate_name(name).is_err() {
            return Err(StoreError::key_not_found(name));
        }

        let bytes = match fs::read(self.record_path(name)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::key_not_found(name));
            }
            Err(e) => return Err(e.into()),
        };

        let record: KeyRecord =
            serde_json::from_slice(&bytes).map_err(|_| StoreError::InvalidFormat)?;
        if record.name != name {
            return Err(StoreError::InvalidFormat);
        }

        Ok(record)
    }

    /// Write `record` to a fresh temp file with 0600 permissions.
    fn write_temp(&self, record: &KeyRecord) -> Result<PathBuf, StoreError> {
        let bytes = serde_json::to_vec_pretty(record).map_err(|_| StoreError::EncryptionFailed)?;
        let temp_path = self
            .keys_dir
            .join(format!(".{}.{:016x}.tmp", record.name, rand::rngs::OsRng.next_u64()));

        let written = (|| -> Result<(), StoreError> {
            let mut file = File::create(&temp_path)?;

            #[cfg(unix)]
            {
                let mut perms = file.metadata()?.permissions();
                perms.set_mode(0o600);
                file.set_permissions(perms)?;
            }

            file.write_all(&bytes)?;
            file.sync_all()?;
            Ok(())
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        Ok(temp_path)
    }

    /// Commit a new record; fails if the name already exists.
    fn insert(&self, record: &KeyRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.name);
        let temp_path = self.write_temp(record)?;

        let linked = fs::hard_link(&temp_path, &path);
        let _ = fs::remove_file(&temp_path);

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::key_exists(record.name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace an existing record.
    fn replace(&self, record: &KeyRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.name);
        let temp_path = self.write_temp(record)?;

        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        Ok(())
    }
}

impl Keystore for FileKeystore {
    fn create_mnemonic(&self, _passphrase: &str) -> Result<String, StoreError> {
        hd::generate_mnemonic()
    }

    fn create_account(
        &self,
        name: &str,
        mnemonic: &str,
        bip39_passphrase: &str,
        password: &str,
        account: u32,
        index: u32,
    ) -> Result<KeyInfo, StoreError> {
        Self::validate_name(name)?;

        let mnemonic = hd::validate_mnemonic(mnemonic)?;
        let key = hd::derive_secret_key(&mnemonic, bip39_passphrase, account, index)?;
        let record = KeyRecord::seal(name, &key, password, self.kdf)?;

        self.insert(&record)?;
        debug!(key_name = %name, account, index, "key record created");

        record.info()
    }

    fn get(&self, name: &str) -> Result<KeyInfo, StoreError> {
        self.read_record(name)?.info()
    }

    fn list(&self) -> Result<Vec<KeyInfo>, StoreError> {
        let mut infos = Vec::new();

        for entry in fs::read_dir(&self.keys_dir)? {
            let path = entry?.path();

            if !path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if Self::validate_name(name).is_err() {
                continue;
            }

            match self.read_record(name).and_then(|record| record.info()) {
                Ok(info) => infos.push(info),
                // Deleted between read_dir and read.
                Err(StoreError::KeyNotFound { .. }) => {}
                Err(e) => warn!(key_name = %name, error = %e, "skipping unreadable key record"),
            }
        }

        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    fn update(
        &self,
        name: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), StoreError> {
        let record = self.read_record(name)?;
        let key = record.unseal(old_password)?;

        let updated = KeyRecord::seal(name, &key, new_password, self.kdf)?;
        self.replace(&updated)?;
        debug!(key_name = %name, "key record re-encrypted");

        Ok(())
    }

    fn delete(&self, name: &str, password: &str) -> Result<(), StoreError> {
        let record = self.read_record(name)?;
        record.unseal(password)?;

        match fs::remove_file(self.record_path(name)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::key_not_found(name));
            }
            Err(e) => return Err(e.into()),
        }
        debug!(key_name = %name, "key record deleted");

        Ok(())
    }

    fn sign(
        &self,
        name: &str,
        password: &str,
        message: &[u8],
    ) -> Result<([u8; SIGNATURE_LEN], [u8; PUBKEY_LEN]), StoreError> {
        let record = self.read_record(name)?;
        let key = record.unseal(password)?;

        key.sign(message).map_err(|_| StoreError::InvalidFormat)
    }
}

// ============================================================================
// Tests
// ============================================================================
