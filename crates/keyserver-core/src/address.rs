//! Bech32 address and public-key rendering.
//!
//! The same 20-byte address and 33-byte public key can be rendered under
//! three families of human-readable prefixes. [`AddressVariant`] is the closed
//! set of those families; unknown variant tags are rejected when parsed.
//!
//! # Example
//!
//! ```
//! use keyserver_core::address::AddressVariant;
//!
//! let variant: AddressVariant = "val".parse().expect("known tag");
//! assert_eq!(variant.address_hrp(), "cosmosvaloper");
//! assert!("ibc".parse::<AddressVariant>().is_err());
//! ```

use crate::error::TxError;
use bech32::{Bech32, Hrp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Amino registration prefix of `tendermint/PubKeySecp256k1`.
pub const SECP256K1_PUBKEY_AMINO_PREFIX: [u8; 4] = [0xeb, 0x5a, 0xe9, 0x87];

/// Amino registered name of the secp256k1 public key type.
pub const SECP256K1_PUBKEY_AMINO_NAME: &str = "tendermint/PubKeySecp256k1";

/// Length of a compressed secp256k1 public key.
pub const PUBKEY_LEN: usize = 33;

/// Length of an account address.
pub const ADDRESS_LEN: usize = 20;

const ACC_HRP: &str = "cosmos";
const ACC_PUB_HRP: &str = "cosmospub";
const VALOPER_HRP: &str = "cosmosvaloper";
const VALOPER_PUB_HRP: &str = "cosmosvaloperpub";
const VALCONS_HRP: &str = "cosmosvalcons";
const VALCONS_PUB_HRP: &str = "cosmosvalconspub";

// ============================================================================
// AddressVariant
// ============================================================================

/// Textual encoding family for addresses and public keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AddressVariant {
    /// Account addresses (`acc`).
    #[default]
    Account,
    /// Validator operator addresses (`val`).
    ValidatorOperator,
    /// Validator consensus addresses (`cons`).
    ValidatorConsensus,
}

impl AddressVariant {
    /// All supported variants.
    pub const ALL: [Self; 3] = [
        Self::Account,
        Self::ValidatorOperator,
        Self::ValidatorConsensus,
    ];

    /// The tag clients use to select this variant.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Account => "acc",
            Self::ValidatorOperator => "val",
            Self::ValidatorConsensus => "cons",
        }
    }

    /// Human-readable prefix for addresses.
    #[must_use]
    pub const fn address_hrp(self) -> &'static str {
        match self {
            Self::Account => ACC_HRP,
            Self::ValidatorOperator => VALOPER_HRP,
            Self::ValidatorConsensus => VALCONS_HRP,
        }
    }

    /// Human-readable prefix for public keys.
    #[must_use]
    pub const fn pubkey_hrp(self) -> &'static str {
        match self {
            Self::Account => ACC_PUB_HRP,
            Self::ValidatorOperator => VALOPER_PUB_HRP,
            Self::ValidatorConsensus => VALCONS_PUB_HRP,
        }
    }

    /// Parses an optional tag, treating a missing or empty tag as `acc`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownVariant`] for any other unrecognised tag.
    pub fn from_optional(tag: Option<&str>) -> Result<Self, UnknownVariant> {
        match tag {
            None | Some("") => Ok(Self::default()),
            Some(tag) => tag.parse(),
        }
    }

    /// Renders a raw address under this variant's prefix.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::Encode`] if the payload is too long for Bech32.
    pub fn encode_address(self, address: &[u8]) -> Result<String, TxError> {
        encode(self.address_hrp(), address)
    }

    /// Renders a compressed secp256k1 public key under this variant's prefix.
    ///
    /// The payload is the amino encoding of the key: the type prefix, a
    /// length byte, then the 33 key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::Encode`] if the payload is too long for Bech32.
    pub fn encode_pubkey(self, pubkey: &[u8]) -> Result<String, TxError> {
        encode(self.pubkey_hrp(), &amino_pubkey_bytes(pubkey))
    }
}

impl fmt::Display for AddressVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for AddressVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.tag() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// An address variant tag outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid Bech32 prefix encoding provided: {0}")]
pub struct UnknownVariant(pub String);

/// Amino binary form of a compressed secp256k1 public key.
#[must_use]
pub fn amino_pubkey_bytes(pubkey: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(SECP256K1_PUBKEY_AMINO_PREFIX.len() + 1 + pubkey.len());
    out.extend_from_slice(&SECP256K1_PUBKEY_AMINO_PREFIX);
    // Keys are 33 bytes, so the length always fits in a single-byte uvarint.
    out.push(u8::try_from(pubkey.len()).unwrap_or(u8::MAX));
    out.extend_from_slice(pubkey);
    out
}

fn encode(hrp: &str, data: &[u8]) -> Result<String, TxError> {
    let hrp = Hrp::parse(hrp).map_err(|e| TxError::encode(format!("bech32 prefix: {e}")))?;
    bech32::encode::<Bech32>(hrp, data).map_err(|e| TxError::encode(format!("bech32: {e}")))
}

// ============================================================================
// AccAddress
// ============================================================================

/// An account address, rendered with the `cosmos` prefix.
///
/// # Example
///
/// ```
/// use keyserver_core::address::AccAddress;
///
/// let addr: AccAddress = "cosmos1yv6alpum5r0nmnzkk4esp3cs5d58h8g95mvs50"
///     .parse()
///     .expect("valid address");
/// assert_eq!(addr.as_bytes().len(), 20);
/// assert_eq!(addr.to_string(), "cosmos1yv6alpum5r0nmnzkk4esp3cs5d58h8g95mvs50");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccAddress(Vec<u8>);

impl AccAddress {
    /// Wraps raw address bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw address bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for AccAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccAddress({self})")
    }
}

impl fmt::Display for AccAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = AddressVariant::Account
            .encode_address(&self.0)
            .map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

impl FromStr for AccAddress {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(TxError::invalid_address(s, "empty address string is not allowed"));
        }

        let (hrp, data) =
            bech32::decode(s).map_err(|e| TxError::invalid_address(s, e.to_string()))?;

        if hrp.as_str() != ACC_HRP {
            return Err(TxError::invalid_address(
                s,
                format!("expected prefix {ACC_HRP}, got {hrp}"),
            ));
        }

        if data.is_empty() {
            return Err(TxError::invalid_address(s, "empty address payload"));
        }

        Ok(Self(data))
    }
}

impl Serialize for AccAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rendered = AddressVariant::Account
            .encode_address(&self.0)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&rendered)
    }
}

impl<'de> Deserialize<'de> for AccAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
