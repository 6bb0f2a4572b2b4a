//! Transaction data model.
//!
//! These types mirror the amino JSON shapes clients exchange with the
//! gateway:
//!
//! - [`Coin`] / [`Coins`] - denominated amounts
//! - [`StdFee`] - fee amount plus gas limit
//! - [`Msg`] - a transaction message (`MsgSend`, or any other type carried opaquely)
//! - [`StdSignature`] - public key plus signature bytes
//! - [`StdTx`] - the full transaction, wrapped as `{"type":"auth/StdTx","value":{...}}`
//! - [`SignContext`], [`GasEstimate`], [`BroadcastResult`] - per-request values
//!
//! # Example
//!
//! ```
//! use keyserver_core::types::StdTx;
//!
//! let json = r#"{"type":"auth/StdTx","value":{"msg":[],"fee":{"amount":null,"gas":"200000"},"signatures":null,"memo":"hi"}}"#;
//! let tx = StdTx::from_json(json.as_bytes()).expect("valid tx");
//! assert_eq!(tx.fee.gas, 200_000);
//! assert!(tx.signatures.is_empty());
//! assert_eq!(tx.memo, "hi");
//! ```

use crate::address::{AccAddress, PUBKEY_LEN, SECP256K1_PUBKEY_AMINO_NAME};
use crate::error::TxError;
use crate::serde_util::{base64_bytes, null_as_default, u64_string};
use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Amino registered name of the standard transaction type.
pub const STD_TX_AMINO_NAME: &str = "auth/StdTx";

/// Amino registered name of the bank send message.
pub const MSG_SEND_AMINO_NAME: &str = "cosmos-sdk/MsgSend";

/// Parses a non-negative decimal integer with no sign, spaces or fraction.
#[must_use]
pub fn parse_u64(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

// ============================================================================
// Coins
// ============================================================================

/// A single denominated amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination, e.g. `stake`.
    pub denom: String,
    /// Non-negative integer amount.
    #[serde(with = "u256_decimal")]
    pub amount: U256,
}

impl Coin {
    /// Creates a coin.
    #[must_use]
    pub fn new(denom: impl Into<String>, amount: U256) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// An ordered list of coins.
///
/// [`Coins::parse`] produces a sorted set with unique denominations.
/// Coins decoded from JSON keep the order they arrived in, since that order
/// is part of what gets signed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(#[serde(deserialize_with = "null_as_default")] Vec<Coin>);

impl Coins {
    /// An empty coin set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Wraps a list of coins as given.
    #[must_use]
    pub const fn from_vec(coins: Vec<Coin>) -> Self {
        Self(coins)
    }

    /// Parses a comma-separated coin list such as `10stake,5uatom`.
    ///
    /// Each entry is a decimal amount followed by a denomination matching
    /// `[a-z][a-z0-9]{2,15}`. The result is sorted by denomination. An empty
    /// (or all-whitespace) string yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns a reason string when an entry is malformed or a denomination
    /// repeats.
    ///
    /// # Example
    ///
    /// ```
    /// use keyserver_core::types::Coins;
    ///
    /// let coins = Coins::parse("5uatom, 10stake").expect("valid coins");
    /// assert_eq!(coins.to_string(), "10stake,5uatom");
    /// assert!(Coins::parse("10stake,3stake").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Self::empty());
        }

        let mut coins = input
            .split(',')
            .map(parse_coin)
            .collect::<Result<Vec<_>, _>>()?;

        coins.sort_by(|a, b| a.denom.cmp(&b.denom));

        if let Some(pair) = coins.windows(2).find(|pair| pair[0].denom == pair[1].denom) {
            return Err(format!("duplicate denomination {}", pair[0].denom));
        }

        Ok(Self(coins))
    }

    /// Parses a coin list for a named request field.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::InvalidCoins`] naming the field and input.
    pub fn parse_field(field: &str, input: &str) -> Result<Self, TxError> {
        Self::parse(input).map_err(|reason| TxError::invalid_coins(field, input, reason))
    }

    /// Iterates over the coins.
    pub fn iter(&self) -> std::slice::Iter<'_, Coin> {
        self.0.iter()
    }

    /// Number of coins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no coins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, coin) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{coin}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Coins {
    type Item = &'a Coin;
    type IntoIter = std::slice::Iter<'a, Coin>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn parse_coin(entry: &str) -> Result<Coin, String> {
    let entry = entry.trim();
    let split = entry
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("invalid coin expression: {entry:?}"))?;
    let (digits, denom) = entry.split_at(split);
    let denom = denom.trim_start();

    if digits.is_empty() {
        return Err(format!("invalid coin expression: {entry:?}"));
    }

    if !is_valid_denom(denom) {
        return Err(format!("invalid denomination {denom:?}"));
    }

    let amount = U256::from_str_radix(digits, 10)
        .map_err(|e| format!("invalid amount {digits:?}: {e}"))?;

    Ok(Coin::new(denom, amount))
}

/// Whether `denom` matches `[a-z][a-z0-9]{2,15}`.
#[must_use]
pub fn is_valid_denom(denom: &str) -> bool {
    let bytes = denom.as_bytes();
    (3..=16).contains(&bytes.len())
        && bytes[0].is_ascii_lowercase()
        && bytes[1..]
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

mod u256_decimal {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(serde::de::Error::custom(format!("invalid amount {s:?}")));
        }
        U256::from_str_radix(&s, 10).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Fee
// ============================================================================

/// Transaction fee: the amount paid and the gas limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    /// Fee amount.
    #[serde(default)]
    pub amount: Coins,
    /// Gas limit.
    #[serde(with = "u64_string", default)]
    pub gas: u64,
}

impl StdFee {
    /// Creates a fee.
    #[must_use]
    pub const fn new(gas: u64, amount: Coins) -> Self {
        Self { amount, gas }
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Bank transfer between two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSend {
    /// Sender.
    pub from_address: AccAddress,
    /// Receiver.
    pub to_address: AccAddress,
    /// Amount transferred.
    #[serde(default)]
    pub amount: Coins,
}

/// A transaction message.
///
/// `MsgSend` is fully modelled; every other message type is carried as its
/// raw JSON value so it can still be signed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawMsg")]
pub enum Msg {
    /// `cosmos-sdk/MsgSend`.
    Send(MsgSend),
    /// Any other registered message type.
    Other {
        /// Amino type name.
        kind: String,
        /// Message body.
        value: serde_json::Value,
    },
}

impl Msg {
    /// Amino type name of the message.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Send(_) => MSG_SEND_AMINO_NAME,
            Self::Other { kind, .. } => kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawMsg {
    #[serde(rename = "type")]
    kind: String,
    value: serde_json::Value,
}

impl TryFrom<RawMsg> for Msg {
    type Error = String;

    fn try_from(raw: RawMsg) -> Result<Self, Self::Error> {
        if raw.kind == MSG_SEND_AMINO_NAME {
            let send = serde_json::from_value(raw.value).map_err(|e| e.to_string())?;
            Ok(Self::Send(send))
        } else {
            Ok(Self::Other {
                kind: raw.kind,
                value: raw.value,
            })
        }
    }
}

impl TryFrom<&Msg> for RawMsg {
    type Error = TxError;

    fn try_from(msg: &Msg) -> Result<Self, Self::Error> {
        match msg {
            Msg::Send(send) => Ok(Self {
                kind: MSG_SEND_AMINO_NAME.to_string(),
                value: serde_json::to_value(send)
                    .map_err(|e| TxError::encode(format!("MsgSend: {e}")))?,
            }),
            Msg::Other { kind, value } => Ok(Self {
                kind: kind.clone(),
                value: value.clone(),
            }),
        }
    }
}

impl Serialize for Msg {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawMsg::try_from(self)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

// ============================================================================
// Signatures
// ============================================================================

/// A compressed secp256k1 public key.
#[derive(Clone, PartialEq, Eq)]
pub struct PubKey([u8; PUBKEY_LEN]);

impl PubKey {
    /// Wraps 33 compressed public-key bytes.
    #[must_use]
    pub const fn new(bytes: [u8; PUBKEY_LEN]) -> Self {
        Self(bytes)
    }

    /// The compressed key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PUBKEY_LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for PubKey {
    type Error = TxError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; PUBKEY_LEN] = bytes.try_into().map_err(|_| {
            TxError::invalid_json(format!(
                "public key must be {PUBKEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKey(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

#[derive(Serialize, Deserialize)]
struct RawPubKey {
    #[serde(rename = "type")]
    kind: String,
    #[serde(with = "base64_bytes")]
    value: Vec<u8>,
}

impl Serialize for PubKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawPubKey {
            kind: SECP256K1_PUBKEY_AMINO_NAME.to_string(),
            value: self.0.to_vec(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PubKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawPubKey::deserialize(deserializer)?;
        if raw.kind != SECP256K1_PUBKEY_AMINO_NAME {
            return Err(serde::de::Error::custom(format!(
                "unsupported public key type {:?}",
                raw.kind
            )));
        }
        Self::try_from(raw.value.as_slice()).map_err(serde::de::Error::custom)
    }
}

/// One signature on a transaction.
///
/// The default value (no key, no bytes) is the placeholder used when a
/// transaction is simulated before it has been signed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    /// Signer public key.
    #[serde(default)]
    pub pub_key: Option<PubKey>,
    /// Signature bytes (`r || s`).
    #[serde(with = "base64_bytes", default)]
    pub signature: Vec<u8>,
}

impl StdSignature {
    /// Creates a signature entry.
    #[must_use]
    pub const fn new(pub_key: PubKey, signature: Vec<u8>) -> Self {
        Self {
            pub_key: Some(pub_key),
            signature,
        }
    }
}

// ============================================================================
// StdTx
// ============================================================================

/// A standard transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StdTx {
    /// Messages, in order.
    pub msgs: Vec<Msg>,
    /// Fee and gas limit.
    pub fee: StdFee,
    /// Signatures, in order.
    pub signatures: Vec<StdSignature>,
    /// Free-form memo.
    pub memo: String,
}

#[derive(Serialize, Deserialize)]
struct StdTxValue {
    #[serde(rename = "msg", default, deserialize_with = "null_as_default")]
    msgs: Vec<Msg>,
    #[serde(default)]
    fee: StdFee,
    #[serde(default, deserialize_with = "null_as_default")]
    signatures: Vec<StdSignature>,
    #[serde(default, deserialize_with = "null_as_default")]
    memo: String,
}

#[derive(Serialize)]
struct StdTxEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a StdTxValue,
}

impl StdTx {
    /// Creates a transaction.
    #[must_use]
    pub fn new(
        msgs: Vec<Msg>,
        fee: StdFee,
        signatures: Vec<StdSignature>,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            msgs,
            fee,
            signatures,
            memo: memo.into(),
        }
    }

    /// Decodes a transaction from amino JSON bytes.
    ///
    /// Both the wrapped form (`{"type":"auth/StdTx","value":{...}}`) and the
    /// bare value object are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::InvalidJson`] on malformed JSON, a wrong type tag
    /// or invalid field contents.
    pub fn from_json(bytes: &[u8]) -> Result<Self, TxError> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    /// Decodes a transaction from an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// See [`StdTx::from_json`].
    pub fn from_value(value: serde_json::Value) -> Result<Self, TxError> {
        let inner = match value {
            serde_json::Value::Object(mut object) if object.contains_key("type") => {
                let kind = object.remove("type").unwrap_or_default();
                if kind.as_str() != Some(STD_TX_AMINO_NAME) {
                    return Err(TxError::invalid_json(format!(
                        "expected transaction type {STD_TX_AMINO_NAME}, got {kind}"
                    )));
                }
                object
                    .remove("value")
                    .ok_or_else(|| TxError::invalid_json("missing transaction value"))?
            }
            other => other,
        };

        let value: StdTxValue = serde_json::from_value(inner)?;
        Ok(Self {
            msgs: value.msgs,
            fee: value.fee,
            signatures: value.signatures,
            memo: value.memo,
        })
    }

    /// Encodes the transaction as wrapped amino JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::Encode`] if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, TxError> {
        serde_json::to_vec(self).map_err(|e| TxError::encode(e.to_string()))
    }

    /// Returns a copy with a replacement fee and no signatures.
    #[must_use]
    pub fn with_fee_unsigned(&self, fee: StdFee) -> Self {
        Self {
            msgs: self.msgs.clone(),
            fee,
            signatures: Vec::new(),
            memo: self.memo.clone(),
        }
    }

    fn to_value(&self) -> StdTxValue {
        StdTxValue {
            msgs: self.msgs.clone(),
            fee: self.fee.clone(),
            signatures: self.signatures.clone(),
            memo: self.memo.clone(),
        }
    }
}

impl Serialize for StdTx {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StdTxEnvelope {
            kind: STD_TX_AMINO_NAME,
            value: &self.to_value(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StdTx {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Per-request values
// ============================================================================

/// Chain and account context a signature commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignContext {
    /// Chain identifier.
    pub chain_id: String,
    /// Account number of the signer.
    pub account_number: u64,
    /// Account sequence of the signer.
    pub sequence: u64,
}

impl SignContext {
    /// Builds a context from the decimal strings clients send.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::InvalidNumber`] if either number is not a
    /// non-negative decimal integer that fits in 64 bits.
    pub fn parse(
        chain_id: impl Into<String>,
        account_number: &str,
        sequence: &str,
    ) -> Result<Self, TxError> {
        let account_number = parse_u64(account_number)
            .ok_or_else(|| TxError::invalid_number("account_number", account_number))?;
        let sequence =
            parse_u64(sequence).ok_or_else(|| TxError::invalid_number("sequence", sequence))?;

        Ok(Self {
            chain_id: chain_id.into(),
            account_number,
            sequence,
        })
    }
}

/// Result of one simulation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEstimate {
    /// Gas the simulated execution consumed.
    pub gas_used: u64,
}

/// The ledger node's acknowledgement of an asynchronous broadcast.
///
/// Serializes as `{"height":"0","txhash":"...","code":N,"data":"...","raw_log":"..."}`
/// with `code`, `data` and `raw_log` omitted when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResult {
    /// Inclusion height; always zero for asynchronous broadcast.
    #[serde(with = "u64_string", default)]
    pub height: u64,
    /// Upper-case hex transaction hash.
    #[serde(rename = "txhash")]
    pub tx_hash: String,
    /// `CheckTx` result code; zero means accepted.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub code: u32,
    /// Response data.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    /// The node's log.
    #[serde(rename = "raw_log", default, skip_serializing_if = "String::is_empty")]
    pub log: String,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(code: &u32) -> bool {
    *code == 0
}
