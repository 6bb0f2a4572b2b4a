//! Amino binary wire codec.
//!
//! Ledger nodes accept transactions in amino binary form. Only the subset
//! needed for `auth/StdTx` carrying `cosmos-sdk/MsgSend` is implemented,
//! plus the decoder for the gas figure in a simulation result.
//!
//! # Encoding Rules
//!
//! - Every field starts with a key `(field_number << 3) | wire_type`
//! - Integers use wire type 0 (unsigned varint)
//! - Strings, bytes and embedded structs use wire type 2 (varint length, then payload)
//! - Fields holding their default value (`0`, `""`, empty bytes) are omitted
//! - Registered concrete types are preceded by a 4-byte prefix derived from
//!   SHA-256 of the registered name
//!
//! # Example
//!
//! ```
//! use keyserver_chain::amino::{amino_prefix, MSG_SEND_PREFIX, STD_TX_PREFIX};
//!
//! assert_eq!(amino_prefix("auth/StdTx"), STD_TX_PREFIX);
//! assert_eq!(amino_prefix("cosmos-sdk/MsgSend"), MSG_SEND_PREFIX);
//! ```

use keyserver_core::address::SECP256K1_PUBKEY_AMINO_PREFIX;
use keyserver_core::error::TxError;
use keyserver_core::types::{Coin, Coins, Msg, MsgSend, StdFee, StdSignature, StdTx};
use sha2::{Digest, Sha256};

/// Result type for amino operations.
pub type AminoResult<T> = Result<T, TxError>;

/// Prefix of `auth/StdTx`.
pub const STD_TX_PREFIX: [u8; 4] = [0xf0, 0x62, 0x5d, 0xee];

/// Prefix of `cosmos-sdk/MsgSend`.
pub const MSG_SEND_PREFIX: [u8; 4] = [0xa8, 0xa3, 0x61, 0x9a];

/// Prefix of `tendermint/PubKeySecp256k1`.
pub const PUBKEY_SECP256K1_PREFIX: [u8; 4] = SECP256K1_PUBKEY_AMINO_PREFIX;

/// Field number of `gas_used` in a simulation result.
pub const RESULT_GAS_USED_FIELD: u64 = 6;

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_BYTES: u8 = 2;
const WIRE_FIXED32: u8 = 5;

// ============================================================================
// Prefixes
// ============================================================================

/// Derives the 4-byte prefix of a registered type name.
///
/// The SHA-256 digest is stripped of leading zero bytes, the next three
/// bytes are skipped, and after stripping zeros again the following four
/// bytes form the prefix.
#[must_use]
pub fn amino_prefix(name: &str) -> [u8; 4] {
    let digest = Sha256::digest(name.as_bytes());
    let rest = skip_zeros(&digest);
    let rest = skip_zeros(rest.get(3..).unwrap_or_default());

    let mut prefix = [0u8; 4];
    for (slot, byte) in prefix.iter_mut().zip(rest) {
        *slot = *byte;
    }
    prefix
}

fn skip_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes.get(start..).unwrap_or_default()
}

// ============================================================================
// Encoding
// ============================================================================

/// Appends `value` as an unsigned LEB128 varint.
pub fn put_uvarint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        // Low seven bits with the continuation flag.
        #[allow(clippy::cast_possible_truncation)]
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    #[allow(clippy::cast_possible_truncation)]
    buf.push(value as u8);
}

fn put_key(buf: &mut Vec<u8>, field: u64, wire_type: u8) {
    put_uvarint(buf, (field << 3) | u64::from(wire_type));
}

fn put_varint_field(buf: &mut Vec<u8>, field: u64, value: u64) {
    if value != 0 {
        put_key(buf, field, WIRE_VARINT);
        put_uvarint(buf, value);
    }
}

fn put_bytes_field(buf: &mut Vec<u8>, field: u64, bytes: &[u8]) {
    if !bytes.is_empty() {
        put_element(buf, field, bytes);
    }
}

/// Writes a length-delimited field even when `bytes` is empty.
fn put_element(buf: &mut Vec<u8>, field: u64, bytes: &[u8]) {
    put_key(buf, field, WIRE_BYTES);
    put_uvarint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_coin(coin: &Coin) -> Vec<u8> {
    let mut buf = Vec::new();
    put_bytes_field(&mut buf, 1, coin.denom.as_bytes());
    put_bytes_field(&mut buf, 2, coin.amount.to_string().as_bytes());
    buf
}

fn put_coins_field(buf: &mut Vec<u8>, field: u64, coins: &Coins) {
    for coin in coins {
        put_element(buf, field, &encode_coin(coin));
    }
}

fn encode_msg_send(msg: &MsgSend) -> Vec<u8> {
    let mut buf = Vec::new();
    put_bytes_field(&mut buf, 1, msg.from_address.as_bytes());
    put_bytes_field(&mut buf, 2, msg.to_address.as_bytes());
    put_coins_field(&mut buf, 3, &msg.amount);
    buf
}

fn encode_msg(msg: &Msg) -> AminoResult<Vec<u8>> {
    match msg {
        Msg::Send(send) => {
            let mut buf = MSG_SEND_PREFIX.to_vec();
            buf.extend_from_slice(&encode_msg_send(send));
            Ok(buf)
        }
        Msg::Other { kind, .. } => Err(TxError::unsupported_msg(kind.clone())),
    }
}

fn encode_fee(fee: &StdFee) -> Vec<u8> {
    let mut buf = Vec::new();
    put_coins_field(&mut buf, 1, &fee.amount);
    put_varint_field(&mut buf, 2, fee.gas);
    buf
}

fn encode_signature(signature: &StdSignature) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(pub_key) = &signature.pub_key {
        let mut key = PUBKEY_SECP256K1_PREFIX.to_vec();
        put_uvarint(&mut key, pub_key.as_bytes().len() as u64);
        key.extend_from_slice(pub_key.as_bytes());
        put_element(&mut buf, 1, &key);
    }
    put_bytes_field(&mut buf, 2, &signature.signature);
    buf
}

/// Encodes the body of a transaction, without prefix or length.
///
/// # Errors
///
/// Returns [`TxError::UnsupportedMsg`] if a message has no binary encoding.
pub fn encode_std_tx_body(tx: &StdTx) -> AminoResult<Vec<u8>> {
    let mut buf = Vec::new();
    for msg in &tx.msgs {
        put_element(&mut buf, 1, &encode_msg(msg)?);
    }
    put_element(&mut buf, 2, &encode_fee(&tx.fee));
    for signature in &tx.signatures {
        put_element(&mut buf, 3, &encode_signature(signature));
    }
    put_bytes_field(&mut buf, 4, tx.memo.as_bytes());
    Ok(buf)
}

/// Encodes a transaction the way nodes expect it on the wire:
/// `uvarint(len) || prefix || body`.
///
/// # Errors
///
/// Returns [`TxError::UnsupportedMsg`] if a message has no binary encoding.
pub fn encode_std_tx(tx: &StdTx) -> AminoResult<Vec<u8>> {
    let body = encode_std_tx_body(tx)?;

    let mut buf = Vec::with_capacity(body.len() + STD_TX_PREFIX.len() + 4);
    put_uvarint(&mut buf, (body.len() + STD_TX_PREFIX.len()) as u64);
    buf.extend_from_slice(&STD_TX_PREFIX);
    buf.extend_from_slice(&body);
    Ok(buf)
}

// ============================================================================
// Decoding
// ============================================================================

/// A cursor over amino-encoded bytes.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    /// Starts reading at the beginning of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Whether all bytes have been consumed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reads an unsigned varint.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::Decode`] on truncation or overflow.
    pub fn read_uvarint(&mut self) -> AminoResult<u64> {
        let mut value: u64 = 0;
        for (i, &byte) in self.data.iter().enumerate().take(10) {
            let bits = u64::from(byte & 0x7f);
            if i == 9 && byte > 1 {
                return Err(TxError::decode("varint overflows 64 bits"));
            }
            value |= bits << (7 * i);
            if byte & 0x80 == 0 {
                self.data = self.data.get(i + 1..).unwrap_or_default();
                return Ok(value);
            }
        }
        Err(TxError::decode("truncated varint"))
    }

    /// Reads `len` raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::Decode`] if fewer bytes remain.
    pub fn read_exact(&mut self, len: usize) -> AminoResult<&'a [u8]> {
        if len > self.data.len() {
            return Err(TxError::decode(format!(
                "need {len} bytes, {} remain",
                self.data.len()
            )));
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }

    /// Reads a varint length followed by that many bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::Decode`] on truncation.
    pub fn read_length_prefixed(&mut self) -> AminoResult<&'a [u8]> {
        let len = self.read_uvarint()?;
        let len = usize::try_from(len).map_err(|_| TxError::decode("length overflows usize"))?;
        self.read_exact(len)
    }

    /// Reads a field key, returning `(field_number, wire_type)`.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::Decode`] on truncation.
    pub fn read_key(&mut self) -> AminoResult<(u64, u8)> {
        let key = self.read_uvarint()?;
        #[allow(clippy::cast_possible_truncation)]
        let wire_type = (key & 0x07) as u8;
        Ok((key >> 3, wire_type))
    }

    /// Skips over the value of a field with the given wire type.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::Decode`] on truncation or an unknown wire type.
    pub fn skip(&mut self, wire_type: u8) -> AminoResult<()> {
        match wire_type {
            WIRE_VARINT => self.read_uvarint().map(|_| ()),
            WIRE_FIXED64 => self.read_exact(8).map(|_| ()),
            WIRE_BYTES => self.read_length_prefixed().map(|_| ()),
            WIRE_FIXED32 => self.read_exact(4).map(|_| ()),
            other => Err(TxError::decode(format!("unsupported wire type {other}"))),
        }
    }
}

/// Extracts `gas_used` from a length-prefixed simulation result.
///
/// Fields other than `gas_used` are skipped. A result without the field
/// used zero gas.
///
/// # Errors
///
/// Returns [`TxError::Decode`] if the bytes are truncated or malformed.
///
/// # Example
///
/// ```
/// use keyserver_chain::amino::decode_gas_used;
///
/// // len=3, key (6 << 3 | 0) = 0x30, varint 150 = 0x96 0x01
/// assert_eq!(decode_gas_used(&[0x03, 0x30, 0x96, 0x01]).unwrap(), 150);
/// ```
pub fn decode_gas_used(value: &[u8]) -> AminoResult<u64> {
    let mut outer = Reader::new(value);
    let body = outer.read_length_prefixed()?;
    if !outer.is_empty() {
        return Err(TxError::decode("trailing bytes after simulation result"));
    }

    let mut reader = Reader::new(body);
    let mut gas_used = 0;
    while !reader.is_empty() {
        let (field, wire_type) = reader.read_key()?;
        if field == RESULT_GAS_USED_FIELD && wire_type == WIRE_VARINT {
            gas_used = reader.read_uvarint()?;
        } else {
            reader.skip(wire_type)?;
        }
    }
    Ok(gas_used)
}

// ============================================================================
// Tests
// ============================================================================
