//! Sign documents: the canonical bytes a transaction signature commits to.
//!
//! A sign document combines the transaction's messages, fee and memo with the
//! caller's chain id, account number and sequence:
//!
//! ```text
//! {"account_number":"7","chain_id":"test-chain","fee":{"amount":[],"gas":"20000"},
//!  "memo":"","msgs":[...],"sequence":"3"}
//! ```
//!
//! The document is serialized as compact JSON with object keys sorted at
//! every level, so documents that differ only in source key order produce
//! identical bytes. Strings are escaped the way ledger nodes escape them when
//! they rebuild the document to verify a signature: `<`, `>` and `&` as
//! `\u003c`, `\u003e` and `\u0026`, and U+2028/U+2029 as `\u2028`/`\u2029`.
//!
//! The fee gas is taken from the transaction as given; it is never
//! recomputed here.

use std::fmt::Write as _;

use keyserver_core::error::TxError;
use keyserver_core::types::{SignContext, StdTx};
use serde_json::{json, Value};

/// Result type for sign document operations.
pub type SignDocResult<T> = Result<T, TxError>;

/// Canonical sign bytes for one transaction and signing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignDocument {
    bytes: Vec<u8>,
}

impl SignDocument {
    /// Builds the sign document for an already-parsed transaction.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::Encode`] if a message cannot be converted to JSON.
    pub fn new(tx: &StdTx, context: &SignContext) -> SignDocResult<Self> {
        let msgs = tx
            .msgs
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TxError::encode(format!("message: {e}")))?;
        let fee =
            serde_json::to_value(&tx.fee).map_err(|e| TxError::encode(format!("fee: {e}")))?;

        let document = json!({
            "account_number": context.account_number.to_string(),
            "chain_id": context.chain_id,
            "fee": fee,
            "memo": tx.memo,
            "msgs": msgs,
            "sequence": context.sequence.to_string(),
        });

        Ok(Self {
            bytes: canonical_json(&document),
        })
    }

    /// Parses an unsigned transaction and builds its sign document.
    ///
    /// Returns the document together with the parsed transaction so the
    /// caller can attach the resulting signature.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::InvalidJson`] if the transaction does not parse.
    ///
    /// # Example
    ///
    /// ```
    /// use keyserver_chain::sign_doc::SignDocument;
    /// use keyserver_core::types::SignContext;
    ///
    /// let tx = br#"{"type":"auth/StdTx","value":{"msg":[],"fee":{"amount":null,"gas":"200000"},"signatures":null,"memo":""}}"#;
    /// let context = SignContext::parse("test-chain", "0", "1").expect("valid numbers");
    ///
    /// let (document, _) = SignDocument::build(tx, &context).expect("valid tx");
    /// assert_eq!(
    ///     document.as_bytes(),
    ///     br#"{"account_number":"0","chain_id":"test-chain","fee":{"amount":[],"gas":"200000"},"memo":"","msgs":[],"sequence":"1"}"#
    /// );
    /// ```
    pub fn build(tx_json: &[u8], context: &SignContext) -> SignDocResult<(Self, StdTx)> {
        let tx = StdTx::from_json(tx_json)?;
        let document = Self::new(&tx, context)?;
        Ok((document, tx))
    }

    /// The bytes to sign.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the document, returning the bytes to sign.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Serializes a JSON value compactly with sorted object keys.
#[must_use]
pub fn canonical_json(value: &Value) -> Vec<u8> {
    let mut out = String::new();
    write_value(&mut out, value);
    out.into_bytes()
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '<' | '>' | '&' | '\u{2028}' | '\u{2029}' => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c if u32::from(c) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
