//! Serde adapters for the amino JSON conventions.
//!
//! Amino JSON renders 64-bit integers as decimal strings and byte slices as
//! standard base64, and writes nil slices as `null`. These adapters accept
//! both the canonical and the lenient forms on input and always emit the
//! canonical form.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serializer};
use std::fmt;

/// `u64` carried as a decimal string. Bare JSON numbers are accepted on input.
pub mod u64_string {
    use super::{de, fmt, Deserializer, Serializer, Visitor};

    /// Serialize a `u64` as a decimal string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    /// Deserialize a `u64` from a decimal string or a non-negative number.
    ///
    /// # Errors
    ///
    /// Fails on negative numbers, fractions and non-decimal strings.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        deserializer.deserialize_any(U64Visitor)
    }

    struct U64Visitor;

    impl Visitor<'_> for U64Visitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(|_| E::custom(format!("negative integer {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            crate::types::parse_u64(v).ok_or_else(|| E::custom(format!("invalid integer {v:?}")))
        }
    }
}

/// Byte slices carried as standard base64; `null` decodes to an empty vector.
pub mod base64_bytes {
    use super::{Deserialize, Deserializer, Serializer};
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    /// Serialize bytes as standard base64.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    /// Deserialize standard base64 or `null`.
    ///
    /// # Errors
    ///
    /// Fails if the string is not valid base64.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        match encoded {
            None => Ok(Vec::new()),
            Some(s) => STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom),
        }
    }
}

/// Deserialize `null` as the type's default value.
///
/// # Errors
///
/// Propagates the inner type's deserialization errors.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Fields {
        #[serde(with = "super::u64_string")]
        gas: u64,
        #[serde(with = "super::base64_bytes")]
        sig: Vec<u8>,
        #[serde(default, deserialize_with = "super::null_as_default")]
        list: Vec<u32>,
    }

    #[test]
    fn test_canonical_output() {
        let fields = Fields {
            gas: 200_000,
            sig: vec![1, 2, 3],
            list: vec![],
        };
        assert_eq!(
            serde_json::to_string(&fields).unwrap(),
            r#"{"gas":"200000","sig":"AQID","list":[]}"#
        );
    }

    #[test]
    fn test_lenient_input() {
        let fields: Fields = serde_json::from_str(r#"{"gas":42,"sig":null,"list":null}"#).unwrap();
        assert_eq!(fields.gas, 42);
        assert!(fields.sig.is_empty());
        assert!(fields.list.is_empty());

        let fields: Fields = serde_json::from_str(r#"{"gas":"42","sig":"AQID"}"#).unwrap();
        assert_eq!(fields.sig, vec![1, 2, 3]);
    }

    #[test]
    fn test_rejects_bad_integers() {
        assert!(serde_json::from_str::<Fields>(r#"{"gas":"-1","sig":null}"#).is_err());
        assert!(serde_json::from_str::<Fields>(r#"{"gas":-1,"sig":null}"#).is_err());
        assert!(serde_json::from_str::<Fields>(r#"{"gas":"1.5","sig":null}"#).is_err());
        assert!(serde_json::from_str::<Fields>(r#"{"gas":1.5,"sig":null}"#).is_err());
        assert!(serde_json::from_str::<Fields>(r#"{"gas":"","sig":null}"#).is_err());
    }
}
