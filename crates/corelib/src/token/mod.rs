//! Ring tokens.
//!
//! A token is an arbitrary-precision integer naming one position on a
//! modular ring. The legacy ring is 127 bits wide, so no fixed-width integer
//! type is used for token arithmetic.

pub mod space;

pub use space::TokenSpace;

use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// A position on the ring. Immutable once assigned.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Token(BigInt);

impl Token {
    pub fn new(value: impl Into<BigInt>) -> Self {
        Token(value.into())
    }

    /// Returns the underlying integer.
    pub fn value(&self) -> &BigInt {
        &self.0
    }

    pub fn into_inner(self) -> BigInt {
        self.0
    }
}

impl From<BigInt> for Token {
    fn from(value: BigInt) -> Self {
        Token(value)
    }
}

impl From<i64> for Token {
    fn from(value: i64) -> Self {
        Token(BigInt::from(value))
    }
}

impl From<u64> for Token {
    fn from(value: u64) -> Self {
        Token(BigInt::from(value))
    }
}

impl From<i128> for Token {
    fn from(value: i128) -> Self {
        Token(BigInt::from(value))
    }
}

impl From<u128> for Token {
    fn from(value: u128) -> Self {
        Token(BigInt::from(value))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Token {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_decimal(s).map(Token)
    }
}

fn parse_decimal(s: &str) -> Result<BigInt> {
    BigInt::from_str(s.trim()).map_err(|e| Error::InvalidToken(format!("{:?}: {}", s, e)))
}

// Tokens travel as decimal strings so 127-bit values survive JSON.
impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor).map(Token)
    }
}

struct DecimalVisitor;

impl<'de> Visitor<'de> for DecimalVisitor {
    type Value = BigInt;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer or a decimal integer string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<BigInt, E> {
        parse_decimal(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<BigInt, E> {
        Ok(BigInt::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<BigInt, E> {
        Ok(BigInt::from(v))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> std::result::Result<BigInt, E> {
        Ok(BigInt::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> std::result::Result<BigInt, E> {
        Ok(BigInt::from(v))
    }
}

/// `#[serde(with = "corelib::token::decimal")]` helpers for plain `BigInt`
/// fields, using the same decimal encoding as [`Token`].
pub mod decimal {
    use num_bigint::BigInt;
    use serde::{Deserializer, Serializer};

    use super::DecimalVisitor;

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<BigInt, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }

    /// Same encoding for `Option<BigInt>`.
    pub mod option {
        use num_bigint::BigInt;
        use serde::{Deserialize, Deserializer, Serializer};

        use crate::token::Token;

        pub fn serialize<S: Serializer>(
            value: &Option<BigInt>,
            serializer: S,
        ) -> std::result::Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.collect_str(v),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> std::result::Result<Option<BigInt>, D::Error> {
            Option::<Token>::deserialize(deserializer).map(|t| t.map(Token::into_inner))
        }
    }
}
