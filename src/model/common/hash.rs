use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::str::FromStr;

use data_encoding::HEXLOWER_PERMISSIVE;
use rocket::request::FromParam;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LENGTH: usize = 32;

/// The `previous_hash` of the first record in every ledger.
pub const GENESIS_HASH: ChainHash = ChainHash([0; LENGTH]);

/// A SHA-256 digest linking ledger records together.
/// Serialised as a lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainHash(#[serde(with = "serialize_hash")] [u8; LENGTH]);

impl ChainHash {
    pub fn from_bytes(bytes: [u8; LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn is_genesis(&self) -> bool {
        *self == GENESIS_HASH
    }
}

impl Deref for ChainHash {
    type Target = [u8; LENGTH];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ChainHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", data_encoding::HEXLOWER.encode(&self.0))
    }
}

impl Debug for ChainHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChainHash({self})")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("hash must be exactly {} hex characters, found {0}", LENGTH * 2)]
    InvalidLength(usize),
    #[error("hash must contain only hex characters")]
    InvalidChar,
}

impl FromStr for ChainHash {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != LENGTH * 2 {
            return Err(ParseError::InvalidLength(s.len()));
        }
        let bytes = HEXLOWER_PERMISSIVE
            .decode(s.as_bytes())
            .map_err(|_| ParseError::InvalidChar)?;
        let bytes: [u8; LENGTH] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| ParseError::InvalidLength(b.len() * 2))?;
        Ok(Self(bytes))
    }
}

impl<'a> FromParam<'a> for ChainHash {
    type Error = ParseError;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse()
    }
}

/// (De)serialisation for hashes as hex strings.
mod serialize_hash {
    use serde::{
        de::{Error, Visitor},
        Deserializer, Serializer,
    };

    use super::{ChainHash, LENGTH};

    pub fn serialize<S>(hash: &[u8; LENGTH], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&data_encoding::HEXLOWER.encode(hash))
    }

    struct StrVisitor;

    impl<'de> Visitor<'de> for StrVisitor {
        type Value = [u8; LENGTH];

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(formatter, "a string of {} hex digits", LENGTH * 2)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            v.parse::<ChainHash>().map(|hash| hash.0).map_err(E::custom)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; LENGTH], D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(StrVisitor)
    }
}
