use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use data_encoding::BASE64URL_NOPAD;
use hmac::{digest::Output, Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

pub type HmacSha256 = Hmac<Sha256>;

/// Number of random bytes in a credential token.
pub const TOKEN_BYTES: usize = 32;

/// The secret a voter presents to prove their eligibility.
/// Only ever stored as an HMAC digest; the plaintext goes to the voter.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialToken([u8; TOKEN_BYTES]);

impl CredentialToken {
    /// Generate a fresh token from the thread-local CSPRNG.
    pub fn random() -> Self {
        let mut bytes = [0; TOKEN_BYTES];
        rand::thread_rng().fill(&mut bytes);
        Self(bytes)
    }

    /// Keyed digest of this token, for storage.
    pub fn digest(&self, key: &[u8]) -> Output<HmacSha256> {
        self.mac(key).finalize().into_bytes()
    }

    /// Constant-time comparison against a stored digest.
    pub fn matches(&self, key: &[u8], digest: &[u8]) -> bool {
        self.mac(key).verify_slice(digest).is_ok()
    }

    fn mac(&self, key: &[u8]) -> HmacSha256 {
        let mut hmac =
            HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
        hmac.update(&self.0);
        hmac
    }
}

impl Display for CredentialToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", BASE64URL_NOPAD.encode(&self.0))
    }
}

/// Never print the secret in logs.
impl Debug for CredentialToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CredentialToken(..)")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("token is not valid base64url")]
    Encoding,
    #[error("token must decode to exactly {TOKEN_BYTES} bytes, found {0}")]
    InvalidLength(usize),
}

impl FromStr for CredentialToken {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = BASE64URL_NOPAD
            .decode(s.trim().as_bytes())
            .map_err(|_| ParseError::Encoding)?;
        let bytes: [u8; TOKEN_BYTES] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| ParseError::InvalidLength(b.len()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for CredentialToken {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CredentialToken> for String {
    fn from(token: CredentialToken) -> Self {
        token.to_string()
    }
}
