//! SHA-256 content identifiers, truncated to a configured number of hex digits

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::{Result, SnapError};

/// Number of hex digits in a full SHA-256 digest
pub const MAX_DIGITS: usize = 64;

/// Lowercase hex identifier of a stored object
///
/// Truncating below 64 digits trades key length for collision resistance.
/// Two different byte sequences may share an identifier when the configured
/// length is small; that risk is accepted through configuration.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ContentId(String);

impl ContentId {
    /// Parse an identifier, accepting 1-64 lowercase hex digits
    pub fn parse(s: &str) -> Result<Self> {
        let valid = !s.is_empty()
            && s.len() <= MAX_DIGITS
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !valid {
            return Err(SnapError::InvalidIdentifier(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of hex digits in this identifier
    pub fn digits(&self) -> usize {
        self.0.len()
    }

    /// Recompute the identifier of `data` at this identifier's length.
    ///
    /// Returns the recomputed identifier when it differs.
    pub fn verify(&self, data: &[u8]) -> std::result::Result<(), ContentId> {
        let actual = hex_digest(data, self.digits());
        if actual == self.0 {
            Ok(())
        } else {
            Err(ContentId(actual))
        }
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentId {
    type Err = SnapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validated identifier length in hex digits (1..=64)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashLength(usize);

impl HashLength {
    /// Full-length identifiers
    pub const FULL: HashLength = HashLength(MAX_DIGITS);

    /// Length covering `bits` bits of the digest, rounded up to a whole hex digit
    pub fn from_bits(bits: u32) -> Result<Self> {
        if bits == 0 || bits > 256 {
            return Err(SnapError::Configuration(format!(
                "hash length must be between 1 and 256 bits, got {}",
                bits
            )));
        }
        Ok(Self(bits.div_ceil(4) as usize))
    }

    pub fn from_digits(digits: usize) -> Result<Self> {
        if digits == 0 || digits > MAX_DIGITS {
            return Err(SnapError::Configuration(format!(
                "hash length must be between 1 and {} hex digits, got {}",
                MAX_DIGITS, digits
            )));
        }
        Ok(Self(digits))
    }

    pub fn digits(&self) -> usize {
        self.0
    }
}

impl Default for HashLength {
    /// 80 bits
    fn default() -> Self {
        Self(20)
    }
}

/// Derive the identifier of `data`
pub fn identifier_of(data: &[u8], length: HashLength) -> ContentId {
    ContentId(hex_digest(data, length.digits()))
}

fn hex_digest(data: &[u8], digits: usize) -> String {
    let mut hex = hex::encode(Sha256::digest(data));
    hex.truncate(digits);
    hex
}
