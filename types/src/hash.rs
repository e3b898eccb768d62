//! Content digests.
//!
//! The digest algorithm is not chosen here. Hashing is a capability supplied by
//! the caller; this module only carries and formats the 32-byte result.

use std::fmt;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A 32-byte content digest, serialized as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash([u8; ContentHash::LEN]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentHashError {
    #[error("content hash must be {expected} hex characters (got {actual})")]
    InvalidLength { expected: usize, actual: usize },
    #[error("content hash contains a non-hex character at byte {position}")]
    InvalidHex { position: usize },
}

impl ContentHash {
    pub const LEN: usize = 32;

    #[must_use]
    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(Self::LEN * 2);
        for byte in self.0 {
            let _ = write!(out, "{byte:02x}");
        }
        out
    }

    /// First 12 hex characters, for log lines.
    #[must_use]
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }

    pub fn from_hex(raw: &str) -> Result<Self, ContentHashError> {
        if raw.len() != Self::LEN * 2 {
            return Err(ContentHashError::InvalidLength {
                expected: Self::LEN * 2,
                actual: raw.len(),
            });
        }
        if let Some(position) = raw.bytes().position(|b| !b.is_ascii_hexdigit()) {
            return Err(ContentHashError::InvalidHex { position });
        }

        let mut bytes = [0u8; Self::LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &raw[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_err| ContentHashError::InvalidHex { position: i * 2 })?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for ContentHash {
    type Error = ContentHashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<ContentHash> for String {
    fn from(value: ContentHash) -> Self {
        value.to_hex()
    }
}
