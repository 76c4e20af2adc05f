//! Shared types for skiff.
//!
//! This crate defines the two types every other skiff crate speaks in:
//!
//! - [`Key`] — the 32-byte SHA-256 content address of a chunk.
//! - [`Prefix`] — the remote namespace an object lives under.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

/// Content address of a chunk: `sha256(chunk_data)`.
///
/// Two chunks with equal bytes always produce equal keys. The all-zero
/// value is reserved as the "no key" sentinel ([`Key::ZERO`]).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct Key([u8; 32]);

impl Key {
    /// The reserved all-zero sentinel meaning "no key".
    pub const ZERO: Key = Key([0u8; 32]);

    /// Create a key by hashing arbitrary data with SHA-256.
    pub fn from_data(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Return the raw 32-byte representation.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the [`Key::ZERO`] sentinel.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl From<[u8; 32]> for Key {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}

/// Error returned when a string is not a valid hex-encoded [`Key`].
#[derive(Debug, thiserror::Error)]
#[error("invalid key '{0}': expected 64 hexadecimal characters")]
pub struct ParseKeyError(pub String);

impl FromStr for Key {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(ParseKeyError(s.to_owned()));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ParseKeyError(s.to_owned()))?;
        Ok(Self(bytes))
    }
}

/// Remote namespace an object is stored under.
///
/// The URL layout is `scheme://host/root/<prefix>/<key>`: chunks live under
/// `content` keyed by their hex digest, indexes live under `metadata` keyed
/// by a project UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefix {
    /// Chunk objects, keyed by hex SHA-256 digest. Immutable once written.
    Content,
    /// Index objects, keyed by project UUID.
    Metadata,
}

impl Prefix {
    /// The path segment used on the remote.
    pub fn as_str(&self) -> &'static str {
        match self {
            Prefix::Content => "content",
            Prefix::Metadata => "metadata",
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
