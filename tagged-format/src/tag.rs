//! Four byte block identifiers.

use std::fmt;

use crate::error::{FormatError, Result};

/// A 4-byte ASCII block tag, NUL-padded when shorter than 4 characters.
///
/// Tags compare by their raw bytes, so `Tag::from_bytes(*b"MESH")` and
/// `Tag::new("MESH")` are the same key in a [`Registry`](crate::Registry).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag([u8; 4]);

impl Tag {
    pub const SIZE: usize = 4;

    /// Build a tag from raw bytes as they appear in a buffer.
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Build a tag from a string of 1 to 4 ASCII characters.
    pub fn new(identifier: &str) -> Result<Self> {
        let raw = identifier.as_bytes();
        if raw.is_empty() || raw.len() > Self::SIZE || !raw.iter().all(|b| b.is_ascii() && *b != 0)
        {
            return Err(FormatError::InvalidTag(identifier.to_string()));
        }

        let mut bytes = [0u8; 4];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self(bytes))
    }

    /// Raw bytes as written to the buffer.
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0
    }

    /// Human readable name with trailing NUL padding removed.
    pub fn name(&self) -> String {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(Self::SIZE);
        self.0[..len]
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '?' })
            .collect()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({:?})", self.name())
    }
}

impl TryFrom<&str> for Tag {
    type Error = FormatError;

    fn try_from(identifier: &str) -> Result<Self> {
        Self::new(identifier)
    }
}
