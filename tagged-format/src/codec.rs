//! Field level primitives: the 32-bit magnitude guard, fixed-width strings,
//! and the payload cursor/builder used by every tag codec.
//!
//! All multi-byte values are little-endian.

use crate::error::{FormatError, Result};
use crate::writer::Reference;

/// Width in bytes of every size and offset field.
pub const OFFSET_SIZE: usize = 8;

/// Width in bytes of the name field used by tables and nodes.
pub const NAME_SIZE: usize = 32;

/// Largest magnitude an 8-byte size/offset field may currently hold.
pub const MAX_MAGNITUDE: u64 = u32::MAX as u64;

/// Reject values that do not fit in 32 bits.
///
/// Size and offset fields reserve 8 bytes, but only the low word may be used.
pub fn check_magnitude(field: &'static str, value: u64) -> Result<u64> {
    if value > MAX_MAGNITUDE {
        return Err(FormatError::Range { field, value });
    }
    Ok(value)
}

/// Decode an 8-byte size/offset field, applying the magnitude guard.
pub fn decode_guarded(field: &'static str, bytes: [u8; 8]) -> Result<u64> {
    check_magnitude(field, u64::from_le_bytes(bytes))
}

/// Decode a NUL-terminated/padded ASCII string. Bytes after the first NUL
/// are ignored.
pub fn decode_fixed_string(bytes: &[u8], offset: u64) -> Result<String> {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let value = &bytes[..len];
    if !value.is_ascii() {
        return Err(FormatError::InvalidString { offset });
    }
    // ASCII is always valid UTF-8
    Ok(value.iter().map(|&b| b as char).collect())
}

/// Encode `value` into exactly `width` bytes, NUL-padded.
///
/// A value of exactly `width` characters is stored without a terminator.
pub fn encode_fixed_string(value: &str, width: usize) -> Result<Vec<u8>> {
    if value.len() > width {
        return Err(FormatError::StringTooLong {
            value: value.to_string(),
            width,
        });
    }
    if !value.is_ascii() || value.contains('\0') {
        return Err(FormatError::InvalidString { offset: 0 });
    }
    let mut bytes = vec![0u8; width];
    bytes[..value.len()].copy_from_slice(value.as_bytes());
    Ok(bytes)
}

/// Bounds-checked cursor over a payload slice.
///
/// `base` is the absolute buffer offset of the first payload byte, so errors
/// point at real positions in the backing buffer.
#[derive(Debug, Clone)]
pub struct PayloadReader<'a> {
    bytes: &'a [u8],
    base: u64,
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(bytes: &'a [u8], base: u64) -> Self {
        Self { bytes, base, pos: 0 }
    }

    /// Absolute buffer offset of the next unread byte.
    pub fn position(&self) -> u64 {
        self.base + self.pos as u64
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(FormatError::TruncatedBuffer {
                offset: self.position(),
                needed: len as u64,
                available: self.remaining() as u64,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Everything not yet consumed.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        slice
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    pub fn f32s<const N: usize>(&mut self) -> Result<[f32; N]> {
        let mut out = [0.0f32; N];
        for value in out.iter_mut() {
            *value = self.f32()?;
        }
        Ok(out)
    }

    /// Read an 8-byte offset field through the magnitude guard.
    pub fn offset(&mut self, field: &'static str) -> Result<u64> {
        decode_guarded(field, self.array()?)
    }

    pub fn fixed_string(&mut self, width: usize) -> Result<String> {
        let offset = self.position();
        decode_fixed_string(self.take(width)?, offset)
    }
}

/// Offset field awaiting the absolute position of its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixup {
    /// Byte position of the 8-byte field within the payload.
    pub at: usize,
    pub target: Reference,
}

/// Payload builder handed to codecs by the writer.
///
/// Offset fields are written as zero placeholders and recorded as fixups;
/// the writer patches them once every block has a position.
#[derive(Debug, Default)]
pub struct PayloadWriter {
    bytes: Vec<u8>,
    fixups: Vec<Fixup>,
}

impl PayloadWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn put_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        self.put_bytes(&value.to_le_bytes());
    }

    pub fn put_u32(&mut self, value: u32) {
        self.put_bytes(&value.to_le_bytes());
    }

    pub fn put_f32(&mut self, value: f32) {
        self.put_bytes(&value.to_le_bytes());
    }

    pub fn put_f32s(&mut self, values: &[f32]) {
        for &value in values {
            self.put_f32(value);
        }
    }

    pub fn put_fixed_string(&mut self, value: &str, width: usize) -> Result<()> {
        let encoded = encode_fixed_string(value, width)?;
        self.put_bytes(&encoded);
        Ok(())
    }

    /// Write an offset field pointing at another block of the description.
    pub fn put_reference(&mut self, target: Reference) {
        self.fixups.push(Fixup {
            at: self.bytes.len(),
            target,
        });
        self.put_bytes(&[0u8; OFFSET_SIZE]);
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<Fixup>) {
        (self.bytes, self.fixups)
    }
}
