//! Header block (`HDR3`)
//!
//! Always the first block of a buffer, at offset 0.
//!
//! # Layout
//! ```text
//! 0x00: tag "HDR3"
//! 0x04: byte_size u64 (always 24)
//! 0x0C: magic u32
//! 0x10: top_offset u64
//! ```

use crate::block::{BlockData, BlockHeader};
use crate::codec::{PayloadReader, PayloadWriter};
use crate::error::{FormatError, Result};
use crate::registry::{BlockCodec, PayloadLayout};
use crate::tag::Tag;
use crate::writer::{BlockValue, Reference};

pub const HEADER_TAG: Tag = Tag::from_bytes(*b"HDR3");

/// Magic written when the description does not override it.
pub const DEFAULT_MAGIC: u32 = 42;

/// Header block contents. `O` is `u64` when decoded and
/// [`Reference`] when building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<O = u64> {
    pub magic: u32,
    /// Entry point of the buffer, usually an offset table.
    pub top: O,
}

impl Header {
    /// Total block size in bytes
    pub const SIZE: usize = 24;

    /// Payload size in bytes
    pub const PAYLOAD_SIZE: usize = 12;

    pub fn new(magic: u32, top: u64) -> Self {
        Self { magic, top }
    }

    /// Write the whole block to bytes
    pub fn to_bytes(&self) -> Result<[u8; Self::SIZE]> {
        let top = crate::codec::check_magnitude("top offset", self.top)?;
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..12].copy_from_slice(&BlockHeader::new(HEADER_TAG, Self::SIZE as u64).to_bytes()?);
        bytes[12..16].copy_from_slice(&self.magic.to_le_bytes());
        bytes[16..24].copy_from_slice(&top.to_le_bytes());
        Ok(bytes)
    }
}

impl Default for Header<Reference> {
    fn default() -> Self {
        Self {
            magic: DEFAULT_MAGIC,
            top: Reference::Null,
        }
    }
}

pub struct HeaderCodec;

impl BlockCodec for HeaderCodec {
    fn tag(&self) -> Tag {
        HEADER_TAG
    }

    fn layout(&self) -> PayloadLayout {
        PayloadLayout::Fixed(Header::PAYLOAD_SIZE)
    }

    fn decode<'a>(&self, mut payload: PayloadReader<'a>) -> Result<BlockData<'a>> {
        Ok(BlockData::Header(Header {
            magic: payload.u32()?,
            top: payload.offset("top offset")?,
        }))
    }

    fn encode(&self, value: &BlockValue, out: &mut PayloadWriter) -> Result<()> {
        let BlockValue::Header(header) = value else {
            return Err(FormatError::ValueMismatch {
                tag: HEADER_TAG,
                found: value.tag(),
            });
        };
        out.put_u32(header.magic);
        out.put_reference(header.top);
        Ok(())
    }
}
