//! Index array blocks (`IN16`, `IN32`)
//!
//! Packed little-endian indices with no further header. The count is the
//! payload length divided by the index width.

use crate::block::BlockData;
use crate::codec::{PayloadReader, PayloadWriter};
use crate::error::{FormatError, Result};
use crate::registry::{BlockCodec, PayloadLayout};
use crate::tag::Tag;
use crate::writer::BlockValue;

use super::vertex::DataType;

pub const INDEX16_TAG: Tag = Tag::from_bytes(*b"IN16");
pub const INDEX32_TAG: Tag = Tag::from_bytes(*b"IN32");

/// Width of one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexWidth {
    U16,
    U32,
}

impl IndexWidth {
    pub fn tag(self) -> Tag {
        match self {
            IndexWidth::U16 => INDEX16_TAG,
            IndexWidth::U32 => INDEX32_TAG,
        }
    }

    pub fn from_tag(tag: Tag) -> Option<Self> {
        match tag {
            INDEX16_TAG => Some(IndexWidth::U16),
            INDEX32_TAG => Some(IndexWidth::U32),
            _ => None,
        }
    }

    pub fn stride(self) -> usize {
        self.data_type().size()
    }

    pub fn data_type(self) -> DataType {
        match self {
            IndexWidth::U16 => DataType::Uint16,
            IndexWidth::U32 => DataType::Uint32,
        }
    }
}

/// Zero-copy view over an index payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexArray<'a> {
    width: IndexWidth,
    bytes: &'a [u8],
}

impl<'a> IndexArray<'a> {
    /// Wrap `bytes`, which must be a whole number of indices.
    pub fn new(width: IndexWidth, bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() % width.stride() != 0 {
            return Err(FormatError::MisalignedPayload {
                tag: width.tag(),
                len: bytes.len(),
                stride: width.stride(),
            });
        }
        Ok(Self { width, bytes })
    }

    pub fn width(&self) -> IndexWidth {
        self.width
    }

    pub fn stride(&self) -> usize {
        self.width.stride()
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / self.stride()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        let stride = self.stride();
        let raw = self.bytes.get(index * stride..(index + 1) * stride)?;
        Some(read_index(self.width, raw))
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + use<'a> {
        let width = self.width;
        self.bytes
            .chunks_exact(width.stride())
            .map(move |raw| read_index(width, raw))
    }

    /// Borrow 16-bit indices directly when the payload is suitably aligned.
    pub fn as_u16(&self) -> Option<&'a [u16]> {
        if self.width != IndexWidth::U16 || cfg!(target_endian = "big") {
            return None;
        }
        bytemuck::try_cast_slice(self.bytes).ok()
    }

    /// Borrow 32-bit indices directly when the payload is suitably aligned.
    pub fn as_u32(&self) -> Option<&'a [u32]> {
        if self.width != IndexWidth::U32 || cfg!(target_endian = "big") {
            return None;
        }
        bytemuck::try_cast_slice(self.bytes).ok()
    }

    /// Copy out as an owned buffer of the same width.
    pub fn to_buffer(&self) -> IndexBuffer {
        match self.width {
            IndexWidth::U16 => IndexBuffer::U16(self.iter().map(|i| i as u16).collect()),
            IndexWidth::U32 => IndexBuffer::U32(self.iter().collect()),
        }
    }
}

fn read_index(width: IndexWidth, raw: &[u8]) -> u32 {
    match width {
        IndexWidth::U16 => u16::from_le_bytes([raw[0], raw[1]]) as u32,
        IndexWidth::U32 => u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
    }
}

/// Owned indices for building a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    pub fn width(&self) -> IndexWidth {
        match self {
            IndexBuffer::U16(_) => IndexWidth::U16,
            IndexBuffer::U32(_) => IndexWidth::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(indices) => indices.len(),
            IndexBuffer::U32(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Codec for one index width; registered once per tag.
pub struct IndexCodec {
    width: IndexWidth,
}

impl IndexCodec {
    pub fn new(width: IndexWidth) -> Self {
        Self { width }
    }
}

impl BlockCodec for IndexCodec {
    fn tag(&self) -> Tag {
        self.width.tag()
    }

    fn layout(&self) -> PayloadLayout {
        PayloadLayout::Records {
            stride: self.width.stride(),
        }
    }

    fn decode<'a>(&self, mut payload: PayloadReader<'a>) -> Result<BlockData<'a>> {
        Ok(BlockData::Indices(IndexArray::new(self.width, payload.rest())?))
    }

    fn encode(&self, value: &BlockValue, out: &mut PayloadWriter) -> Result<()> {
        match (self.width, value) {
            (IndexWidth::U16, BlockValue::Indices(IndexBuffer::U16(indices))) => {
                indices.iter().for_each(|&i| out.put_u16(i));
            }
            (IndexWidth::U32, BlockValue::Indices(IndexBuffer::U32(indices))) => {
                indices.iter().for_each(|&i| out.put_u32(i));
            }
            _ => {
                return Err(FormatError::ValueMismatch {
                    tag: self.tag(),
                    found: value.tag(),
                });
            }
        }
        Ok(())
    }
}
