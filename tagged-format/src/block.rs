//! Common block header and decoded blocks.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::codec::decode_guarded;
use crate::error::{FormatError, Result};
use crate::formats::{
    Axis, AxisTable, Camera, External, GeometryInstance, Header, IndexArray, Mesh, Node,
    OffsetTable, Skeleton, VertexArray,
};
use crate::tag::Tag;

/// The 12-byte prefix shared by every block.
///
/// Layout:
/// - tag: 4 bytes, ASCII, NUL-padded
/// - byte size: 8 bytes, high word must be zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub tag: Tag,
    /// Total block length including these 12 bytes.
    pub byte_size: u64,
}

impl BlockHeader {
    pub const SIZE: usize = 12;

    pub fn new(tag: Tag, byte_size: u64) -> Self {
        Self { tag, byte_size }
    }

    /// Decode the header of the block starting at absolute `offset`.
    pub fn decode(buffer: &[u8], offset: u64) -> Result<Self> {
        let available = (buffer.len() as u64).saturating_sub(offset);
        if available < Self::SIZE as u64 {
            return Err(FormatError::TruncatedBuffer {
                offset,
                needed: Self::SIZE as u64,
                available,
            });
        }

        let start = offset as usize;
        let bytes = &buffer[start..start + Self::SIZE];
        let mut tag = [0u8; 4];
        tag.copy_from_slice(&bytes[0..4]);
        let mut size = [0u8; 8];
        size.copy_from_slice(&bytes[4..12]);

        Ok(Self {
            tag: Tag::from_bytes(tag),
            byte_size: decode_guarded("block size", size)?,
        })
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<[u8; Self::SIZE]> {
        if self.byte_size > u32::MAX as u64 {
            return Err(FormatError::SizeOverflow(self.byte_size));
        }

        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.tag.to_bytes());
        bytes[4..12].copy_from_slice(&self.byte_size.to_le_bytes());
        Ok(bytes)
    }
}

/// Encode a header from a textual tag.
pub fn encode_header(tag: &str, byte_size: u64) -> Result<[u8; BlockHeader::SIZE]> {
    BlockHeader::new(Tag::new(tag)?, byte_size).to_bytes()
}

/// Decoded data produced by a third-party codec.
///
/// Equality is identity: two values are equal when they share one allocation.
#[derive(Clone)]
pub struct Custom {
    tag: Tag,
    value: Arc<dyn Any + Send + Sync>,
}

impl Custom {
    pub fn new<T: Any + Send + Sync>(tag: Tag, value: T) -> Self {
        Self {
            tag,
            value: Arc::new(value),
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }
}

impl fmt::Debug for Custom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Custom").field("tag", &self.tag).finish_non_exhaustive()
    }
}

impl PartialEq for Custom {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && Arc::ptr_eq(&self.value, &other.value)
    }
}

/// Tag-specific view of a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockData<'a> {
    Header(Header),
    OffsetTable(OffsetTable),
    Mesh(Mesh),
    Indices(IndexArray<'a>),
    Vertices(VertexArray<'a>),
    Skeleton(Skeleton),
    Axes(AxisTable),
    Camera(Camera),
    Node(Node),
    GeometryInstance(GeometryInstance),
    External(External),
    Custom(Custom),
    /// No codec is registered for the tag; see [`Block::payload`].
    Opaque,
}

impl BlockData<'_> {
    /// Offsets this block holds into other blocks, null offsets included.
    pub fn offsets(&self) -> Vec<u64> {
        match self {
            BlockData::Header(header) => vec![header.top],
            BlockData::OffsetTable(table) => {
                table.entries().iter().map(|entry| entry.offset).collect()
            }
            BlockData::Mesh(mesh) => vec![mesh.indices, mesh.vertices, mesh.axes, mesh.metadata],
            BlockData::Skeleton(skeleton) => vec![skeleton.bones, skeleton.sequences],
            BlockData::Node(node) => node.children.clone(),
            BlockData::GeometryInstance(instance) => {
                vec![instance.mesh, instance.skeleton, instance.material]
            }
            _ => Vec::new(),
        }
    }

    /// Axes of an `#AXE` block, if this is one.
    pub fn axes(&self) -> Option<&[Axis]> {
        match self {
            BlockData::Axes(table) => Some(table.axes()),
            _ => None,
        }
    }
}

/// A decoded block borrowing from the reader's buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Block<'a> {
    /// Absolute offset of the block header.
    pub offset: u64,
    pub tag: Tag,
    pub byte_size: u64,
    /// Raw payload bytes, `byte_size - 12` long.
    pub payload: &'a [u8],
    pub data: BlockData<'a>,
}

impl Block<'_> {
    pub fn is_opaque(&self) -> bool {
        matches!(self.data, BlockData::Opaque)
    }

    /// Offset one past the last byte of the block.
    pub fn end(&self) -> u64 {
        self.offset + self.byte_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let bytes = encode_header("MESH", 48).unwrap();
        assert_eq!(&bytes[0..4], b"MESH");
        assert_eq!(u64::from_le_bytes(bytes[4..12].try_into().unwrap()), 48);

        let header = BlockHeader::decode(&bytes, 0).unwrap();
        assert_eq!(header, BlockHeader::new(Tag::from_bytes(*b"MESH"), 48));
    }

    #[test]
    fn test_short_tag_encoding() {
        let bytes = encode_header("AB", 12).unwrap();
        assert_eq!(&bytes[0..4], &[b'A', b'B', 0, 0]);
    }

    #[test]
    fn test_invalid_tag_rejected() {
        assert!(matches!(
            encode_header("HEADER", 12),
            Err(FormatError::InvalidTag(_))
        ));
    }

    #[test]
    fn test_size_overflow() {
        assert_eq!(
            encode_header("BIG", 1 << 32),
            Err(FormatError::SizeOverflow(1 << 32))
        );
        assert!(encode_header("BIG", u32::MAX as u64).is_ok());
    }

    #[test]
    fn test_size_high_word_rejected() {
        let mut bytes = encode_header("IN16", 16).unwrap();
        bytes[8] = 1;
        assert!(matches!(
            BlockHeader::decode(&bytes, 0),
            Err(FormatError::Range {
                field: "block size",
                ..
            })
        ));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = encode_header("IN16", 16).unwrap();
        assert_eq!(
            BlockHeader::decode(&bytes[..11], 0),
            Err(FormatError::TruncatedBuffer {
                offset: 0,
                needed: 12,
                available: 11
            })
        );
        assert_eq!(
            BlockHeader::decode(&bytes, 40),
            Err(FormatError::TruncatedBuffer {
                offset: 40,
                needed: 12,
                available: 0
            })
        );
    }

    #[test]
    fn test_custom_equality_is_identity() {
        let tag = Tag::from_bytes(*b"NOTE");
        let a = Custom::new(tag, 5u32);
        let b = Custom::new(tag, 5u32);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.downcast_ref::<u32>(), Some(&5));
        assert_eq!(a.downcast_ref::<u64>(), None);
    }
}
