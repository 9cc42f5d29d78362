//! Skeleton block (`SKEL`)
//!
//! # Layout
//! ```text
//! 0x00: bones_offset u64
//! 0x08: sequences_offset u64
//! ```
//!
//! The bone and sequence blocks themselves are not interpreted; they decode
//! as opaque blocks unless a codec is registered for their tags.

use crate::block::BlockData;
use crate::codec::{PayloadReader, PayloadWriter};
use crate::error::{FormatError, Result};
use crate::registry::{BlockCodec, PayloadLayout};
use crate::tag::Tag;
use crate::writer::{BlockValue, Reference};

pub const SKELETON_TAG: Tag = Tag::from_bytes(*b"SKEL");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skeleton<O = u64> {
    pub bones: O,
    pub sequences: O,
}

impl Skeleton {
    /// Total block size in bytes
    pub const SIZE: usize = 28;

    /// Payload size in bytes
    pub const PAYLOAD_SIZE: usize = 16;
}

impl Default for Skeleton<Reference> {
    fn default() -> Self {
        Self {
            bones: Reference::Null,
            sequences: Reference::Null,
        }
    }
}

pub struct SkeletonCodec;

impl BlockCodec for SkeletonCodec {
    fn tag(&self) -> Tag {
        SKELETON_TAG
    }

    fn layout(&self) -> PayloadLayout {
        PayloadLayout::Fixed(Skeleton::PAYLOAD_SIZE)
    }

    fn decode<'a>(&self, mut payload: PayloadReader<'a>) -> Result<BlockData<'a>> {
        Ok(BlockData::Skeleton(Skeleton {
            bones: payload.offset("bones offset")?,
            sequences: payload.offset("sequences offset")?,
        }))
    }

    fn encode(&self, value: &BlockValue, out: &mut PayloadWriter) -> Result<()> {
        let BlockValue::Skeleton(skeleton) = value else {
            return Err(FormatError::ValueMismatch {
                tag: SKELETON_TAG,
                found: value.tag(),
            });
        };
        out.put_reference(skeleton.bones);
        out.put_reference(skeleton.sequences);
        Ok(())
    }
}
