//! Writer: structured description → binary buffer
//!
//! A [`Description`] is an arena of block values. Offset fields hold
//! [`Reference`]s to other blocks of the same description instead of absolute
//! offsets, so blocks may point forwards, backwards, or at themselves.
//!
//! [`Writer::build`] works in two passes:
//! 1. encode every payload through the registry, recording where each
//!    reference was written;
//! 2. lay blocks out in order (header first) and patch each recorded field
//!    with its target's absolute offset.

use std::sync::Arc;

use crate::block::{BlockHeader, Custom};
use crate::codec::{Fixup, OFFSET_SIZE, check_magnitude};
use crate::error::{FormatError, Result};
use crate::formats::{
    Axis, Camera, DEFAULT_MAGIC, External, GeometryInstance, Header, HEADER_TAG, IndexBuffer,
    Mesh, NamedOffset, Node, Skeleton, VertexBuffer, AXES_TAG, CAMERA_TAG, EXTERNAL_TAG,
    GEOMETRY_INSTANCE_TAG, MESH_TAG, NODE_TAG, OFFSET_TABLE_TAG, SKELETON_TAG,
};
use crate::registry::Registry;
use crate::tag::Tag;

/// Handle to a block within one [`Description`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Value of an offset field before layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Reference {
    /// Written as offset 0.
    #[default]
    Null,
    Block(BlockId),
}

impl From<BlockId> for Reference {
    fn from(id: BlockId) -> Self {
        Reference::Block(id)
    }
}

/// Structured value of one block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockValue {
    Header(Header<Reference>),
    OffsetTable(Vec<NamedOffset<Reference>>),
    Mesh(Mesh<Reference>),
    Indices(IndexBuffer),
    Vertices(VertexBuffer),
    Skeleton(Skeleton<Reference>),
    Axes(Vec<Axis>),
    Camera(Camera),
    Node(Node<Reference>),
    GeometryInstance(GeometryInstance<Reference>),
    External(External),
    /// Encoded by whichever codec is registered for the custom tag.
    Custom(Custom),
    /// Payload bytes written verbatim, no codec involved.
    Raw { tag: Tag, payload: Vec<u8> },
}

impl BlockValue {
    pub fn tag(&self) -> Tag {
        match self {
            BlockValue::Header(_) => HEADER_TAG,
            BlockValue::OffsetTable(_) => OFFSET_TABLE_TAG,
            BlockValue::Mesh(_) => MESH_TAG,
            BlockValue::Indices(indices) => indices.width().tag(),
            BlockValue::Vertices(vertices) => vertices.format().tag,
            BlockValue::Skeleton(_) => SKELETON_TAG,
            BlockValue::Axes(_) => AXES_TAG,
            BlockValue::Camera(_) => CAMERA_TAG,
            BlockValue::Node(_) => NODE_TAG,
            BlockValue::GeometryInstance(_) => GEOMETRY_INSTANCE_TAG,
            BlockValue::External(_) => EXTERNAL_TAG,
            BlockValue::Custom(custom) => custom.tag(),
            BlockValue::Raw { tag, .. } => *tag,
        }
    }
}

/// Arena of block values plus the header fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Description {
    blocks: Vec<Option<BlockValue>>,
    top: Reference,
    magic: u32,
}

impl Default for Description {
    fn default() -> Self {
        Self {
            blocks: Vec::new(),
            top: Reference::Null,
            magic: DEFAULT_MAGIC,
        }
    }
}

impl Description {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block. Blocks are written in the order they are added.
    pub fn add(&mut self, value: BlockValue) -> BlockId {
        self.blocks.push(Some(value));
        BlockId(self.blocks.len() - 1)
    }

    /// Reserve a slot to be filled later with [`set`](Self::set), so other
    /// blocks can reference it first.
    pub fn reserve(&mut self) -> BlockId {
        self.blocks.push(None);
        BlockId(self.blocks.len() - 1)
    }

    /// Fill or replace a slot.
    pub fn set(&mut self, id: BlockId, value: BlockValue) -> Result<()> {
        let slot = self
            .blocks
            .get_mut(id.0)
            .ok_or(FormatError::UnresolvedReference(id.0))?;
        *slot = Some(value);
        Ok(())
    }

    pub fn get(&self, id: BlockId) -> Option<&BlockValue> {
        self.blocks.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut BlockValue> {
        self.blocks.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn set_top(&mut self, top: impl Into<Reference>) {
        self.top = top.into();
    }

    pub fn top(&self) -> Reference {
        self.top
    }

    pub fn set_magic(&mut self, magic: u32) {
        self.magic = magic;
    }

    pub fn magic(&self) -> u32 {
        self.magic
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Header value written in front of the blocks.
    pub fn header(&self) -> Header<Reference> {
        Header {
            magic: self.magic,
            top: self.top,
        }
    }
}

/// Builds binary buffers from descriptions.
#[derive(Debug, Clone)]
pub struct Writer {
    registry: Arc<Registry>,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new(Registry::shared())
    }
}

struct EncodedBlock {
    tag: Tag,
    payload: Vec<u8>,
    fixups: Vec<Fixup>,
}

impl Writer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode `description` into a complete buffer.
    pub fn build(&self, description: &Description) -> Result<Vec<u8>> {
        // Pass 1: header then every block, in order
        let mut encoded = Vec::with_capacity(description.len() + 1);
        encoded.push(self.encode(&BlockValue::Header(description.header()))?);
        for (index, slot) in description.blocks.iter().enumerate() {
            let value = slot
                .as_ref()
                .ok_or(FormatError::UnresolvedReference(index))?;
            encoded.push(self.encode(value)?);
        }

        // Layout: encoded[0] is the header, encoded[i + 1] is BlockId(i)
        let mut positions = Vec::with_capacity(encoded.len());
        let mut cursor = 0u64;
        for block in &encoded {
            positions.push(check_magnitude("block offset", cursor)?);
            cursor += (BlockHeader::SIZE + block.payload.len()) as u64;
        }
        let total = cursor;

        let resolve = |target: Reference| -> Result<u64> {
            match target {
                Reference::Null => Ok(0),
                Reference::Block(id) => positions
                    .get(id.0 + 1)
                    .copied()
                    .ok_or(FormatError::UnresolvedReference(id.0)),
            }
        };

        // Pass 2: patch offsets and emit
        let mut out = Vec::with_capacity(total as usize);
        for mut block in encoded {
            for fixup in &block.fixups {
                let offset = resolve(fixup.target)?;
                block.payload[fixup.at..fixup.at + OFFSET_SIZE]
                    .copy_from_slice(&offset.to_le_bytes());
            }
            let byte_size = (BlockHeader::SIZE + block.payload.len()) as u64;
            out.extend_from_slice(&BlockHeader::new(block.tag, byte_size).to_bytes()?);
            out.extend_from_slice(&block.payload);
        }

        tracing::debug!(
            "Laid out {} blocks in {} bytes",
            description.len() + 1,
            out.len()
        );

        Ok(out)
    }

    fn encode(&self, value: &BlockValue) -> Result<EncodedBlock> {
        let (tag, payload) = self.registry.encode(value)?;
        let (payload, fixups) = payload.into_parts();
        Ok(EncodedBlock {
            tag,
            payload,
            fixups,
        })
    }
}

/// Build with the shared built-in registry.
pub fn build(description: &Description) -> Result<Vec<u8>> {
    Writer::default().build(description)
}
