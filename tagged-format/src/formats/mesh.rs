//! Mesh block (`MESH`)
//!
//! # Layout
//! ```text
//! 0x00: layout u32 (primitive topology)
//! 0x04: indices_offset u64
//! 0x0C: vertices_offset u64
//! 0x14: axes_offset u64
//! 0x1C: metadata_offset u64
//! ```
//!
//! The referenced blocks are not resolved here; a vertices offset pointing
//! past the buffer only fails once the reader follows it.

use crate::block::BlockData;
use crate::codec::{PayloadReader, PayloadWriter};
use crate::error::{FormatError, Result};
use crate::registry::{BlockCodec, PayloadLayout};
use crate::tag::Tag;
use crate::writer::{BlockValue, Reference};

pub const MESH_TAG: Tag = Tag::from_bytes(*b"MESH");

/// Primitive topology of a mesh.
///
/// Layouts compare by code, so `Other(4)` equals `Triangles`.
#[derive(Debug, Clone, Copy)]
pub enum Layout {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
    /// Unrecognized code, preserved verbatim.
    Other(u32),
}

impl PartialEq for Layout {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for Layout {}

impl std::hash::Hash for Layout {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.code().hash(state);
    }
}

impl Layout {
    /// Every named layout, in code order.
    pub const NAMED: [Layout; 7] = [
        Layout::Points,
        Layout::Lines,
        Layout::LineLoop,
        Layout::LineStrip,
        Layout::Triangles,
        Layout::TriangleStrip,
        Layout::TriangleFan,
    ];

    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Layout::Points,
            1 => Layout::Lines,
            2 => Layout::LineLoop,
            3 => Layout::LineStrip,
            4 => Layout::Triangles,
            5 => Layout::TriangleStrip,
            6 => Layout::TriangleFan,
            other => Layout::Other(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Layout::Points => 0,
            Layout::Lines => 1,
            Layout::LineLoop => 2,
            Layout::LineStrip => 3,
            Layout::Triangles => 4,
            Layout::TriangleStrip => 5,
            Layout::TriangleFan => 6,
            Layout::Other(code) => code,
        }
    }

    /// Name used by the text description, `None` for unrecognized codes.
    pub fn name(self) -> Option<&'static str> {
        Some(match Self::from_code(self.code()) {
            Layout::Points => "points",
            Layout::Lines => "lines",
            Layout::LineLoop => "line-loop",
            Layout::LineStrip => "line-strip",
            Layout::Triangles => "triangles",
            Layout::TriangleStrip => "triangle-strip",
            Layout::TriangleFan => "triangle-fan",
            Layout::Other(_) => return None,
        })
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMED.into_iter().find(|layout| layout.name() == Some(name))
    }
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "layout({})", self.code()),
        }
    }
}

/// Mesh block contents. `O` is `u64` when decoded and [`Reference`] when
/// building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mesh<O = u64> {
    pub layout: Layout,
    pub indices: O,
    pub vertices: O,
    pub axes: O,
    pub metadata: O,
}

impl Mesh {
    /// Total block size in bytes
    pub const SIZE: usize = 48;

    /// Payload size in bytes
    pub const PAYLOAD_SIZE: usize = 36;
}

impl Mesh<Reference> {
    /// A mesh with every offset null.
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            indices: Reference::Null,
            vertices: Reference::Null,
            axes: Reference::Null,
            metadata: Reference::Null,
        }
    }
}

pub struct MeshCodec;

impl BlockCodec for MeshCodec {
    fn tag(&self) -> Tag {
        MESH_TAG
    }

    fn layout(&self) -> PayloadLayout {
        PayloadLayout::Fixed(Mesh::PAYLOAD_SIZE)
    }

    fn decode<'a>(&self, mut payload: PayloadReader<'a>) -> Result<BlockData<'a>> {
        Ok(BlockData::Mesh(Mesh {
            layout: Layout::from_code(payload.u32()?),
            indices: payload.offset("indices offset")?,
            vertices: payload.offset("vertices offset")?,
            axes: payload.offset("axes offset")?,
            metadata: payload.offset("metadata offset")?,
        }))
    }

    fn encode(&self, value: &BlockValue, out: &mut PayloadWriter) -> Result<()> {
        let BlockValue::Mesh(mesh) = value else {
            return Err(FormatError::ValueMismatch {
                tag: MESH_TAG,
                found: value.tag(),
            });
        };
        out.put_u32(mesh.layout.code());
        out.put_reference(mesh.indices);
        out.put_reference(mesh.vertices);
        out.put_reference(mesh.axes);
        out.put_reference(mesh.metadata);
        Ok(())
    }
}
