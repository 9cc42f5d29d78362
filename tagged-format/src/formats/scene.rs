//! Scene graph blocks: nodes (`NODE`) and geometry instances (`#GEO`)
//!
//! # NODE layout
//! ```text
//! 0x00: name [u8; 32], NUL-padded ASCII
//! 0x20: transform f32x16 (column-major)
//! 0x60: child offsets, u64 each, until the end of the block
//! ```
//!
//! # #GEO layout
//! ```text
//! 0x00: mesh_offset u64
//! 0x08: skeleton_offset u64
//! 0x10: material_offset u64
//! ```

use glam::Mat4;

use crate::block::BlockData;
use crate::codec::{NAME_SIZE, OFFSET_SIZE, PayloadReader, PayloadWriter};
use crate::error::{FormatError, Result};
use crate::registry::{BlockCodec, PayloadLayout};
use crate::tag::Tag;
use crate::writer::{BlockValue, Reference};

pub const NODE_TAG: Tag = Tag::from_bytes(*b"NODE");
pub const GEOMETRY_INSTANCE_TAG: Tag = Tag::from_bytes(*b"#GEO");

/// Fixed part of a node payload: name + transform
const NODE_HEAD_SIZE: usize = NAME_SIZE + 64;

/// A named transform with child blocks (nodes, geometry instances, cameras).
#[derive(Debug, Clone, PartialEq)]
pub struct Node<O = u64> {
    pub name: String,
    pub transform: Mat4,
    pub children: Vec<O>,
}

impl<O> Node<O> {
    pub fn new(name: impl Into<String>, transform: Mat4) -> Self {
        Self {
            name: name.into(),
            transform,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryInstance<O = u64> {
    pub mesh: O,
    pub skeleton: O,
    pub material: O,
}

impl GeometryInstance {
    /// Payload size in bytes
    pub const PAYLOAD_SIZE: usize = 3 * OFFSET_SIZE;
}

impl Default for GeometryInstance<Reference> {
    fn default() -> Self {
        Self {
            mesh: Reference::Null,
            skeleton: Reference::Null,
            material: Reference::Null,
        }
    }
}

pub struct NodeCodec;

impl BlockCodec for NodeCodec {
    fn tag(&self) -> Tag {
        NODE_TAG
    }

    fn layout(&self) -> PayloadLayout {
        PayloadLayout::HeadAndRecords {
            head: NODE_HEAD_SIZE,
            stride: OFFSET_SIZE,
        }
    }

    fn decode<'a>(&self, mut payload: PayloadReader<'a>) -> Result<BlockData<'a>> {
        let name = payload.fixed_string(NAME_SIZE)?;
        let transform = Mat4::from_cols_array(&payload.f32s::<16>()?);
        let mut children = Vec::with_capacity(payload.remaining() / OFFSET_SIZE);
        while payload.remaining() > 0 {
            children.push(payload.offset("child offset")?);
        }
        Ok(BlockData::Node(Node {
            name,
            transform,
            children,
        }))
    }

    fn encode(&self, value: &BlockValue, out: &mut PayloadWriter) -> Result<()> {
        let BlockValue::Node(node) = value else {
            return Err(FormatError::ValueMismatch {
                tag: NODE_TAG,
                found: value.tag(),
            });
        };
        out.put_fixed_string(&node.name, NAME_SIZE)?;
        out.put_f32s(&node.transform.to_cols_array());
        for &child in &node.children {
            out.put_reference(child);
        }
        Ok(())
    }
}

pub struct GeometryInstanceCodec;

impl BlockCodec for GeometryInstanceCodec {
    fn tag(&self) -> Tag {
        GEOMETRY_INSTANCE_TAG
    }

    fn layout(&self) -> PayloadLayout {
        PayloadLayout::Fixed(GeometryInstance::PAYLOAD_SIZE)
    }

    fn decode<'a>(&self, mut payload: PayloadReader<'a>) -> Result<BlockData<'a>> {
        Ok(BlockData::GeometryInstance(GeometryInstance {
            mesh: payload.offset("mesh offset")?,
            skeleton: payload.offset("skeleton offset")?,
            material: payload.offset("material offset")?,
        }))
    }

    fn encode(&self, value: &BlockValue, out: &mut PayloadWriter) -> Result<()> {
        let BlockValue::GeometryInstance(instance) = value else {
            return Err(FormatError::ValueMismatch {
                tag: GEOMETRY_INSTANCE_TAG,
                found: value.tag(),
            });
        };
        out.put_reference(instance.mesh);
        out.put_reference(instance.skeleton);
        out.put_reference(instance.material);
        Ok(())
    }
}
