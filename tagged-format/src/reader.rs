//! Reader over a loaded buffer
//!
//! The reader owns the backing bytes and hands out blocks that borrow from
//! them. Nothing is decoded until asked for, and following an offset is
//! always an explicit call, so a dangling offset inside one block only fails
//! when something tries to read its target.

use std::sync::Arc;

use crate::block::{Block, BlockData};
use crate::error::{FormatError, Result};
use crate::formats::{
    AxisTable, Camera, External, GeometryInstance, Header, IndexArray, Mesh, Node, OffsetTable,
    Skeleton, VertexArray,
};
use crate::registry::Registry;

/// Load a buffer with the shared built-in registry.
///
/// Fails if offset 0 does not hold a valid header block.
pub fn load<B: AsRef<[u8]>>(buffer: B) -> Result<Reader<B>> {
    Reader::new(buffer, Registry::shared())
}

/// Decodes blocks from an immutable buffer.
#[derive(Debug, Clone)]
pub struct Reader<B> {
    buffer: B,
    registry: Arc<Registry>,
}

impl<B: AsRef<[u8]>> Reader<B> {
    pub fn new(buffer: B, registry: Arc<Registry>) -> Result<Self> {
        let reader = Self { buffer, registry };
        let header = reader.header()?;
        tracing::debug!(
            "Loaded {} byte buffer (magic {}, top offset {})",
            reader.bytes().len(),
            header.magic,
            header.top
        );
        Ok(reader)
    }

    pub fn bytes(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn into_inner(self) -> B {
        self.buffer
    }

    /// Decode the header block at offset 0.
    pub fn header(&self) -> Result<Header> {
        self.typed(0, "HDR3", |data| match data {
            BlockData::Header(header) => Some(header),
            _ => None,
        })
    }

    /// Decode the block starting at `offset`.
    pub fn block_at(&self, offset: u64) -> Result<Block<'_>> {
        self.registry.decode(self.bytes(), offset)
    }

    /// Follow an offset field. The null offset resolves to `None`.
    pub fn resolve(&self, offset: u64) -> Result<Option<Block<'_>>> {
        if offset == 0 {
            return Ok(None);
        }
        self.block_at(offset).map(Some)
    }

    /// Block the header's top offset points at.
    pub fn top(&self) -> Result<Option<Block<'_>>> {
        self.resolve(self.header()?.top)
    }

    /// Look `name` up in the top-level offset table and decode its block.
    pub fn named(&self, name: &str) -> Result<Block<'_>> {
        let top = self.header()?.top;
        let table = self.table_at(top)?;
        self.block_at(table.lookup(name)?)
    }

    pub fn table_at(&self, offset: u64) -> Result<OffsetTable> {
        self.typed(offset, "#OFS", |data| match data {
            BlockData::OffsetTable(table) => Some(table),
            _ => None,
        })
    }

    pub fn mesh_at(&self, offset: u64) -> Result<Mesh> {
        self.typed(offset, "MESH", |data| match data {
            BlockData::Mesh(mesh) => Some(mesh),
            _ => None,
        })
    }

    pub fn indices_at(&self, offset: u64) -> Result<IndexArray<'_>> {
        self.typed(offset, "IN16 or IN32", |data| match data {
            BlockData::Indices(indices) => Some(indices),
            _ => None,
        })
    }

    pub fn vertices_at(&self, offset: u64) -> Result<VertexArray<'_>> {
        self.typed(offset, "vertex", |data| match data {
            BlockData::Vertices(vertices) => Some(vertices),
            _ => None,
        })
    }

    pub fn skeleton_at(&self, offset: u64) -> Result<Skeleton> {
        self.typed(offset, "SKEL", |data| match data {
            BlockData::Skeleton(skeleton) => Some(skeleton),
            _ => None,
        })
    }

    pub fn axes_at(&self, offset: u64) -> Result<AxisTable> {
        self.typed(offset, "#AXE", |data| match data {
            BlockData::Axes(axes) => Some(axes),
            _ => None,
        })
    }

    pub fn camera_at(&self, offset: u64) -> Result<Camera> {
        self.typed(offset, "CAM4", |data| match data {
            BlockData::Camera(camera) => Some(camera),
            _ => None,
        })
    }

    pub fn node_at(&self, offset: u64) -> Result<Node> {
        self.typed(offset, "NODE", |data| match data {
            BlockData::Node(node) => Some(node),
            _ => None,
        })
    }

    pub fn geometry_instance_at(&self, offset: u64) -> Result<GeometryInstance> {
        self.typed(offset, "#GEO", |data| match data {
            BlockData::GeometryInstance(instance) => Some(instance),
            _ => None,
        })
    }

    pub fn external_at(&self, offset: u64) -> Result<External> {
        self.typed(offset, "EXRN", |data| match data {
            BlockData::External(external) => Some(external),
            _ => None,
        })
    }

    /// Walk blocks back to back from offset 0 until the end of the buffer.
    ///
    /// The walk stops after the first block that fails to decode.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            buffer: self.bytes(),
            registry: &self.registry,
            offset: 0,
            done: false,
        }
    }

    fn typed<'a, T>(
        &'a self,
        offset: u64,
        expected: &'static str,
        extract: impl FnOnce(BlockData<'a>) -> Option<T>,
    ) -> Result<T> {
        let block = self.block_at(offset)?;
        let found = block.tag;
        extract(block.data).ok_or(FormatError::UnexpectedTag {
            expected,
            found,
            offset,
        })
    }
}

/// Sequential block iterator, see [`Reader::blocks`].
pub struct Blocks<'a> {
    buffer: &'a [u8],
    registry: &'a Registry,
    offset: u64,
    done: bool,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Result<Block<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.buffer.len() as u64 {
            return None;
        }

        let result = self.registry.decode(self.buffer, self.offset);
        match &result {
            Ok(block) => self.offset = block.end(),
            Err(_) => self.done = true,
        }
        Some(result)
    }
}
