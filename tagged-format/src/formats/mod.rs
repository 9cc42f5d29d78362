//! Built-in block formats
//!
//! Each module defines a tag constant, the decoded type (generic over the
//! offset representation where the block points at other blocks), and a
//! [`BlockCodec`](crate::BlockCodec) implementation.

pub mod axes;
pub mod camera;
pub mod external;
pub mod header;
pub mod index;
pub mod mesh;
pub mod scene;
pub mod skeleton;
pub mod table;
pub mod vertex;

use std::sync::Arc;

use crate::registry::Registry;

pub use axes::*;
pub use camera::*;
pub use external::*;
pub use header::*;
pub use index::*;
pub use mesh::*;
pub use scene::*;
pub use skeleton::*;
pub use table::*;
pub use vertex::*;

/// Register a codec for every built-in tag.
pub fn register_builtins(registry: &mut Registry) {
    registry.register(Arc::new(HeaderCodec));
    registry.register(Arc::new(OffsetTableCodec));
    registry.register(Arc::new(MeshCodec));
    registry.register(Arc::new(IndexCodec::new(IndexWidth::U16)));
    registry.register(Arc::new(IndexCodec::new(IndexWidth::U32)));
    for &format in VertexFormat::all() {
        registry.register(Arc::new(VertexCodec::new(format)));
    }
    registry.register(Arc::new(SkeletonCodec));
    registry.register(Arc::new(AxesCodec));
    registry.register(Arc::new(CameraCodec));
    registry.register(Arc::new(NodeCodec));
    registry.register(Arc::new(GeometryInstanceCodec));
    registry.register(Arc::new(ExternalCodec));
}
