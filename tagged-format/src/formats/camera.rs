//! Camera block (`CAM4`)
//!
//! # Layout
//! ```text
//! 0x00: view matrix f32x16 (column-major)
//! 0x40: projection matrix f32x16 (column-major)
//! ```

use glam::Mat4;

use crate::block::BlockData;
use crate::codec::{PayloadReader, PayloadWriter};
use crate::error::{FormatError, Result};
use crate::registry::{BlockCodec, PayloadLayout};
use crate::tag::Tag;
use crate::writer::BlockValue;

pub const CAMERA_TAG: Tag = Tag::from_bytes(*b"CAM4");

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub view: Mat4,
    pub projection: Mat4,
}

impl Camera {
    /// Payload size in bytes
    pub const PAYLOAD_SIZE: usize = 128;

    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

pub struct CameraCodec;

impl BlockCodec for CameraCodec {
    fn tag(&self) -> Tag {
        CAMERA_TAG
    }

    fn layout(&self) -> PayloadLayout {
        PayloadLayout::Fixed(Camera::PAYLOAD_SIZE)
    }

    fn decode<'a>(&self, mut payload: PayloadReader<'a>) -> Result<BlockData<'a>> {
        let view = Mat4::from_cols_array(&payload.f32s::<16>()?);
        let projection = Mat4::from_cols_array(&payload.f32s::<16>()?);
        Ok(BlockData::Camera(Camera { view, projection }))
    }

    fn encode(&self, value: &BlockValue, out: &mut PayloadWriter) -> Result<()> {
        let BlockValue::Camera(camera) = value else {
            return Err(FormatError::ValueMismatch {
                tag: CAMERA_TAG,
                found: value.tag(),
            });
        };
        out.put_f32s(&camera.view.to_cols_array());
        out.put_f32s(&camera.projection.to_cols_array());
        Ok(())
    }
}
