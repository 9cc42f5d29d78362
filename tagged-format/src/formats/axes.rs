//! Axis table block (`#AXE`)
//!
//! Named local frames attached to a mesh.
//!
//! # Layout
//! ```text
//! repeated 60-byte records:
//! 0x00: name [u8; 32], NUL-padded ASCII
//! 0x20: translation f32x3
//! 0x2C: rotation f32x4 (quaternion x, y, z, w)
//! ```

use glam::{Quat, Vec3};
use hashbrown::HashMap;

use crate::block::BlockData;
use crate::codec::{NAME_SIZE, PayloadReader, PayloadWriter};
use crate::error::{FormatError, Result};
use crate::registry::{BlockCodec, PayloadLayout};
use crate::tag::Tag;
use crate::writer::BlockValue;

pub const AXES_TAG: Tag = Tag::from_bytes(*b"#AXE");

/// Size of one axis record in bytes
pub const AXIS_SIZE: usize = NAME_SIZE + 12 + 16;

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Axis {
    pub fn new(name: impl Into<String>, translation: Vec3, rotation: Quat) -> Self {
        Self {
            name: name.into(),
            translation,
            rotation,
        }
    }
}

/// Decoded axis table. Lookup follows the offset table rule: the last axis
/// with a given name wins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AxisTable {
    axes: Vec<Axis>,
    index: HashMap<String, usize>,
}

impl AxisTable {
    pub fn new(axes: Vec<Axis>) -> Self {
        let index = axes
            .iter()
            .enumerate()
            .map(|(i, axis)| (axis.name.clone(), i))
            .collect();
        Self { axes, index }
    }

    pub fn lookup(&self, name: &str) -> Result<&Axis> {
        self.index
            .get(name)
            .map(|&i| &self.axes[i])
            .ok_or_else(|| FormatError::NameNotFound(name.to_string()))
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }
}

pub struct AxesCodec;

impl BlockCodec for AxesCodec {
    fn tag(&self) -> Tag {
        AXES_TAG
    }

    fn layout(&self) -> PayloadLayout {
        PayloadLayout::Table {
            entry_size: AXIS_SIZE,
        }
    }

    fn decode<'a>(&self, mut payload: PayloadReader<'a>) -> Result<BlockData<'a>> {
        let count = payload.remaining() / AXIS_SIZE;
        let mut axes = Vec::with_capacity(count);
        for _ in 0..count {
            let name = payload.fixed_string(NAME_SIZE)?;
            let translation = Vec3::from_array(payload.f32s::<3>()?);
            let rotation = Quat::from_array(payload.f32s::<4>()?);
            axes.push(Axis {
                name,
                translation,
                rotation,
            });
        }
        Ok(BlockData::Axes(AxisTable::new(axes)))
    }

    fn encode(&self, value: &BlockValue, out: &mut PayloadWriter) -> Result<()> {
        let BlockValue::Axes(axes) = value else {
            return Err(FormatError::ValueMismatch {
                tag: AXES_TAG,
                found: value.tag(),
            });
        };
        for axis in axes {
            out.put_fixed_string(&axis.name, NAME_SIZE)?;
            out.put_f32s(&axis.translation.to_array());
            out.put_f32s(&axis.rotation.to_array());
        }
        Ok(())
    }
}
