//! Vertex array blocks (`2000`, `2400`, `3000`, `3300`, `3320`, `3324`)
//!
//! Packed interleaved records. The tag names the record format; the format's
//! attribute list and stride are static metadata looked up from the tag.
//!
//! # Record layouts
//! ```text
//! 2000: position f32x2                                         stride 8
//! 2400: position f32x2, color f32x4                            stride 24
//! 3000: position f32x3                                         stride 12
//! 3300: position f32x3, normal f32x3                           stride 24
//! 3320: position f32x3, normal f32x3, mapping f32x2            stride 32
//! 3324: ...3320, bones u8x4, weights f32x4                     stride 52
//! ```

use bytemuck::{Pod, Zeroable};

use crate::block::BlockData;
use crate::codec::{PayloadReader, PayloadWriter};
use crate::error::{FormatError, Result};
use crate::registry::{BlockCodec, PayloadLayout};
use crate::tag::Tag;
use crate::writer::BlockValue;

/// Scalar type of an attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Uint8,
    Uint16,
    Uint32,
    Float32,
}

impl DataType {
    /// Size of one component in bytes
    pub const fn size(self) -> usize {
        match self {
            DataType::Uint8 => 1,
            DataType::Uint16 => 2,
            DataType::Uint32 | DataType::Float32 => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DataType::Uint8 => "uint8",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Float32 => "float32",
        }
    }
}

/// One interleaved attribute of a vertex record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub name: &'static str,
    pub data_type: DataType,
    /// Number of components
    pub count: usize,
}

impl VertexAttribute {
    const fn new(name: &'static str, data_type: DataType, count: usize) -> Self {
        Self {
            name,
            data_type,
            count,
        }
    }

    pub const fn size(&self) -> usize {
        self.data_type.size() * self.count
    }
}

const POSITION2: VertexAttribute = VertexAttribute::new("position", DataType::Float32, 2);
const POSITION3: VertexAttribute = VertexAttribute::new("position", DataType::Float32, 3);
const COLOR4: VertexAttribute = VertexAttribute::new("color", DataType::Float32, 4);
const NORMAL3: VertexAttribute = VertexAttribute::new("normal", DataType::Float32, 3);
const MAPPING2: VertexAttribute = VertexAttribute::new("mapping", DataType::Float32, 2);
const BONES4: VertexAttribute = VertexAttribute::new("bones", DataType::Uint8, 4);
const WEIGHTS4: VertexAttribute = VertexAttribute::new("weights", DataType::Float32, 4);

/// Static description of a vertex record format.
#[derive(Debug, PartialEq, Eq)]
pub struct VertexFormat {
    pub tag: Tag,
    /// Keyword used by the text description
    pub name: &'static str,
    pub attributes: &'static [VertexAttribute],
}

impl VertexFormat {
    /// Record size in bytes
    pub const fn stride(&self) -> usize {
        let mut stride = 0;
        let mut i = 0;
        while i < self.attributes.len() {
            stride += self.attributes[i].size();
            i += 1;
        }
        stride
    }

    /// Number of f32 components per record, excluding byte attributes.
    pub fn float_count(&self) -> usize {
        self.attributes
            .iter()
            .filter(|attribute| attribute.data_type == DataType::Float32)
            .map(|attribute| attribute.count)
            .sum()
    }

    pub fn attribute(&self, name: &str) -> Option<&'static VertexAttribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    pub fn all() -> &'static [&'static VertexFormat] {
        &VERTEX_FORMATS
    }

    pub fn from_tag(tag: Tag) -> Option<&'static VertexFormat> {
        VERTEX_FORMATS.iter().copied().find(|format| format.tag == tag)
    }

    pub fn from_name(name: &str) -> Option<&'static VertexFormat> {
        VERTEX_FORMATS.iter().copied().find(|format| format.name == name)
    }
}

pub static VERTEX_P2: VertexFormat = VertexFormat {
    tag: Tag::from_bytes(*b"2000"),
    name: "vertex-p2",
    attributes: &[POSITION2],
};

pub static VERTEX_P2C4: VertexFormat = VertexFormat {
    tag: Tag::from_bytes(*b"2400"),
    name: "vertex-p2c4",
    attributes: &[POSITION2, COLOR4],
};

pub static VERTEX_P3: VertexFormat = VertexFormat {
    tag: Tag::from_bytes(*b"3000"),
    name: "vertex-p3",
    attributes: &[POSITION3],
};

pub static VERTEX_P3N3: VertexFormat = VertexFormat {
    tag: Tag::from_bytes(*b"3300"),
    name: "vertex-p3n3",
    attributes: &[POSITION3, NORMAL3],
};

pub static VERTEX_P3N3M2: VertexFormat = VertexFormat {
    tag: Tag::from_bytes(*b"3320"),
    name: "vertex-p3n3m2",
    attributes: &[POSITION3, NORMAL3, MAPPING2],
};

pub static VERTEX_P3N3M2B4: VertexFormat = VertexFormat {
    tag: Tag::from_bytes(*b"3324"),
    name: "vertex-p3n3m2b4",
    attributes: &[POSITION3, NORMAL3, MAPPING2, BONES4, WEIGHTS4],
};

static VERTEX_FORMATS: [&VertexFormat; 6] = [
    &VERTEX_P2,
    &VERTEX_P2C4,
    &VERTEX_P3,
    &VERTEX_P3N3,
    &VERTEX_P3N3M2,
    &VERTEX_P3N3M2B4,
];

/// A `#[repr(C)]` record type matching one [`VertexFormat`] byte for byte.
pub trait Vertex: Pod {
    fn format() -> &'static VertexFormat;
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VertexP2 {
    pub position: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VertexP2C4 {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VertexP3 {
    pub position: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VertexP3N3 {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VertexP3N3M2 {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub mapping: [f32; 2],
}

/// Skinned vertex: up to four bone indices with their weights.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct VertexP3N3M2B4 {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub mapping: [f32; 2],
    pub bones: [u8; 4],
    pub weights: [f32; 4],
}

impl Vertex for VertexP2 {
    fn format() -> &'static VertexFormat {
        &VERTEX_P2
    }
}

impl Vertex for VertexP2C4 {
    fn format() -> &'static VertexFormat {
        &VERTEX_P2C4
    }
}

impl Vertex for VertexP3 {
    fn format() -> &'static VertexFormat {
        &VERTEX_P3
    }
}

impl Vertex for VertexP3N3 {
    fn format() -> &'static VertexFormat {
        &VERTEX_P3N3
    }
}

impl Vertex for VertexP3N3M2 {
    fn format() -> &'static VertexFormat {
        &VERTEX_P3N3M2
    }
}

impl Vertex for VertexP3N3M2B4 {
    fn format() -> &'static VertexFormat {
        &VERTEX_P3N3M2B4
    }
}

/// Zero-copy view over a vertex payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexArray<'a> {
    format: &'static VertexFormat,
    bytes: &'a [u8],
}

impl<'a> VertexArray<'a> {
    /// Wrap `bytes`, which must be a whole number of records.
    pub fn new(format: &'static VertexFormat, bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() % format.stride() != 0 {
            return Err(FormatError::MisalignedPayload {
                tag: format.tag,
                len: bytes.len(),
                stride: format.stride(),
            });
        }
        Ok(Self { format, bytes })
    }

    pub fn format(&self) -> &'static VertexFormat {
        self.format
    }

    pub fn stride(&self) -> usize {
        self.format.stride()
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

    /// Raw bytes of one record.
    pub fn record(&self, index: usize) -> Option<&'a [u8]> {
        let stride = self.stride();
        self.bytes.get(index * stride..(index + 1) * stride)
    }

    /// Read one record as `V`. `None` if `V` is a different format or the
    /// index is out of range.
    pub fn get<V: Vertex>(&self, index: usize) -> Option<V> {
        if V::format() != self.format {
            return None;
        }
        self.record(index).map(read_vertex::<V>)
    }

    /// Iterate records as `V`, or `None` if `V` is a different format.
    pub fn iter<V: Vertex>(&self) -> Option<impl Iterator<Item = V> + use<'a, V>> {
        if V::format() != self.format {
            return None;
        }
        Some(self.bytes.chunks_exact(self.stride()).map(read_vertex::<V>))
    }

    /// Borrow the records directly when the payload is suitably aligned.
    pub fn cast<V: Vertex>(&self) -> Option<&'a [V]> {
        if V::format() != self.format || cfg!(target_endian = "big") {
            return None;
        }
        bytemuck::try_cast_slice(self.bytes).ok()
    }

    /// Copy out as an owned buffer of the same format.
    pub fn to_buffer(&self) -> VertexBuffer {
        VertexBuffer {
            format: self.format,
            data: self.bytes.to_vec(),
        }
    }
}

fn read_vertex<V: Vertex>(raw: &[u8]) -> V {
    if cfg!(target_endian = "big") {
        let mut swapped = raw.to_vec();
        swap_to_native(&mut swapped, V::format());
        bytemuck::pod_read_unaligned(&swapped)
    } else {
        bytemuck::pod_read_unaligned(raw)
    }
}

/// Byte-swap every multi-byte component of one record in place.
fn swap_to_native(record: &mut [u8], format: &VertexFormat) {
    let mut at = 0;
    for attribute in format.attributes {
        let size = attribute.data_type.size();
        for _ in 0..attribute.count {
            record[at..at + size].reverse();
            at += size;
        }
    }
}

/// Owned vertex records for building a buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexBuffer {
    format: &'static VertexFormat,
    data: Vec<u8>,
}

impl VertexBuffer {
    pub fn new(format: &'static VertexFormat) -> Self {
        Self {
            format,
            data: Vec::new(),
        }
    }

    /// Build from typed records.
    pub fn from_vertices<V: Vertex>(vertices: &[V]) -> Self {
        let mut buffer = Self::new(V::format());
        for vertex in vertices {
            buffer.append(vertex);
        }
        buffer
    }

    /// Append one typed record. `V` must be this buffer's format.
    pub fn push<V: Vertex>(&mut self, vertex: &V) -> Result<()> {
        if V::format() != self.format {
            return Err(FormatError::ValueMismatch {
                tag: self.format.tag,
                found: V::format().tag,
            });
        }
        self.append(vertex);
        Ok(())
    }

    fn append<V: Vertex>(&mut self, vertex: &V) {
        let start = self.data.len();
        self.data.extend_from_slice(bytemuck::bytes_of(vertex));
        if cfg!(target_endian = "big") {
            swap_to_native(&mut self.data[start..], self.format);
        }
    }

    /// Append one record from its components in attribute order.
    ///
    /// Integer attributes reject fractional and out-of-range values. Nothing
    /// is appended when any component fails.
    pub fn push_components(&mut self, values: &[f64]) -> Result<()> {
        let expected: usize = self.format.attributes.iter().map(|a| a.count).sum();
        if values.len() != expected {
            return Err(FormatError::ComponentCount {
                tag: self.format.tag,
                found: values.len(),
                expected,
            });
        }

        let mut record = Vec::with_capacity(self.format.stride());
        let mut values = values.iter().copied();
        for attribute in self.format.attributes {
            for value in values.by_ref().take(attribute.count) {
                match attribute.data_type {
                    DataType::Uint8 => record.push(self.integer(attribute, value)?),
                    DataType::Uint16 => record
                        .extend_from_slice(&self.integer::<u16>(attribute, value)?.to_le_bytes()),
                    DataType::Uint32 => record
                        .extend_from_slice(&self.integer::<u32>(attribute, value)?.to_le_bytes()),
                    DataType::Float32 => record.extend_from_slice(&(value as f32).to_le_bytes()),
                }
            }
        }
        self.data.extend_from_slice(&record);
        Ok(())
    }

    fn integer<T: TryFrom<u64>>(&self, attribute: &VertexAttribute, value: f64) -> Result<T> {
        let out_of_range = || FormatError::ComponentRange {
            tag: self.format.tag,
            attribute: attribute.name,
            data_type: attribute.data_type.name(),
            value: value.to_string(),
        };
        if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
            return Err(out_of_range());
        }
        T::try_from(value as u64).map_err(|_| out_of_range())
    }

    pub fn format(&self) -> &'static VertexFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.format.stride()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Codec for one vertex format; registered once per tag.
pub struct VertexCodec {
    format: &'static VertexFormat,
}

impl VertexCodec {
    pub fn new(format: &'static VertexFormat) -> Self {
        Self { format }
    }
}

impl BlockCodec for VertexCodec {
    fn tag(&self) -> Tag {
        self.format.tag
    }

    fn layout(&self) -> PayloadLayout {
        PayloadLayout::Records {
            stride: self.format.stride(),
        }
    }

    fn decode<'a>(&self, mut payload: PayloadReader<'a>) -> Result<BlockData<'a>> {
        Ok(BlockData::Vertices(VertexArray::new(self.format, payload.rest())?))
    }

    fn encode(&self, value: &BlockValue, out: &mut PayloadWriter) -> Result<()> {
        match value {
            BlockValue::Vertices(buffer) if buffer.format == self.format => {
                if buffer.data.len() % self.format.stride() != 0 {
                    return Err(FormatError::MisalignedPayload {
                        tag: self.format.tag,
                        len: buffer.data.len(),
                        stride: self.format.stride(),
                    });
                }
                out.put_bytes(&buffer.data);
                Ok(())
            }
            _ => Err(FormatError::ValueMismatch {
                tag: self.tag(),
                found: value.tag(),
            }),
        }
    }
}
