//! Tag registry
//!
//! Maps a 4-byte [`Tag`] to the [`BlockCodec`] that decodes and encodes its
//! payload. The dispatch path never enumerates known tags: adding a block
//! type means registering one more codec, and a tag with no codec decodes as
//! an opaque block instead of failing.
//!
//! # Adding a block type
//!
//! 1. Implement [`BlockCodec`] for a unit struct.
//! 2. Decode into [`BlockData::Custom`] and encode from [`BlockValue::Custom`]
//!    (or reuse a built-in variant).
//! 3. `registry.register(Arc::new(MyCodec))`.

use std::sync::{Arc, OnceLock};

use hashbrown::HashMap;

use crate::block::{Block, BlockData, BlockHeader};
use crate::codec::{PayloadReader, PayloadWriter};
use crate::error::{FormatError, Result};
use crate::formats;
use crate::tag::Tag;
use crate::writer::BlockValue;

/// Length rule a payload must satisfy before its decoder runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLayout {
    /// Any length is accepted.
    Any,
    /// At least this many bytes of fixed fields. Trailing bytes are ignored.
    Fixed(usize),
    /// A whole number of fixed-size records.
    Records { stride: usize },
    /// Fixed fields followed by a whole number of records.
    HeadAndRecords { head: usize, stride: usize },
    /// A whole number of table entries.
    Table { entry_size: usize },
}

impl PayloadLayout {
    /// Check `len` payload bytes starting at absolute offset `offset`.
    pub fn validate(&self, tag: Tag, len: usize, offset: u64) -> Result<()> {
        let truncated = |needed: usize| FormatError::TruncatedBuffer {
            offset,
            needed: needed as u64,
            available: len as u64,
        };

        match *self {
            PayloadLayout::Any => Ok(()),
            PayloadLayout::Fixed(size) if len < size => Err(truncated(size)),
            PayloadLayout::Fixed(_) => Ok(()),
            PayloadLayout::Records { stride } if len % stride != 0 => {
                Err(FormatError::MisalignedPayload { tag, len, stride })
            }
            PayloadLayout::Records { .. } => Ok(()),
            PayloadLayout::HeadAndRecords { head, .. } if len < head => Err(truncated(head)),
            PayloadLayout::HeadAndRecords { head, stride } if (len - head) % stride != 0 => {
                Err(FormatError::MisalignedPayload {
                    tag,
                    len: len - head,
                    stride,
                })
            }
            PayloadLayout::HeadAndRecords { .. } => Ok(()),
            PayloadLayout::Table { entry_size } if len % entry_size != 0 => {
                Err(FormatError::MalformedTable {
                    tag,
                    len,
                    entry_size,
                })
            }
            PayloadLayout::Table { .. } => Ok(()),
        }
    }
}

/// Decode and encode routines for one tag.
///
/// Decoders are pure: they only read their own payload and never resolve
/// offsets into other blocks.
pub trait BlockCodec: Send + Sync {
    /// Tag this codec handles.
    fn tag(&self) -> Tag;

    /// Length rule checked by the registry before [`decode`](Self::decode).
    fn layout(&self) -> PayloadLayout {
        PayloadLayout::Any
    }

    /// Decode a payload already validated against [`layout`](Self::layout).
    fn decode<'a>(&self, payload: PayloadReader<'a>) -> Result<BlockData<'a>>;

    /// Encode a structured value into payload bytes.
    ///
    /// Offset fields go through [`PayloadWriter::put_reference`].
    fn encode(&self, value: &BlockValue, out: &mut PayloadWriter) -> Result<()>;
}

/// Open tag → codec table.
#[derive(Clone, Default)]
pub struct Registry {
    codecs: HashMap<Tag, Arc<dyn BlockCodec>>,
}

impl Registry {
    /// Create an empty registry. Every block decodes as opaque.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in tag registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        formats::register_builtins(&mut registry);
        registry
    }

    /// Shared built-in registry, created on first use.
    pub fn shared() -> Arc<Registry> {
        static SHARED: OnceLock<Arc<Registry>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(Registry::with_builtins()))
            .clone()
    }

    /// Register a codec, returning the one it replaced for the same tag.
    pub fn register(&mut self, codec: Arc<dyn BlockCodec>) -> Option<Arc<dyn BlockCodec>> {
        self.codecs.insert(codec.tag(), codec)
    }

    pub fn get(&self, tag: Tag) -> Option<&dyn BlockCodec> {
        self.codecs.get(&tag).map(|codec| codec.as_ref())
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.codecs.contains_key(&tag)
    }

    /// All registered tags, sorted.
    pub fn tags(&self) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self.codecs.keys().copied().collect();
        tags.sort();
        tags
    }

    /// Decode the block starting at absolute `offset` in `buffer`.
    pub fn decode<'a>(&self, buffer: &'a [u8], offset: u64) -> Result<Block<'a>> {
        let header = BlockHeader::decode(buffer, offset)?;

        if header.byte_size < BlockHeader::SIZE as u64 {
            return Err(FormatError::UndersizedBlock {
                offset,
                byte_size: header.byte_size,
            });
        }

        // BlockHeader::decode guarantees offset + 12 <= buffer.len()
        let start = offset as usize;
        let available = (buffer.len() - start) as u64;
        if header.byte_size > available {
            return Err(FormatError::TruncatedBuffer {
                offset,
                needed: header.byte_size,
                available,
            });
        }

        let payload_offset = offset + BlockHeader::SIZE as u64;
        let payload = &buffer[start + BlockHeader::SIZE..start + header.byte_size as usize];

        let data = match self.codecs.get(&header.tag) {
            Some(codec) => {
                codec
                    .layout()
                    .validate(header.tag, payload.len(), payload_offset)?;
                codec.decode(PayloadReader::new(payload, payload_offset))?
            }
            None => {
                tracing::trace!(
                    "Opaque block {} ({} bytes) at offset {}",
                    header.tag,
                    header.byte_size,
                    offset
                );
                BlockData::Opaque
            }
        };

        Ok(Block {
            offset,
            tag: header.tag,
            byte_size: header.byte_size,
            payload,
            data,
        })
    }

    /// Encode a structured value into its tag and payload.
    pub fn encode(&self, value: &BlockValue) -> Result<(Tag, PayloadWriter)> {
        let mut out = PayloadWriter::new();

        if let BlockValue::Raw { tag, payload } = value {
            out.put_bytes(payload);
            return Ok((*tag, out));
        }

        let tag = value.tag();
        let codec = self.get(tag).ok_or(FormatError::UnknownTag(tag))?;
        codec.encode(value, &mut out)?;
        Ok((tag, out))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("tags", &self.tags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Custom;
    use crate::formats::INDEX16_TAG;

    const NOTE_TAG: Tag = Tag::from_bytes(*b"NOTE");

    #[derive(Debug, PartialEq)]
    struct Note {
        priority: u32,
    }

    struct NoteCodec;

    impl BlockCodec for NoteCodec {
        fn tag(&self) -> Tag {
            NOTE_TAG
        }

        fn layout(&self) -> PayloadLayout {
            PayloadLayout::Fixed(4)
        }

        fn decode<'a>(&self, mut payload: PayloadReader<'a>) -> Result<BlockData<'a>> {
            let priority = payload.u32()?;
            Ok(BlockData::Custom(Custom::new(NOTE_TAG, Note { priority })))
        }

        fn encode(&self, value: &BlockValue, out: &mut PayloadWriter) -> Result<()> {
            let note = match value {
                BlockValue::Custom(custom) => custom.downcast_ref::<Note>(),
                _ => None,
            }
            .ok_or(FormatError::ValueMismatch {
                tag: NOTE_TAG,
                found: value.tag(),
            })?;
            out.put_u32(note.priority);
            Ok(())
        }
    }

    fn block(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let header = BlockHeader::new(Tag::from_bytes(*tag), 12 + payload.len() as u64);
        let mut bytes = header.to_bytes().unwrap().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_builtins_registered() {
        let registry = Registry::with_builtins();
        for tag in [
            "HDR3", "#OFS", "MESH", "IN16", "IN32", "2000", "2400", "3000", "3300", "3320",
            "3324", "SKEL", "#AXE", "CAM4", "NODE", "#GEO", "EXRN",
        ] {
            assert!(registry.contains(Tag::new(tag).unwrap()), "missing {tag}");
        }
    }

    #[test]
    fn test_unknown_tag_is_opaque() {
        let registry = Registry::with_builtins();
        let bytes = block(b"ZZZZ", &[1, 2, 3]);

        let decoded = registry.decode(&bytes, 0).unwrap();
        assert!(decoded.is_opaque());
        assert_eq!(decoded.payload, &[1, 2, 3]);
        assert_eq!(decoded.byte_size, 15);
    }

    #[test]
    fn test_runtime_registration() {
        let mut registry = Registry::with_builtins();
        let bytes = block(b"NOTE", &7u32.to_le_bytes());
        assert!(registry.decode(&bytes, 0).unwrap().is_opaque());

        assert!(registry.register(Arc::new(NoteCodec)).is_none());
        let decoded = registry.decode(&bytes, 0).unwrap();
        let BlockData::Custom(custom) = &decoded.data else {
            panic!("expected custom data, got {:?}", decoded.data);
        };
        assert_eq!(custom.downcast_ref::<Note>(), Some(&Note { priority: 7 }));

        let value = BlockValue::Custom(Custom::new(NOTE_TAG, Note { priority: 7 }));
        let (tag, payload) = registry.encode(&value).unwrap();
        assert_eq!(tag, NOTE_TAG);
        assert_eq!(payload.into_parts().0, 7u32.to_le_bytes());
    }

    #[test]
    fn test_misaligned_rejected_before_decode() {
        let registry = Registry::with_builtins();
        let bytes = block(b"IN16", &[1, 0, 2]);
        assert_eq!(
            registry.decode(&bytes, 0).unwrap_err(),
            FormatError::MisalignedPayload {
                tag: INDEX16_TAG,
                len: 3,
                stride: 2
            }
        );
    }

    #[test]
    fn test_undersized_block() {
        let registry = Registry::with_builtins();
        let mut bytes = block(b"IN16", &[]);
        bytes[4] = 8;
        assert_eq!(
            registry.decode(&bytes, 0).unwrap_err(),
            FormatError::UndersizedBlock {
                offset: 0,
                byte_size: 8
            }
        );
    }

    #[test]
    fn test_declared_size_past_end() {
        let registry = Registry::with_builtins();
        let mut bytes = block(b"IN16", &[1, 0]);
        bytes[4] = 64;
        assert_eq!(
            registry.decode(&bytes, 0).unwrap_err(),
            FormatError::TruncatedBuffer {
                offset: 0,
                needed: 64,
                available: 14
            }
        );
    }

    #[test]
    fn test_encode_without_codec() {
        let registry = Registry::new();
        let value = BlockValue::Indices(crate::formats::IndexBuffer::U16(vec![1, 2]));
        assert_eq!(
            registry.encode(&value).unwrap_err(),
            FormatError::UnknownTag(INDEX16_TAG)
        );
    }

    #[test]
    fn test_layout_rules() {
        let tag = Tag::from_bytes(*b"TEST");
        assert!(PayloadLayout::Fixed(8).validate(tag, 10, 12).is_ok());
        assert!(matches!(
            PayloadLayout::Fixed(8).validate(tag, 4, 12),
            Err(FormatError::TruncatedBuffer { needed: 8, available: 4, .. })
        ));
        assert!(PayloadLayout::HeadAndRecords { head: 96, stride: 8 }
            .validate(tag, 112, 12)
            .is_ok());
        assert!(matches!(
            PayloadLayout::HeadAndRecords { head: 96, stride: 8 }.validate(tag, 100, 12),
            Err(FormatError::MisalignedPayload { len: 4, stride: 8, .. })
        ));
        assert!(matches!(
            PayloadLayout::Table { entry_size: 40 }.validate(tag, 81, 12),
            Err(FormatError::MalformedTable { len: 81, entry_size: 40, .. })
        ));
    }
}
