//! Error type shared by every decode and encode path.

use crate::tag::Tag;

/// Errors raised while decoding or encoding tagged blocks.
///
/// Decoding failures are local to the block being decoded: siblings decoded
/// earlier stay valid, but nothing is clamped or recovered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// Fewer bytes remain than a field declares it needs.
    #[error("buffer truncated at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedBuffer {
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// An 8-byte size or offset field holds a value wider than 32 bits.
    #[error("{field} value {value:#x} exceeds the supported 32-bit magnitude")]
    Range { field: &'static str, value: u64 },

    /// A block size that cannot be written into the 32-bit size field.
    #[error("block size {0} exceeds 2^32 - 1")]
    SizeOverflow(u64),

    /// Tags are at most 4 ASCII bytes.
    #[error("invalid tag {0:?}: tags are at most 4 ASCII bytes")]
    InvalidTag(String),

    /// The size field is smaller than the common block header.
    #[error("block at offset {offset} declares {byte_size} bytes, less than the 12 byte header")]
    UndersizedBlock { offset: u64, byte_size: u64 },

    /// A table payload ends with a partial entry.
    #[error("{tag} table payload of {len} bytes is not a multiple of {entry_size} byte entries")]
    MalformedTable {
        tag: Tag,
        len: usize,
        entry_size: usize,
    },

    /// An array payload is not a whole number of records.
    #[error("{tag} payload of {len} bytes is not a multiple of the {stride} byte stride")]
    MisalignedPayload { tag: Tag, len: usize, stride: usize },

    /// Lookup miss in an offset table or axis table.
    #[error("name {0:?} not found")]
    NameNotFound(String),

    /// A typed accessor found a different tag at the requested offset.
    #[error("expected {expected} block at offset {offset}, found {found}")]
    UnexpectedTag {
        expected: &'static str,
        found: Tag,
        offset: u64,
    },

    /// A fixed-width string does not fit its field.
    #[error("string {value:?} does not fit in {width} bytes")]
    StringTooLong { value: String, width: usize },

    /// A fixed-width string field holds non-ASCII bytes.
    #[error("string field at offset {offset} is not ASCII")]
    InvalidString { offset: u64 },

    /// A codec was handed a value belonging to another tag.
    #[error("{tag} codec cannot encode a {found} value")]
    ValueMismatch { tag: Tag, found: Tag },

    /// A vertex record was given the wrong number of components.
    #[error("{tag} record takes {expected} components, got {found}")]
    ComponentCount {
        tag: Tag,
        found: usize,
        expected: usize,
    },

    /// An integer vertex component is fractional or outside its type's range.
    #[error("{tag} {attribute} component {value} is not a valid {data_type}")]
    ComponentRange {
        tag: Tag,
        attribute: &'static str,
        data_type: &'static str,
        value: String,
    },

    /// No codec is registered to encode this tag.
    #[error("no codec registered for {0}")]
    UnknownTag(Tag),

    /// A reference does not belong to the description being written.
    #[error("reference to block #{0} does not exist in this description")]
    UnresolvedReference(usize),
}

/// Result type for tagged format operations
pub type Result<T> = std::result::Result<T, FormatError>;
