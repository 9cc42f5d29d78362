//! Tagged block container format
//!
//! A buffer is a sequence of self-describing blocks. Every block starts with
//! a 4-byte ASCII tag and an 8-byte total size, followed by a tag-specific
//! payload. Blocks point at each other through absolute offsets; the header
//! block at offset 0 names the entry point.
//!
//! # Modules
//!
//! - [`codec`] - Field primitives: magnitude guard, fixed strings, payload cursor
//! - [`block`] - Common block header and decoded blocks
//! - [`registry`] - Open tag → codec table
//! - [`formats`] - Built-in block formats
//! - [`reader`] - Decoding over a loaded buffer
//! - [`writer`] - Building buffers from structured descriptions
//!
//! # Example
//!
//! ```
//! use tagged_format::{BlockValue, Description, IndexBuffer, NamedOffset, load, build};
//!
//! let mut description = Description::new();
//! let indices = description.add(BlockValue::Indices(IndexBuffer::U16(vec![0, 1, 2])));
//! let table = description.add(BlockValue::OffsetTable(vec![NamedOffset::new("indices", indices.into())]));
//! description.set_top(table);
//!
//! let bytes = build(&description).unwrap();
//! let reader = load(bytes).unwrap();
//! let block = reader.named("indices").unwrap();
//! assert_eq!(block.tag.to_string(), "IN16");
//! ```

pub mod block;
pub mod codec;
pub mod error;
pub mod formats;
pub mod reader;
pub mod registry;
pub mod tag;
pub mod writer;

pub use block::{Block, BlockData, BlockHeader, Custom, encode_header};
pub use error::{FormatError, Result};
pub use formats::*;
pub use reader::{Blocks, Reader, load};
pub use registry::{BlockCodec, PayloadLayout, Registry};
pub use tag::Tag;
pub use writer::{BlockId, BlockValue, Description, Reference, Writer, build};
