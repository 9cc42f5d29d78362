//! External reference block (`EXRN`)
//!
//! A NUL-terminated ASCII URL naming data stored outside the buffer.

use crate::block::BlockData;
use crate::codec::{PayloadReader, PayloadWriter, decode_fixed_string};
use crate::error::{FormatError, Result};
use crate::registry::BlockCodec;
use crate::tag::Tag;
use crate::writer::BlockValue;

pub const EXTERNAL_TAG: Tag = Tag::from_bytes(*b"EXRN");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct External {
    pub url: String,
}

impl External {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

pub struct ExternalCodec;

impl BlockCodec for ExternalCodec {
    fn tag(&self) -> Tag {
        EXTERNAL_TAG
    }

    fn decode<'a>(&self, mut payload: PayloadReader<'a>) -> Result<BlockData<'a>> {
        let offset = payload.position();
        let url = decode_fixed_string(payload.rest(), offset)?;
        Ok(BlockData::External(External { url }))
    }

    fn encode(&self, value: &BlockValue, out: &mut PayloadWriter) -> Result<()> {
        let BlockValue::External(external) = value else {
            return Err(FormatError::ValueMismatch {
                tag: EXTERNAL_TAG,
                found: value.tag(),
            });
        };
        out.put_fixed_string(&external.url, external.url.len() + 1)
    }
}
