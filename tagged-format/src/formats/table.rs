//! Offset table block (`#OFS`)
//!
//! A directory of named offsets into the same buffer.
//!
//! # Layout
//! ```text
//! repeated 40-byte entries:
//! 0x00: name [u8; 32], NUL-padded ASCII
//! 0x20: offset u64
//! ```

use hashbrown::HashMap;

use crate::block::BlockData;
use crate::codec::{NAME_SIZE, OFFSET_SIZE, PayloadReader, PayloadWriter};
use crate::error::{FormatError, Result};
use crate::registry::{BlockCodec, PayloadLayout};
use crate::tag::Tag;
use crate::writer::{BlockValue, Reference};

pub const OFFSET_TABLE_TAG: Tag = Tag::from_bytes(*b"#OFS");

/// Size of one table entry in bytes
pub const ENTRY_SIZE: usize = NAME_SIZE + OFFSET_SIZE;

/// One directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedOffset<O = u64> {
    pub name: String,
    pub offset: O,
}

impl<O> NamedOffset<O> {
    pub fn new(name: impl Into<String>, offset: O) -> Self {
        Self {
            name: name.into(),
            offset,
        }
    }
}

/// Decoded offset table.
///
/// Entries keep their physical order. When a name appears more than once,
/// lookup returns the last entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetTable {
    entries: Vec<NamedOffset>,
    index: HashMap<String, u64>,
}

impl OffsetTable {
    pub fn new(entries: Vec<NamedOffset>) -> Self {
        let index = entries
            .iter()
            .map(|entry| (entry.name.clone(), entry.offset))
            .collect();
        Self { entries, index }
    }

    pub fn lookup(&self, name: &str) -> Result<u64> {
        self.get(name)
            .ok_or_else(|| FormatError::NameNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Every physical entry, duplicates included.
    pub fn entries(&self) -> &[NamedOffset] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct OffsetTableCodec;

impl BlockCodec for OffsetTableCodec {
    fn tag(&self) -> Tag {
        OFFSET_TABLE_TAG
    }

    fn layout(&self) -> PayloadLayout {
        PayloadLayout::Table {
            entry_size: ENTRY_SIZE,
        }
    }

    fn decode<'a>(&self, mut payload: PayloadReader<'a>) -> Result<BlockData<'a>> {
        let count = payload.remaining() / ENTRY_SIZE;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let name = payload.fixed_string(NAME_SIZE)?;
            let offset = payload.offset("table offset")?;
            entries.push(NamedOffset { name, offset });
        }
        Ok(BlockData::OffsetTable(OffsetTable::new(entries)))
    }

    fn encode(&self, value: &BlockValue, out: &mut PayloadWriter) -> Result<()> {
        let BlockValue::OffsetTable(entries) = value else {
            return Err(FormatError::ValueMismatch {
                tag: OFFSET_TABLE_TAG,
                found: value.tag(),
            });
        };
        for entry in entries {
            out.put_fixed_string(&entry.name, NAME_SIZE)?;
            out.put_reference(entry.offset);
        }
        Ok(())
    }
}

/// Build a table value with entries sorted by name.
pub fn sorted_entries(
    entries: impl IntoIterator<Item = (String, Reference)>,
) -> Vec<NamedOffset<Reference>> {
    let mut entries: Vec<NamedOffset<Reference>> = entries
        .into_iter()
        .map(|(name, offset)| NamedOffset { name, offset })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockHeader;
    use crate::registry::Registry;

    fn table_bytes(entries: &[(&str, u64)], trailing: usize) -> Vec<u8> {
        let payload_len = entries.len() * ENTRY_SIZE + trailing;
        let header = BlockHeader::new(OFFSET_TABLE_TAG, (BlockHeader::SIZE + payload_len) as u64);
        let mut bytes = header.to_bytes().unwrap().to_vec();
        for (name, offset) in entries {
            let mut raw = [0u8; NAME_SIZE];
            raw[..name.len()].copy_from_slice(name.as_bytes());
            bytes.extend_from_slice(&raw);
            bytes.extend_from_slice(&offset.to_le_bytes());
        }
        bytes.resize(BlockHeader::SIZE + payload_len, 0);
        bytes
    }

    fn decode_table(bytes: &[u8]) -> Result<OffsetTable> {
        match Registry::with_builtins().decode(bytes, 0)?.data {
            BlockData::OffsetTable(table) => Ok(table),
            other => panic!("expected offset table, got {other:?}"),
        }
    }

    #[test]
    fn test_lookup() {
        let table = decode_table(&table_bytes(&[("root", 64), ("skeleton", 512)], 0)).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("root").unwrap(), 64);
        assert_eq!(table.lookup("skeleton").unwrap(), 512);
        assert_eq!(
            table.lookup("missing"),
            Err(FormatError::NameNotFound("missing".to_string()))
        );
    }

    #[test]
    fn test_entry_count() {
        for n in 0..4 {
            let entries: Vec<(String, u64)> =
                (0..n).map(|i| (format!("entry{i}"), i as u64 * 8)).collect();
            let entries: Vec<(&str, u64)> =
                entries.iter().map(|(name, offset)| (name.as_str(), *offset)).collect();

            assert_eq!(decode_table(&table_bytes(&entries, 0)).unwrap().len(), n);
            for trailing in [1, 8, 39] {
                assert!(matches!(
                    decode_table(&table_bytes(&entries, trailing)),
                    Err(FormatError::MalformedTable { entry_size: 40, .. })
                ));
            }
        }
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let table = decode_table(&table_bytes(&[("mesh", 24), ("mesh", 96)], 0)).unwrap();
        assert_eq!(table.lookup("mesh").unwrap(), 96);
        assert_eq!(table.entries().len(), 2);
    }

    #[test]
    fn test_offset_magnitude_checked() {
        let mut bytes = table_bytes(&[("root", 64)], 0);
        // high word of the first entry's offset
        bytes[BlockHeader::SIZE + NAME_SIZE + 4] = 1;
        assert!(matches!(
            decode_table(&bytes),
            Err(FormatError::Range { .. })
        ));
    }

    #[test]
    fn test_full_width_name() {
        let name = "n".repeat(NAME_SIZE);
        let table = decode_table(&table_bytes(&[(name.as_str(), 12)], 0)).unwrap();
        assert_eq!(table.lookup(&name).unwrap(), 12);
    }

    #[test]
    fn test_sorted_entries() {
        let entries = sorted_entries([
            ("zeta".to_string(), Reference::Null),
            ("alpha".to_string(), Reference::Null),
        ]);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }
}
