//! # BIOS Tables
//!
//! The three persisted binary BIOS tables and the machinery around them.
//!
//! ## Components
//! - **Entry model** (`entry`): typed views over single variable-length
//!   entries; the single source of truth for field order and size rules
//! - **Traversal** (`traverse`): visitor-based iteration with bounds and
//!   forward-progress guarantees
//! - **Builder** (`builder`): deterministic construction of all three tables
//!   from attribute definitions
//! - **Accessor** (`accessor`): get/set of a single attribute's current value
//!
//! ## On-disk format
//! Each table is a sequence of variable-length entries, padded with zero
//! bytes to a 4-byte boundary, followed by a 32-bit CRC over the entry+pad
//! region, little-endian, appended last. A table whose CRC does not verify
//! is treated as absent and rebuilt from definitions.

pub mod accessor;
pub mod builder;
pub mod entry;
pub mod traverse;

use std::fmt;

use crate::error::{constants, BiosError, Result};

/// Width of the trailing table checksum.
pub const CHECKSUM_SIZE: usize = 4;

/// Entry regions are padded with zeros to this alignment before the checksum.
pub const PAD_ALIGNMENT: usize = 4;

/// The three table kinds, with their on-wire type selector values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TableKind {
    String = 0,
    Attribute = 1,
    AttributeValue = 2,
}

impl TableKind {
    /// Decode the wire table-type selector.
    pub fn from_type_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(TableKind::String),
            1 => Some(TableKind::Attribute),
            2 => Some(TableKind::AttributeValue),
            _ => None,
        }
    }

    /// Persistence file name for this table kind.
    pub fn file_name(self) -> &'static str {
        match self {
            TableKind::String => "string_table",
            TableKind::Attribute => "attribute_table",
            TableKind::AttributeValue => "attribute_value_table",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::String => write!(f, "string"),
            TableKind::Attribute => write!(f, "attribute"),
            TableKind::AttributeValue => write!(f, "attribute-value"),
        }
    }
}

/// Checksum over a table's entry+pad region.
pub fn checksum(region: &[u8]) -> u32 {
    crc32fast::hash(region)
}

/// Pad an entry region to [`PAD_ALIGNMENT`] and append the checksum,
/// producing the final persistable table buffer.
pub fn seal(mut entries: Vec<u8>) -> Vec<u8> {
    let pad = (PAD_ALIGNMENT - entries.len() % PAD_ALIGNMENT) % PAD_ALIGNMENT;
    entries.extend(std::iter::repeat(0u8).take(pad));
    let sum = checksum(&entries);
    entries.extend_from_slice(&sum.to_le_bytes());
    entries
}

/// Verify a sealed table buffer and return its entry+pad region.
///
/// Fails with [`BiosError::ChecksumMismatch`] when the trailing CRC does not
/// cover the region; callers treat that as "table absent" and rebuild.
pub fn validate(kind: TableKind, table: &[u8]) -> Result<&[u8]> {
    if table.len() < CHECKSUM_SIZE {
        return Err(BiosError::malformed(0, constants::ERR_TABLE_TOO_SHORT));
    }
    let (region, tail) = table.split_at(table.len() - CHECKSUM_SIZE);
    let stored = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
    if stored != checksum(region) {
        return Err(BiosError::ChecksumMismatch(kind));
    }
    Ok(region)
}
