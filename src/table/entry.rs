//! # Table Entry Model
//!
//! Typed, non-copying views over single table entries, plus the matching
//! encoders. Field order and size rules for every entry layout live here and
//! nowhere else; the builder writes entries through the encoders and the
//! traversal engine skips them through the parsed views, so the two can
//! never disagree about a length.
//!
//! All multi-byte integers are little-endian.
//!
//! ## Layouts
//! String table entry: `handle:u16, length:u16, bytes[length]`
//!
//! Attribute table entry: `handle:u16, type:u8, name_handle:u16` then
//! - Enumeration: `num_possible:u8, possible:[u16;n], num_default:u8, default_indices:[u8;d]`
//! - String: `string_type:u8, min_len:u16, max_len:u16, def_len:u16, default[def_len]`
//! - Integer: `lower:u64, upper:u64, scalar_increment:u32, default:u64`
//!
//! Attribute-value table entry: `handle:u16, type:u8` then
//! - Enumeration: `num_current:u8, current_indices:[u8;n]`
//! - String: `current_len:u16, bytes[current_len]`
//! - Integer: `current:u64`

use bytes::BufMut;

use crate::error::{constants, BiosError, Result};
use crate::table::TableKind;

/// Attribute type tags as stored in the attribute and attribute-value
/// tables. Tag 2 belongs to the protocol's read-only enumeration family,
/// which this responder does not build; it decodes as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttributeType {
    Enumeration = 0,
    String = 1,
    Integer = 3,
}

impl AttributeType {
    /// Decode a type tag read from a table buffer.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(AttributeType::Enumeration),
            1 => Some(AttributeType::String),
            3 => Some(AttributeType::Integer),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

fn read_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

fn read_u64(buf: &[u8], off: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[off..off + 8]);
    u64::from_le_bytes(b)
}

/// One entry of a table, decodable from an offset into the table's entry
/// region. Implementations compute their own total length; the traversal
/// engine relies on `size()` to advance and on `parse` never reading past
/// the region.
pub trait TableEntry<'a>: Sized {
    const KIND: TableKind;

    /// Decode the entry starting at `offset`. Fails with `MalformedEntry`
    /// when declared variable-length counts would overrun the region, or
    /// the type tag is unrecognized.
    fn parse(region: &'a [u8], offset: usize) -> Result<Self>;

    /// Total entry length, header plus variable payload.
    fn size(&self) -> usize;

    /// The entry's own handle (string handle or attribute handle).
    fn handle(&self) -> u16;
}

fn truncated(offset: usize) -> BiosError {
    BiosError::malformed(offset, constants::ERR_TRUNCATED_ENTRY)
}

// ---------------------------------------------------------------------------
// String table
// ---------------------------------------------------------------------------

/// View over one string table entry.
#[derive(Debug, Clone, Copy)]
pub struct StringEntry<'a> {
    data: &'a [u8],
}

impl<'a> StringEntry<'a> {
    const HEADER: usize = 4;

    pub fn string_bytes(&self) -> &'a [u8] {
        &self.data[Self::HEADER..]
    }
}

impl<'a> TableEntry<'a> for StringEntry<'a> {
    const KIND: TableKind = TableKind::String;

    fn parse(region: &'a [u8], offset: usize) -> Result<Self> {
        let avail = region.len().saturating_sub(offset);
        if avail < Self::HEADER {
            return Err(truncated(offset));
        }
        let buf = &region[offset..];
        let length = read_u16(buf, 2) as usize;
        let total = Self::HEADER + length;
        if total > avail {
            return Err(truncated(offset));
        }
        Ok(StringEntry {
            data: &buf[..total],
        })
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn handle(&self) -> u16 {
        read_u16(self.data, 0)
    }
}

// ---------------------------------------------------------------------------
// Attribute table
// ---------------------------------------------------------------------------

/// Fixed-size ordered list of possible-value string handles inside an
/// enumeration attribute entry.
#[derive(Debug, Clone, Copy)]
pub struct PossibleValues<'a> {
    raw: &'a [u8],
}

impl<'a> PossibleValues<'a> {
    pub fn len(&self) -> usize {
        self.raw.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u16> {
        if index < self.len() {
            Some(read_u16(self.raw, index * 2))
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + 'a {
        self.raw.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]))
    }
}

/// Type-specific fields of an attribute table entry.
#[derive(Debug, Clone, Copy)]
pub enum AttributeFields<'a> {
    Enumeration {
        possible: PossibleValues<'a>,
        /// Indices into `possible` selecting the default value(s).
        default_indices: &'a [u8],
    },
    String {
        string_type: u8,
        min_len: u16,
        max_len: u16,
        default: &'a [u8],
    },
    Integer {
        lower: u64,
        upper: u64,
        scalar_increment: u32,
        default: u64,
    },
}

/// View over one attribute table entry.
#[derive(Debug, Clone, Copy)]
pub struct AttributeEntry<'a> {
    data: &'a [u8],
    ty: AttributeType,
}

impl<'a> AttributeEntry<'a> {
    const HEADER: usize = 5;

    pub fn ty(&self) -> AttributeType {
        self.ty
    }

    /// String-table handle of the attribute's name.
    pub fn name_handle(&self) -> u16 {
        read_u16(self.data, 3)
    }

    pub fn fields(&self) -> AttributeFields<'a> {
        match self.ty {
            AttributeType::Enumeration => {
                let n = self.data[5] as usize;
                let possible = PossibleValues {
                    raw: &self.data[6..6 + 2 * n],
                };
                let d = self.data[6 + 2 * n] as usize;
                AttributeFields::Enumeration {
                    possible,
                    default_indices: &self.data[7 + 2 * n..7 + 2 * n + d],
                }
            }
            AttributeType::String => AttributeFields::String {
                string_type: self.data[5],
                min_len: read_u16(self.data, 6),
                max_len: read_u16(self.data, 8),
                default: &self.data[12..],
            },
            AttributeType::Integer => AttributeFields::Integer {
                lower: read_u64(self.data, 5),
                upper: read_u64(self.data, 13),
                scalar_increment: read_u32(self.data, 21),
                default: read_u64(self.data, 25),
            },
        }
    }
}

impl<'a> TableEntry<'a> for AttributeEntry<'a> {
    const KIND: TableKind = TableKind::Attribute;

    fn parse(region: &'a [u8], offset: usize) -> Result<Self> {
        let avail = region.len().saturating_sub(offset);
        if avail < Self::HEADER {
            return Err(truncated(offset));
        }
        let buf = &region[offset..];
        let ty = AttributeType::from_tag(buf[2]).ok_or(BiosError::UnknownAttributeType(buf[2]))?;
        let total = match ty {
            AttributeType::Enumeration => {
                if avail < 6 {
                    return Err(truncated(offset));
                }
                let n = buf[5] as usize;
                // num_default sits after the possible-value handles
                if avail < 7 + 2 * n {
                    return Err(truncated(offset));
                }
                let d = buf[6 + 2 * n] as usize;
                7 + 2 * n + d
            }
            AttributeType::String => {
                if avail < 12 {
                    return Err(truncated(offset));
                }
                12 + read_u16(buf, 10) as usize
            }
            AttributeType::Integer => 33,
        };
        if total > avail {
            return Err(truncated(offset));
        }
        Ok(AttributeEntry {
            data: &buf[..total],
            ty,
        })
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn handle(&self) -> u16 {
        read_u16(self.data, 0)
    }
}

// ---------------------------------------------------------------------------
// Attribute-value table
// ---------------------------------------------------------------------------

/// Type-specific current-value payload of an attribute-value entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuePayload<'a> {
    /// Indices into the attribute's possible-value list.
    Enumeration(&'a [u8]),
    String(&'a [u8]),
    Integer(u64),
}

/// View over one attribute-value table entry.
#[derive(Debug, Clone, Copy)]
pub struct AttributeValueEntry<'a> {
    data: &'a [u8],
    ty: AttributeType,
}

impl<'a> AttributeValueEntry<'a> {
    const HEADER: usize = 3;

    pub fn ty(&self) -> AttributeType {
        self.ty
    }

    pub fn payload(&self) -> ValuePayload<'a> {
        match self.ty {
            AttributeType::Enumeration => ValuePayload::Enumeration(&self.data[4..]),
            AttributeType::String => ValuePayload::String(&self.data[5..]),
            AttributeType::Integer => ValuePayload::Integer(read_u64(self.data, 3)),
        }
    }

    /// The raw entry bytes, exactly as stored in the table. This is also the
    /// wire form carried by the get/set attribute-value commands.
    pub fn raw(&self) -> &'a [u8] {
        self.data
    }
}

impl<'a> TableEntry<'a> for AttributeValueEntry<'a> {
    const KIND: TableKind = TableKind::AttributeValue;

    fn parse(region: &'a [u8], offset: usize) -> Result<Self> {
        let avail = region.len().saturating_sub(offset);
        if avail < Self::HEADER {
            return Err(truncated(offset));
        }
        let buf = &region[offset..];
        let ty = AttributeType::from_tag(buf[2]).ok_or(BiosError::UnknownAttributeType(buf[2]))?;
        let total = match ty {
            AttributeType::Enumeration => {
                if avail < 4 {
                    return Err(truncated(offset));
                }
                4 + buf[3] as usize
            }
            AttributeType::String => {
                if avail < 5 {
                    return Err(truncated(offset));
                }
                5 + read_u16(buf, 3) as usize
            }
            AttributeType::Integer => 11,
        };
        if total > avail {
            return Err(truncated(offset));
        }
        Ok(AttributeValueEntry {
            data: &buf[..total],
            ty,
        })
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn handle(&self) -> u16 {
        read_u16(self.data, 0)
    }
}

// ---------------------------------------------------------------------------
// Encoders
// ---------------------------------------------------------------------------

/// Append a string table entry.
pub fn put_string_entry(out: &mut Vec<u8>, handle: u16, text: &str) {
    out.put_u16_le(handle);
    out.put_u16_le(text.len() as u16);
    out.put_slice(text.as_bytes());
}

/// Append an enumeration attribute entry.
pub fn put_enum_attribute(
    out: &mut Vec<u8>,
    handle: u16,
    name_handle: u16,
    possible: &[u16],
    default_indices: &[u8],
) {
    out.put_u16_le(handle);
    out.put_u8(AttributeType::Enumeration.tag());
    out.put_u16_le(name_handle);
    out.put_u8(possible.len() as u8);
    for h in possible {
        out.put_u16_le(*h);
    }
    out.put_u8(default_indices.len() as u8);
    out.put_slice(default_indices);
}

/// Append a string attribute entry.
pub fn put_string_attribute(
    out: &mut Vec<u8>,
    handle: u16,
    name_handle: u16,
    string_type: u8,
    min_len: u16,
    max_len: u16,
    default: &[u8],
) {
    out.put_u16_le(handle);
    out.put_u8(AttributeType::String.tag());
    out.put_u16_le(name_handle);
    out.put_u8(string_type);
    out.put_u16_le(min_len);
    out.put_u16_le(max_len);
    out.put_u16_le(default.len() as u16);
    out.put_slice(default);
}

/// Append an integer attribute entry.
#[allow(clippy::too_many_arguments)]
pub fn put_integer_attribute(
    out: &mut Vec<u8>,
    handle: u16,
    name_handle: u16,
    lower: u64,
    upper: u64,
    scalar_increment: u32,
    default: u64,
) {
    out.put_u16_le(handle);
    out.put_u8(AttributeType::Integer.tag());
    out.put_u16_le(name_handle);
    out.put_u64_le(lower);
    out.put_u64_le(upper);
    out.put_u32_le(scalar_increment);
    out.put_u64_le(default);
}

/// Append an enumeration attribute-value entry.
pub fn put_enum_value(out: &mut Vec<u8>, handle: u16, current_indices: &[u8]) {
    out.put_u16_le(handle);
    out.put_u8(AttributeType::Enumeration.tag());
    out.put_u8(current_indices.len() as u8);
    out.put_slice(current_indices);
}

/// Append a string attribute-value entry.
pub fn put_string_value(out: &mut Vec<u8>, handle: u16, current: &[u8]) {
    out.put_u16_le(handle);
    out.put_u8(AttributeType::String.tag());
    out.put_u16_le(current.len() as u16);
    out.put_slice(current);
}

/// Append an integer attribute-value entry.
pub fn put_integer_value(out: &mut Vec<u8>, handle: u16, current: u64) {
    out.put_u16_le(handle);
    out.put_u8(AttributeType::Integer.tag());
    out.put_u64_le(current);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::expect_used)]
    fn string_entry_round_trip() {
        let mut buf = Vec::new();
        put_string_entry(&mut buf, 7, "OptimizedBoot");
        let entry = StringEntry::parse(&buf, 0).expect("parses");
        assert_eq!(entry.handle(), 7);
        assert_eq!(entry.string_bytes(), b"OptimizedBoot");
        assert_eq!(entry.size(), buf.len());
    }

    #[test]
    fn string_entry_truncated() {
        let mut buf = Vec::new();
        put_string_entry(&mut buf, 7, "OptimizedBoot");
        buf.truncate(buf.len() - 1);
        assert!(matches!(
            StringEntry::parse(&buf, 0),
            Err(BiosError::MalformedEntry { .. })
        ));
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn enum_attribute_round_trip() {
        let mut buf = Vec::new();
        put_enum_attribute(&mut buf, 2, 9, &[4, 5, 6], &[1]);
        let entry = AttributeEntry::parse(&buf, 0).expect("parses");
        assert_eq!(entry.handle(), 2);
        assert_eq!(entry.ty(), AttributeType::Enumeration);
        assert_eq!(entry.name_handle(), 9);
        match entry.fields() {
            AttributeFields::Enumeration {
                possible,
                default_indices,
            } => {
                assert_eq!(possible.len(), 3);
                assert_eq!(possible.get(0), Some(4));
                assert_eq!(possible.get(2), Some(6));
                assert_eq!(possible.get(3), None);
                assert_eq!(possible.iter().collect::<Vec<_>>(), vec![4, 5, 6]);
                assert_eq!(default_indices, &[1]);
            }
            other => panic!("wrong fields: {other:?}"),
        }
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn string_attribute_round_trip() {
        let mut buf = Vec::new();
        put_string_attribute(&mut buf, 1, 3, 1, 2, 64, b"bmc-host");
        let entry = AttributeEntry::parse(&buf, 0).expect("parses");
        match entry.fields() {
            AttributeFields::String {
                string_type,
                min_len,
                max_len,
                default,
            } => {
                assert_eq!(string_type, 1);
                assert_eq!(min_len, 2);
                assert_eq!(max_len, 64);
                assert_eq!(default, b"bmc-host");
            }
            other => panic!("wrong fields: {other:?}"),
        }
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn integer_attribute_round_trip() {
        let mut buf = Vec::new();
        put_integer_attribute(&mut buf, 5, 0, 10, 1000, 5, 500);
        let entry = AttributeEntry::parse(&buf, 0).expect("parses");
        assert_eq!(entry.size(), 33);
        match entry.fields() {
            AttributeFields::Integer {
                lower,
                upper,
                scalar_increment,
                default,
            } => {
                assert_eq!((lower, upper, scalar_increment, default), (10, 1000, 5, 500));
            }
            other => panic!("wrong fields: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_tag_rejected() {
        // handle=0, type tag 2 (read-only family, not built here)
        let buf = [0u8, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            AttributeEntry::parse(&buf, 0),
            Err(BiosError::UnknownAttributeType(2))
        ));
        assert!(matches!(
            AttributeValueEntry::parse(&buf, 0),
            Err(BiosError::UnknownAttributeType(2))
        ));
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn value_entries_round_trip() {
        let mut buf = Vec::new();
        put_enum_value(&mut buf, 2, &[1]);
        let start = buf.len();
        put_string_value(&mut buf, 3, b"abc");
        let mid = buf.len();
        put_integer_value(&mut buf, 4, 42);

        let e = AttributeValueEntry::parse(&buf, 0).expect("enum");
        assert_eq!(e.payload(), ValuePayload::Enumeration(&[1]));
        let s = AttributeValueEntry::parse(&buf, start).expect("string");
        assert_eq!(s.payload(), ValuePayload::String(b"abc"));
        let i = AttributeValueEntry::parse(&buf, mid).expect("integer");
        assert_eq!(i.handle(), 4);
        assert_eq!(i.payload(), ValuePayload::Integer(42));
    }

    #[test]
    fn enum_attribute_count_overrun_rejected() {
        // claims 200 possible values in a 10-byte buffer
        let buf = [1u8, 0, 0, 0, 0, 200, 0, 0, 0, 0];
        assert!(matches!(
            AttributeEntry::parse(&buf, 0),
            Err(BiosError::MalformedEntry { .. })
        ));
    }
}
