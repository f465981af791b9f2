//! # Attribute Accessor
//!
//! Get and set of a single attribute's current value, identified by handle.
//! Gets combine two traversals: the attribute table supplies the declared
//! type, the value table the live payload. Sets validate the incoming value
//! against the attribute entry's authoritative constraints before any byte
//! of the value table changes, then rebuild the table as a whole: decode
//! every entry, swap the matching one, re-encode, re-seal. Entry offsets are
//! never cached, so a size-changing update only costs the re-encode.

use crate::error::{BiosError, Result};
use crate::table::entry::{
    AttributeEntry, AttributeFields, AttributeValueEntry, TableEntry, ValuePayload,
};
use crate::table::traverse::{find_by_handle, traverse, Control};
use crate::table::seal;

/// Look up the current-value entry for `handle`.
///
/// Returns the decoded value view, whose `raw()` bytes are also the wire
/// form of the get-current-value response payload.
pub fn get_current_value<'a>(
    attr_region: &[u8],
    value_region: &'a [u8],
    handle: u16,
) -> Result<AttributeValueEntry<'a>> {
    let attr = find_by_handle::<AttributeEntry>(attr_region, handle)?
        .ok_or(BiosError::AttributeHandleNotFound(handle))?;
    let value = find_by_handle::<AttributeValueEntry>(value_region, handle)?
        .ok_or(BiosError::ValueEntryMissing(handle))?;
    if value.ty() != attr.ty() {
        // Cross-table type divergence is corruption, not a caller error.
        return Err(BiosError::malformed(
            0,
            format!(
                "value entry for handle {handle} is {:?} but attribute declares {:?}",
                value.ty(),
                attr.ty()
            ),
        ));
    }
    Ok(value)
}

/// Apply a validated current-value update and return the re-sealed value
/// table. `new_entry` is the raw attribute-value entry from the request; it
/// must decode cleanly, match an existing attribute's handle and type, and
/// satisfy that attribute's constraints. The input regions are untouched on
/// every error path.
pub fn set_current_value(
    attr_region: &[u8],
    value_region: &[u8],
    new_entry: &[u8],
) -> Result<Vec<u8>> {
    let candidate = AttributeValueEntry::parse(new_entry, 0)?;
    if candidate.size() != new_entry.len() {
        return Err(BiosError::InvalidLength {
            expected: candidate.size(),
            got: new_entry.len(),
        });
    }
    let handle = candidate.handle();
    let attr = find_by_handle::<AttributeEntry>(attr_region, handle)?
        .ok_or(BiosError::AttributeHandleNotFound(handle))?;
    if candidate.ty() != attr.ty() {
        return Err(BiosError::TypeMismatch {
            expected: attr.ty(),
            got: candidate.ty(),
        });
    }
    validate_against(&attr, &candidate)?;

    // Decode the whole table, swap the matching entry, re-encode.
    let mut entries: Vec<Vec<u8>> = Vec::new();
    let mut replaced = false;
    traverse::<AttributeValueEntry, _>(value_region, |e| {
        if e.handle() == handle {
            entries.push(new_entry.to_vec());
            replaced = true;
        } else {
            entries.push(e.raw().to_vec());
        }
        Control::Continue
    })?;
    if !replaced {
        return Err(BiosError::ValueEntryMissing(handle));
    }
    Ok(seal(entries.concat()))
}

/// Validate a candidate value against the attribute entry's constraints.
fn validate_against(attr: &AttributeEntry<'_>, candidate: &AttributeValueEntry<'_>) -> Result<()> {
    match (attr.fields(), candidate.payload()) {
        (AttributeFields::Enumeration { possible, .. }, ValuePayload::Enumeration(indices)) => {
            if indices.is_empty() {
                return Err(BiosError::malformed(0, "enumeration value with no index"));
            }
            let count = possible.len() as u8;
            for index in indices {
                if *index as usize >= possible.len() {
                    return Err(BiosError::InvalidEnumerationIndex {
                        index: *index,
                        count,
                    });
                }
            }
            Ok(())
        }
        (
            AttributeFields::String {
                min_len, max_len, ..
            },
            ValuePayload::String(bytes),
        ) => {
            let len = bytes.len() as u16;
            if len < min_len || len > max_len {
                return Err(BiosError::StringLengthOutOfRange {
                    len,
                    min: min_len,
                    max: max_len,
                });
            }
            Ok(())
        }
        (
            AttributeFields::Integer {
                lower,
                upper,
                scalar_increment,
                ..
            },
            ValuePayload::Integer(value),
        ) => {
            let in_range = value >= lower && value <= upper;
            let aligned = in_range
                && scalar_increment > 0
                && (value - lower) % u64::from(scalar_increment) == 0;
            if !aligned {
                return Err(BiosError::ValueOutOfRange {
                    value,
                    lower,
                    upper,
                });
            }
            Ok(())
        }
        // Type equality was checked before validation.
        _ => Err(BiosError::TypeMismatch {
            expected: attr.ty(),
            got: candidate.ty(),
        }),
    }
}
