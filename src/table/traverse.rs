//! # Table Traversal Engine
//!
//! Visits every entry in a table's entry region exactly once, in storage
//! order, handing each decoded view to a caller-supplied visitor. Traversal
//! is read-only and is the only sanctioned way to locate an entry by handle:
//! handles are plain keys, never storage offsets.
//!
//! The engine guarantees forward progress on corrupt input: every parsed
//! entry advances the offset by at least the entry's minimum header size, and
//! any entry whose declared lengths would overrun the region aborts the walk
//! with `MalformedEntry` instead of reading out of bounds. The walk stops at
//! the zero pad preceding the checksum; fewer than [`PAD_ALIGNMENT`] leftover
//! bytes that are not all zero are trailing garbage and also abort.

use crate::error::{constants, BiosError, Result};
use crate::table::entry::TableEntry;
use crate::table::PAD_ALIGNMENT;

/// Visitor verdict after seeing one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Stop,
}

/// Walk `region` (entries + pad, checksum already stripped), invoking
/// `visitor` for each decoded entry.
pub fn traverse<'a, E, F>(region: &'a [u8], mut visitor: F) -> Result<()>
where
    E: TableEntry<'a>,
    F: FnMut(&E) -> Control,
{
    let mut offset = 0usize;
    while offset < region.len() {
        let remaining = region.len() - offset;
        if remaining < PAD_ALIGNMENT {
            // Pad is always shorter than the alignment, so a well-formed
            // region ends in fewer than PAD_ALIGNMENT zero bytes.
            if region[offset..].iter().all(|b| *b == 0) {
                return Ok(());
            }
            return Err(BiosError::malformed(
                offset,
                constants::ERR_TRAILING_GARBAGE,
            ));
        }
        let entry = E::parse(region, offset)?;
        let advance = entry.size();
        debug_assert!(advance > 0);
        match visitor(&entry) {
            Control::Continue => offset += advance,
            Control::Stop => return Ok(()),
        }
    }
    Ok(())
}

/// Locate the first entry whose handle matches.
pub fn find_by_handle<'a, E>(region: &'a [u8], handle: u16) -> Result<Option<E>>
where
    E: TableEntry<'a>,
{
    let mut offset = 0usize;
    while offset < region.len() {
        let remaining = region.len() - offset;
        if remaining < PAD_ALIGNMENT {
            if region[offset..].iter().all(|b| *b == 0) {
                return Ok(None);
            }
            return Err(BiosError::malformed(
                offset,
                constants::ERR_TRAILING_GARBAGE,
            ));
        }
        let entry = E::parse(region, offset)?;
        if entry.handle() == handle {
            return Ok(Some(entry));
        }
        offset += entry.size();
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::entry::{put_string_entry, StringEntry};

    fn sample_region() -> Vec<u8> {
        let mut buf = Vec::new();
        put_string_entry(&mut buf, 0, "HddBoot");
        put_string_entry(&mut buf, 1, "NetBoot");
        put_string_entry(&mut buf, 2, "UsbBoot");
        // pad as the sealed table would carry
        while buf.len() % PAD_ALIGNMENT != 0 {
            buf.push(0);
        }
        buf
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn visits_every_entry_in_order() {
        let region = sample_region();
        let mut seen = Vec::new();
        traverse::<StringEntry, _>(&region, |e| {
            seen.push((e.handle(), e.string_bytes().to_vec()));
            Control::Continue
        })
        .expect("clean region");
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1], (1, b"NetBoot".to_vec()));
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn stop_short_circuits() {
        let region = sample_region();
        let mut count = 0;
        traverse::<StringEntry, _>(&region, |_| {
            count += 1;
            Control::Stop
        })
        .expect("clean region");
        assert_eq!(count, 1);
    }

    #[test]
    fn truncated_entry_aborts() {
        let mut region = sample_region();
        region.truncate(region.len() - 6);
        let result = traverse::<StringEntry, _>(&region, |_| Control::Continue);
        assert!(matches!(result, Err(BiosError::MalformedEntry { .. })));
    }

    #[test]
    fn trailing_garbage_aborts() {
        let mut buf = Vec::new();
        put_string_entry(&mut buf, 0, "X");
        buf.extend_from_slice(&[0xff; 2]);
        let result = traverse::<StringEntry, _>(&buf, |_| Control::Continue);
        assert!(matches!(result, Err(BiosError::MalformedEntry { .. })));
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn find_by_handle_hits_and_misses() {
        let region = sample_region();
        let found = find_by_handle::<StringEntry>(&region, 2)
            .expect("clean region")
            .expect("handle exists");
        assert_eq!(found.string_bytes(), b"UsbBoot");
        assert!(find_by_handle::<StringEntry>(&region, 99)
            .expect("clean region")
            .is_none());
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn empty_region_is_fine() {
        traverse::<StringEntry, _>(&[], |_| Control::Continue).expect("empty");
        assert!(find_by_handle::<StringEntry>(&[], 0)
            .expect("empty")
            .is_none());
    }
}
