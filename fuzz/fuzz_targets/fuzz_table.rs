#![no_main]

use libfuzzer_sys::fuzz_target;
use pldm_bios::table::entry::{AttributeEntry, AttributeValueEntry, StringEntry};
use pldm_bios::table::traverse::{traverse, Control};
use pldm_bios::table::{validate, TableKind};

fuzz_target!(|data: &[u8]| {
    // Fuzz table validation and traversal - test for panics, out-of-bounds
    // reads, infinite loops
    let _ = validate(TableKind::Attribute, data);
    let _ = traverse::<StringEntry, _>(data, |_| Control::Continue);
    let _ = traverse::<AttributeEntry, _>(data, |_| Control::Continue);
    let _ = traverse::<AttributeValueEntry, _>(data, |_| Control::Continue);
});
