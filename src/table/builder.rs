//! # Table Builder
//!
//! Turns an ordered sequence of attribute definitions into the three sealed
//! binary tables. Construction is two-pass: the first pass interns every
//! distinct label and possible-value string into the string table in
//! first-seen order, assigning sequential string handles; the second pass
//! assigns sequential attribute handles and serializes one attribute entry
//! and one matching attribute-value entry (initialized to the declared
//! default) per definition. Handle assignment is order-stable, so building
//! twice from the same definitions yields byte-identical tables.

use std::collections::HashMap;

use tracing::info;

use crate::definitions::{AttributeDefinition, DefinitionKind};
use crate::error::{BiosError, Result};
use crate::storage::TableStore;
use crate::table::entry;
use crate::table::{seal, TableKind};

/// The three sealed tables produced by one build pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTables {
    pub string_table: Vec<u8>,
    pub attribute_table: Vec<u8>,
    pub value_table: Vec<u8>,
}

/// First-seen-order string interner backing string handle assignment.
struct StringInterner {
    handles: HashMap<String, u16>,
    buffer: Vec<u8>,
}

impl StringInterner {
    fn new() -> Self {
        StringInterner {
            handles: HashMap::new(),
            buffer: Vec::new(),
        }
    }

    fn intern(&mut self, text: &str) -> u16 {
        if let Some(handle) = self.handles.get(text) {
            return *handle;
        }
        let handle = self.handles.len() as u16;
        entry::put_string_entry(&mut self.buffer, handle, text);
        self.handles.insert(text.to_string(), handle);
        handle
    }
}

/// Build all three tables from validated definitions.
///
/// Fails with `InvalidDefinition` if any definition's default violates its
/// own constraints; the whole build fails, never a partial table set.
pub fn build_tables(definitions: &[AttributeDefinition]) -> Result<BuiltTables> {
    for def in definitions {
        def.validate()?;
    }

    let mut strings = StringInterner::new();
    // Pass 1: intern names and possible values in definition order.
    for def in definitions {
        strings.intern(&def.name);
        if let DefinitionKind::Enumeration {
            possible_values, ..
        } = &def.kind
        {
            for pv in possible_values {
                strings.intern(pv);
            }
        }
    }

    // Pass 2: serialize attribute and value entries with sequential handles.
    let mut attrs = Vec::new();
    let mut values = Vec::new();
    for (index, def) in definitions.iter().enumerate() {
        let handle = index as u16;
        let name_handle = strings.intern(&def.name);
        match &def.kind {
            DefinitionKind::Enumeration {
                possible_values,
                default_values,
            } => {
                let possible: Vec<u16> =
                    possible_values.iter().map(|pv| strings.intern(pv)).collect();
                let default_indices = resolve_default_indices(def, possible_values, default_values)?;
                entry::put_enum_attribute(
                    &mut attrs,
                    handle,
                    name_handle,
                    &possible,
                    &default_indices,
                );
                entry::put_enum_value(&mut values, handle, &default_indices);
            }
            DefinitionKind::String {
                string_type,
                minimum_length,
                maximum_length,
                default_string,
            } => {
                entry::put_string_attribute(
                    &mut attrs,
                    handle,
                    name_handle,
                    *string_type,
                    *minimum_length,
                    *maximum_length,
                    default_string.as_bytes(),
                );
                entry::put_string_value(&mut values, handle, default_string.as_bytes());
            }
            DefinitionKind::Integer {
                lower_bound,
                upper_bound,
                scalar_increment,
                default_value,
            } => {
                entry::put_integer_attribute(
                    &mut attrs,
                    handle,
                    name_handle,
                    *lower_bound,
                    *upper_bound,
                    *scalar_increment,
                    *default_value,
                );
                entry::put_integer_value(&mut values, handle, *default_value);
            }
        }
    }

    Ok(BuiltTables {
        string_table: seal(strings.buffer),
        attribute_table: seal(attrs),
        value_table: seal(values),
    })
}

/// Map default value strings to their indices in the possible-value list.
/// Ties between equal-valued strings resolve to the first occurrence, which
/// is also table order.
fn resolve_default_indices(
    def: &AttributeDefinition,
    possible_values: &[String],
    default_values: &[String],
) -> Result<Vec<u8>> {
    default_values
        .iter()
        .map(|dv| {
            possible_values
                .iter()
                .position(|pv| pv == dv)
                .map(|i| i as u8)
                .ok_or_else(|| {
                    BiosError::InvalidDefinition(format!(
                        "{}: default {dv:?} is not a possible value",
                        def.name
                    ))
                })
        })
        .collect()
}

/// Build all three tables and persist them through `store`.
pub fn build_and_store(
    definitions: &[AttributeDefinition],
    store: &dyn TableStore,
) -> Result<BuiltTables> {
    let tables = build_tables(definitions)?;
    store.store(TableKind::String, &tables.string_table)?;
    store.store(TableKind::Attribute, &tables.attribute_table)?;
    store.store(TableKind::AttributeValue, &tables.value_table)?;
    info!(
        attributes = definitions.len(),
        string_bytes = tables.string_table.len(),
        attr_bytes = tables.attribute_table.len(),
        value_bytes = tables.value_table.len(),
        "Built and persisted BIOS tables"
    );
    Ok(tables)
}
