//! # Attribute Definitions
//!
//! Deserialization of the BIOS attribute definition file that seeds the
//! table builder. The file is a JSON array of definitions, one per
//! attribute, each carrying a name, a type tag, and the type-specific
//! metadata (possible values, bounds, defaults). The surrounding schema is
//! owned by the platform; this module only parses what table construction
//! needs and validates that every declared default satisfies its own
//! constraints before any table is built.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{BiosError, Result};

/// One BIOS attribute definition, as supplied by the platform configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Attribute name; interned into the string table.
    pub name: String,
    #[serde(flatten)]
    pub kind: DefinitionKind,
}

/// Type-specific definition metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DefinitionKind {
    Enumeration {
        /// Ordered possible values; order is table order and breaks ties
        /// between equal-valued strings.
        possible_values: Vec<String>,
        /// Defaults given by value, resolved to indices at build time.
        default_values: Vec<String>,
    },
    String {
        #[serde(default)]
        string_type: u8,
        minimum_length: u16,
        maximum_length: u16,
        default_string: String,
    },
    Integer {
        lower_bound: u64,
        upper_bound: u64,
        scalar_increment: u32,
        default_value: u64,
    },
}

impl AttributeDefinition {
    /// Check that the definition's own defaults satisfy its declared
    /// constraints. The builder calls this for every definition and fails
    /// the whole build on the first violation.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| {
            Err(BiosError::InvalidDefinition(format!(
                "{}: {reason}",
                self.name
            )))
        };
        match &self.kind {
            DefinitionKind::Enumeration {
                possible_values,
                default_values,
            } => {
                if possible_values.is_empty() {
                    return fail("no possible values".to_string());
                }
                if possible_values.len() > u8::MAX as usize {
                    return fail(format!(
                        "{} possible values exceeds the entry's count field",
                        possible_values.len()
                    ));
                }
                if default_values.is_empty() {
                    return fail("no default value".to_string());
                }
                for dv in default_values {
                    if !possible_values.contains(dv) {
                        return fail(format!("default {dv:?} is not a possible value"));
                    }
                }
                Ok(())
            }
            DefinitionKind::String {
                minimum_length,
                maximum_length,
                default_string,
                ..
            } => {
                if minimum_length > maximum_length {
                    return fail(format!(
                        "minimum length {minimum_length} exceeds maximum {maximum_length}"
                    ));
                }
                let len = default_string.len();
                if len < *minimum_length as usize || len > *maximum_length as usize {
                    return fail(format!(
                        "default string length {len} outside [{minimum_length}, {maximum_length}]"
                    ));
                }
                Ok(())
            }
            DefinitionKind::Integer {
                lower_bound,
                upper_bound,
                scalar_increment,
                default_value,
            } => {
                if lower_bound > upper_bound {
                    return fail(format!(
                        "lower bound {lower_bound} exceeds upper bound {upper_bound}"
                    ));
                }
                if *scalar_increment == 0 {
                    return fail("scalar increment must be non-zero".to_string());
                }
                if default_value < lower_bound || default_value > upper_bound {
                    return fail(format!(
                        "default {default_value} outside [{lower_bound}, {upper_bound}]"
                    ));
                }
                if (default_value - lower_bound) % u64::from(*scalar_increment) != 0 {
                    return fail(format!(
                        "default {default_value} not reachable from {lower_bound} in steps of {scalar_increment}"
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Load and validate the attribute definition file.
pub fn load_definitions<P: AsRef<Path>>(path: P) -> Result<Vec<AttributeDefinition>> {
    let contents = std::fs::read_to_string(&path)?;
    parse_definitions(&contents)
}

/// Parse and validate a JSON definition document.
pub fn parse_definitions(json: &str) -> Result<Vec<AttributeDefinition>> {
    let defs: Vec<AttributeDefinition> = serde_json::from_str(json)
        .map_err(|e| BiosError::InvalidDefinition(format!("parse failure: {e}")))?;
    for def in &defs {
        def.validate()?;
    }
    Ok(defs)
}
