//! # Error Types
//!
//! Comprehensive error handling for the BIOS responder.
//!
//! This module defines all error variants that can occur while serving BIOS
//! commands, from low-level I/O errors to table-format violations.
//!
//! ## Error Categories
//! - **I/O Errors**: Persistence and file system failures
//! - **Format Errors**: Malformed table entries, unknown type tags, checksum mismatches
//! - **Lookup Errors**: Attribute handles with no matching table entry
//! - **Validation Errors**: Values outside declared bounds, lengths, or possible-value sets
//!
//! All errors implement `std::error::Error` for interoperability. Expected
//! errors (lookup and validation failures) map to specific protocol completion
//! codes; corruption and I/O errors are logged and reported as generic
//! failures without leaking internal detail.

use std::io;
use thiserror::Error;

use crate::table::TableKind;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";

    /// Table format errors
    pub const ERR_TRUNCATED_ENTRY: &str = "Entry overruns table buffer";
    pub const ERR_TRAILING_GARBAGE: &str = "Non-zero bytes in table pad region";
    pub const ERR_TABLE_TOO_SHORT: &str = "Table shorter than its checksum field";

    /// Date/time errors
    pub const ERR_INVALID_BCD_DIGIT: &str = "Nibble is not a decimal digit";
    pub const ERR_INVALID_CALENDAR_DATE: &str = "Field values do not form a calendar date";
}

/// Primary error type for all BIOS responder operations.
#[derive(Error, Debug)]
pub enum BiosError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid attribute definition: {0}")]
    InvalidDefinition(String),

    #[error("Malformed table entry at offset {offset}: {reason}")]
    MalformedEntry { offset: usize, reason: String },

    #[error("Unknown attribute type tag: {0:#04x}")]
    UnknownAttributeType(u8),

    #[error("Checksum mismatch on {0} table")]
    ChecksumMismatch(TableKind),

    #[error("{0} table unavailable")]
    TableUnavailable(TableKind),

    #[error("Invalid BIOS table type: {0:#04x}")]
    InvalidTableType(u8),

    #[error("Invalid transfer operation: {0:#04x}")]
    InvalidTransferOperation(u8),

    #[error("Invalid payload length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("Attribute handle {0} not found")]
    AttributeHandleNotFound(u16),

    #[error("Attribute handle {0} has no value-table entry")]
    ValueEntryMissing(u16),

    #[error("Attribute type mismatch: attribute is {expected:?}, request declared {got:?}")]
    TypeMismatch {
        expected: crate::table::entry::AttributeType,
        got: crate::table::entry::AttributeType,
    },

    #[error("Integer value {value} outside [{lower}, {upper}] or off-increment")]
    ValueOutOfRange { value: u64, lower: u64, upper: u64 },

    #[error("Enumeration index {index} exceeds {count} possible values")]
    InvalidEnumerationIndex { index: u8, count: u8 },

    #[error("String length {len} outside [{min}, {max}]")]
    StringLengthOutOfRange { len: u16, min: u16, max: u16 },

    #[error("Invalid date/time field: {0}")]
    InvalidDateTime(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl BiosError {
    /// Shorthand for a malformed-entry error at a known offset.
    pub fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        BiosError::MalformedEntry {
            offset,
            reason: reason.into(),
        }
    }
}

/// Type alias for Results using BiosError
pub type Result<T> = std::result::Result<T, BiosError>;
