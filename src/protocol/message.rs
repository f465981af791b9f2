//! # Wire Messages
//!
//! Byte-exact request decoding and response encoding for the BIOS command
//! family. Every multi-byte integer is little-endian. Each response opens
//! with a one-byte completion code; failed commands answer with the code
//! alone, successful ones append the command's payload.

use bytes::BufMut;

use crate::error::BiosError;

/// BIOS command opcodes served by this responder.
pub mod opcode {
    pub const GET_BIOS_TABLE: u8 = 0x01;
    pub const SET_BIOS_ATTRIBUTE_CURRENT_VALUE: u8 = 0x07;
    pub const GET_BIOS_ATTRIBUTE_CURRENT_VALUE_BY_HANDLE: u8 = 0x08;
    pub const GET_DATE_TIME: u8 = 0x0c;
    pub const SET_DATE_TIME: u8 = 0x0d;
}

/// Multipart transfer operation flags. Tables always fit one response here,
/// so only `GET_FIRST_PART` is accepted.
pub const TRANSFER_GET_NEXT_PART: u8 = 0x00;
pub const TRANSFER_GET_FIRST_PART: u8 = 0x01;

/// Transfer flag marking a single-chunk response.
pub const TRANSFER_START_AND_END: u8 = 0x05;

/// Protocol completion codes carried in the first response byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompletionCode {
    Success = 0x00,
    Error = 0x01,
    InvalidData = 0x02,
    InvalidLength = 0x03,
    UnsupportedCommand = 0x05,
    InvalidTransferOperation = 0x82,
    BiosTableUnavailable = 0x83,
    InvalidDataIntegrityCheck = 0x84,
    InvalidTableType = 0x85,
    InvalidAttributeHandle = 0x88,
}

impl CompletionCode {
    pub fn byte(self) -> u8 {
        self as u8
    }
}

impl From<&BiosError> for CompletionCode {
    /// Expected errors map to their specific codes; corruption and I/O
    /// failures collapse to a generic code that leaks no internal detail.
    fn from(err: &BiosError) -> Self {
        match err {
            BiosError::InvalidLength { .. } => CompletionCode::InvalidLength,
            BiosError::InvalidTableType(_) => CompletionCode::InvalidTableType,
            BiosError::InvalidTransferOperation(_) => CompletionCode::InvalidTransferOperation,
            BiosError::TableUnavailable(_) => CompletionCode::BiosTableUnavailable,
            BiosError::ChecksumMismatch(_) => CompletionCode::InvalidDataIntegrityCheck,
            BiosError::AttributeHandleNotFound(_) => CompletionCode::InvalidAttributeHandle,
            BiosError::TypeMismatch { .. }
            | BiosError::ValueOutOfRange { .. }
            | BiosError::InvalidEnumerationIndex { .. }
            | BiosError::StringLengthOutOfRange { .. }
            | BiosError::InvalidDateTime(_)
            | BiosError::MalformedEntry { .. }
            | BiosError::UnknownAttributeType(_) => CompletionCode::InvalidData,
            _ => CompletionCode::Error,
        }
    }
}

/// A decoded command as delivered by the framing layer: the opcode plus the
/// raw request payload below it.
#[derive(Debug, Clone)]
pub struct Command {
    pub opcode: u8,
    pub payload: Vec<u8>,
}

fn expect_len(payload: &[u8], expected: usize) -> crate::error::Result<()> {
    if payload.len() != expected {
        return Err(BiosError::InvalidLength {
            expected,
            got: payload.len(),
        });
    }
    Ok(())
}

fn read_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

/// GetBIOSTable request fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetTableRequest {
    pub transfer_handle: u32,
    pub transfer_op: u8,
    pub table_type: u8,
}

impl GetTableRequest {
    pub const LEN: usize = 6;

    pub fn decode(payload: &[u8]) -> crate::error::Result<Self> {
        expect_len(payload, Self::LEN)?;
        Ok(GetTableRequest {
            transfer_handle: read_u32(payload, 0),
            transfer_op: payload[4],
            table_type: payload[5],
        })
    }
}

/// GetBIOSAttributeCurrentValueByHandle request fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetAttributeRequest {
    pub transfer_handle: u32,
    pub transfer_op: u8,
    pub attribute_handle: u16,
}

impl GetAttributeRequest {
    pub const LEN: usize = 7;

    pub fn decode(payload: &[u8]) -> crate::error::Result<Self> {
        expect_len(payload, Self::LEN)?;
        Ok(GetAttributeRequest {
            transfer_handle: read_u32(payload, 0),
            transfer_op: payload[4],
            attribute_handle: read_u16(payload, 5),
        })
    }
}

/// SetBIOSAttributeCurrentValue request fields. `entry` is the raw
/// attribute-value table entry carrying the new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetAttributeRequest<'a> {
    pub transfer_handle: u32,
    pub transfer_flag: u8,
    pub entry: &'a [u8],
}

impl<'a> SetAttributeRequest<'a> {
    /// Fixed fields before the entry; the entry itself is at least a
    /// three-byte header plus one payload byte.
    pub const MIN_LEN: usize = 5 + 4;

    pub fn decode(payload: &'a [u8]) -> crate::error::Result<Self> {
        if payload.len() < Self::MIN_LEN {
            return Err(BiosError::InvalidLength {
                expected: Self::MIN_LEN,
                got: payload.len(),
            });
        }
        Ok(SetAttributeRequest {
            transfer_handle: read_u32(payload, 0),
            transfer_flag: payload[4],
            entry: &payload[5..],
        })
    }
}

/// SetDateTime request fields, still packed as BCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetDateTimeRequest {
    pub time: crate::codec::BcdTime,
}

impl SetDateTimeRequest {
    pub const LEN: usize = 7;

    pub fn decode(payload: &[u8]) -> crate::error::Result<Self> {
        expect_len(payload, Self::LEN)?;
        Ok(SetDateTimeRequest {
            time: crate::codec::BcdTime {
                seconds: payload[0],
                minutes: payload[1],
                hours: payload[2],
                day: payload[3],
                month: payload[4],
                year: read_u16(payload, 5),
            },
        })
    }
}

/// A completion-code-only response.
pub fn cc_only(cc: CompletionCode) -> Vec<u8> {
    vec![cc.byte()]
}

/// GetDateTime success response.
pub fn date_time_response(time: &crate::codec::BcdTime) -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    out.put_u8(CompletionCode::Success.byte());
    out.put_u8(time.seconds);
    out.put_u8(time.minutes);
    out.put_u8(time.hours);
    out.put_u8(time.day);
    out.put_u8(time.month);
    out.put_u16_le(time.year);
    out
}

/// Single-chunk transfer response: GetBIOSTable and
/// GetBIOSAttributeCurrentValueByHandle share this shape.
pub fn transfer_response(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(6 + data.len());
    out.put_u8(CompletionCode::Success.byte());
    out.put_u32_le(0); // next transfer handle: nothing follows
    out.put_u8(TRANSFER_START_AND_END);
    out.put_slice(data);
    out
}

/// SetBIOSAttributeCurrentValue success response.
pub fn set_attribute_response() -> Vec<u8> {
    let mut out = Vec::with_capacity(5);
    out.put_u8(CompletionCode::Success.byte());
    out.put_u32_le(0); // next transfer handle
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::expect_used)]
    fn get_table_request_layout() {
        let payload = [0x78, 0x56, 0x34, 0x12, 0x01, 0x02];
        let req = GetTableRequest::decode(&payload).expect("six bytes");
        assert_eq!(req.transfer_handle, 0x1234_5678);
        assert_eq!(req.transfer_op, TRANSFER_GET_FIRST_PART);
        assert_eq!(req.table_type, 2);
    }

    #[test]
    fn get_table_request_length_enforced() {
        assert!(matches!(
            GetTableRequest::decode(&[0; 5]),
            Err(BiosError::InvalidLength { expected: 6, got: 5 })
        ));
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn get_attribute_request_layout() {
        let payload = [0, 0, 0, 0, 0x01, 0x2a, 0x00];
        let req = GetAttributeRequest::decode(&payload).expect("seven bytes");
        assert_eq!(req.attribute_handle, 42);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn set_attribute_request_splits_entry() {
        // transfer handle, flag, then an integer value entry for handle 1
        let mut payload = vec![0, 0, 0, 0, TRANSFER_START_AND_END];
        crate::table::entry::put_integer_value(&mut payload, 1, 77);
        let req = SetAttributeRequest::decode(&payload).expect("long enough");
        assert_eq!(req.transfer_flag, TRANSFER_START_AND_END);
        assert_eq!(req.entry.len(), 11);
    }

    #[test]
    fn transfer_response_layout() {
        let resp = transfer_response(&[0xaa, 0xbb]);
        assert_eq!(resp[0], CompletionCode::Success.byte());
        assert_eq!(&resp[1..5], &[0, 0, 0, 0]);
        assert_eq!(resp[5], TRANSFER_START_AND_END);
        assert_eq!(&resp[6..], &[0xaa, 0xbb]);
    }

    #[test]
    fn completion_code_mapping() {
        let cc = CompletionCode::from(&BiosError::AttributeHandleNotFound(3));
        assert_eq!(cc, CompletionCode::InvalidAttributeHandle);
        let cc = CompletionCode::from(&BiosError::InvalidTableType(9));
        assert_eq!(cc, CompletionCode::InvalidTableType);
        // internal faults must not leak a specific code
        let cc = CompletionCode::from(&BiosError::Custom("disk on fire".to_string()));
        assert_eq!(cc, CompletionCode::Error);
    }
}
