//! # BCD Date/Time Conversion
//!
//! The date/time commands carry calendar fields as packed binary-coded
//! decimal: each decimal digit occupies one 4-bit nibble, tens nibble high.
//! Seconds, minutes, hours, day and month are one BCD byte each; the year is
//! two BCD bytes spanning four decimal digits (low byte first on the wire).
//!
//! Calendar math is delegated to `chrono`; all conversions are in UTC.

use chrono::{Datelike, NaiveDate, Timelike};

use crate::error::{constants, BiosError, Result};

/// A full date/time with every field packed as BCD.
///
/// `year` holds four packed digits, e.g. 2023 encodes as `0x2023`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcdTime {
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

/// Pack a two-digit decimal value into one BCD byte.
pub fn dec_to_bcd8(dec: u8) -> u8 {
    debug_assert!(dec < 100);
    ((dec / 10) << 4) | (dec % 10)
}

/// Pack a four-digit decimal value into two BCD bytes.
pub fn dec_to_bcd16(dec: u16) -> u16 {
    debug_assert!(dec < 10_000);
    let mut bcd: u16 = 0;
    let mut shift = 0;
    let mut rest = dec;
    while shift < 16 {
        bcd |= (rest % 10) << shift;
        rest /= 10;
        shift += 4;
    }
    bcd
}

/// Unpack one BCD byte into its decimal value.
///
/// Fails if either nibble is not a decimal digit.
pub fn bcd_to_dec8(bcd: u8) -> Result<u8> {
    let tens = bcd >> 4;
    let units = bcd & 0x0f;
    if tens > 9 || units > 9 {
        return Err(BiosError::InvalidDateTime(
            constants::ERR_INVALID_BCD_DIGIT.to_string(),
        ));
    }
    Ok(tens * 10 + units)
}

/// Unpack two BCD bytes (four digits) into their decimal value.
pub fn bcd_to_dec16(bcd: u16) -> Result<u16> {
    let mut dec: u16 = 0;
    for shift in [12u16, 8, 4, 0] {
        let digit = (bcd >> shift) & 0x0f;
        if digit > 9 {
            return Err(BiosError::InvalidDateTime(
                constants::ERR_INVALID_BCD_DIGIT.to_string(),
            ));
        }
        dec = dec * 10 + digit;
    }
    Ok(dec)
}

/// Convert epoch seconds (UTC) to packed BCD calendar fields.
pub fn epoch_to_bcd_time(epoch_secs: i64) -> Result<BcdTime> {
    let dt = chrono::DateTime::from_timestamp(epoch_secs, 0).ok_or_else(|| {
        BiosError::InvalidDateTime(format!("epoch {epoch_secs} outside supported range"))
    })?;
    let year = dt.year();
    if !(1..=9999).contains(&year) {
        return Err(BiosError::InvalidDateTime(format!(
            "year {year} outside supported range"
        )));
    }
    Ok(BcdTime {
        seconds: dec_to_bcd8(dt.second() as u8),
        minutes: dec_to_bcd8(dt.minute() as u8),
        hours: dec_to_bcd8(dt.hour() as u8),
        day: dec_to_bcd8(dt.day() as u8),
        month: dec_to_bcd8(dt.month() as u8),
        year: dec_to_bcd16(year as u16),
    })
}

/// Convert decimal calendar fields (UTC) to epoch seconds.
///
/// Fields are range-checked (seconds 0-59, minutes 0-59, hours 0-23,
/// day 1-31, month 1-12, year 1-9999) and must form a real calendar date.
pub fn time_to_epoch(
    seconds: u8,
    minutes: u8,
    hours: u8,
    day: u8,
    month: u8,
    year: u16,
) -> Result<i64> {
    if seconds > 59 || minutes > 59 || hours > 23 {
        return Err(BiosError::InvalidDateTime(format!(
            "time of day {hours:02}:{minutes:02}:{seconds:02} out of range"
        )));
    }
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
        return Err(BiosError::InvalidDateTime(format!(
            "date {year:04}-{month:02}-{day:02} out of range"
        )));
    }
    let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32).ok_or_else(|| {
        BiosError::InvalidDateTime(constants::ERR_INVALID_CALENDAR_DATE.to_string())
    })?;
    let dt = date
        .and_hms_opt(hours as u32, minutes as u32, seconds as u32)
        .ok_or_else(|| {
            BiosError::InvalidDateTime(constants::ERR_INVALID_CALENDAR_DATE.to_string())
        })?;
    Ok(dt.and_utc().timestamp())
}

/// Convert packed BCD calendar fields back to epoch seconds.
pub fn bcd_time_to_epoch(t: &BcdTime) -> Result<i64> {
    time_to_epoch(
        bcd_to_dec8(t.seconds)?,
        bcd_to_dec8(t.minutes)?,
        bcd_to_dec8(t.hours)?,
        bcd_to_dec8(t.day)?,
        bcd_to_dec8(t.month)?,
        bcd_to_dec16(t.year)?,
    )
}
