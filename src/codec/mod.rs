//! # Codec Utilities
//!
//! Pure encoding helpers shared across the responder.
//!
//! ## Components
//! - **DateTime**: BCD packing and epoch/calendar conversion for the
//!   GetDateTime / SetDateTime commands

pub mod datetime;

pub use datetime::{bcd_to_dec8, bcd_to_dec16, dec_to_bcd8, dec_to_bcd16, BcdTime};
