//! # Utility Modules
//!
//! Supporting utilities shared across the responder.
//!
//! ## Components
//! - **Logging**: Structured logging configuration

pub mod logging;
