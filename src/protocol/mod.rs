//! # Protocol Layer
//!
//! Command decoding, dispatch, and response encoding for the BIOS command
//! family.
//!
//! ## Components
//! - **Messages** (`message`): byte-exact request/response layouts and
//!   completion codes
//! - **Dispatcher** (`dispatcher`): opcode routing to registered handlers
//! - **Handler** (`handler`): the five BIOS commands and the table cache

pub mod dispatcher;
pub mod handler;
pub mod message;

pub use dispatcher::Dispatcher;
pub use handler::BiosHandler;
pub use message::{Command, CompletionCode};
