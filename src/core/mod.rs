//! # Core Framing
//!
//! Length-prefixed frame layer between the local socket and the command
//! dispatcher. The responder never sees transport bytes below a frame's
//! payload; the payload is an opcode byte followed by the command's request
//! fields on the way in, and a completion code followed by response fields
//! on the way out.

pub mod codec;

pub use codec::{Frame, FrameCodec};
