//! # Transport
//!
//! Local IPC surface of the responder. Commands arrive framed on a
//! Unix-domain socket and are answered in request order; nothing here
//! inspects the payload beyond splitting the opcode from the request body.

pub mod local;
