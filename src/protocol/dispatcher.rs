use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{constants, BiosError, Result};
use crate::protocol::message::{cc_only, Command, CompletionCode};

type HandlerFn = dyn Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static;

/// Command dispatcher routing opcodes to their handlers.
///
/// Handlers are infallible at this boundary: every command error has already
/// been folded into a completion code by the time a response leaves a
/// handler. An unregistered opcode answers `UnsupportedCommand` rather than
/// failing the connection.
pub struct Dispatcher {
    handlers: Arc<RwLock<HashMap<u8, Box<HandlerFn>>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn register<F>(&self, opcode: u8, handler: F) -> Result<()>
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        let mut handlers = self
            .handlers
            .write()
            .map_err(|_| BiosError::Custom(constants::ERR_DISPATCHER_WRITE_LOCK.to_string()))?;

        handlers.insert(opcode, Box::new(handler));
        Ok(())
    }

    pub fn dispatch(&self, command: &Command) -> Result<Vec<u8>> {
        let handlers = self
            .handlers
            .read()
            .map_err(|_| BiosError::Custom(constants::ERR_DISPATCHER_READ_LOCK.to_string()))?;

        match handlers.get(&command.opcode) {
            Some(handler) => Ok(handler(&command.payload)),
            None => Ok(cc_only(CompletionCode::UnsupportedCommand)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::expect_used)]
    fn routes_by_opcode() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .register(0x0c, |_| vec![0x00, 0xaa])
            .expect("register");

        let resp = dispatcher
            .dispatch(&Command {
                opcode: 0x0c,
                payload: vec![],
            })
            .expect("dispatch");
        assert_eq!(resp, vec![0x00, 0xaa]);
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn unknown_opcode_answers_unsupported() {
        let dispatcher = Dispatcher::new();
        let resp = dispatcher
            .dispatch(&Command {
                opcode: 0x7f,
                payload: vec![],
            })
            .expect("dispatch");
        assert_eq!(resp, vec![CompletionCode::UnsupportedCommand.byte()]);
    }
}
