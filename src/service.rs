//! # Responder Service
//!
//! Wires the configured collaborators together and runs the responder:
//! attribute definitions feed the handler, the handler registers its five
//! commands on a dispatcher, and the dispatcher answers frames on the local
//! socket until shutdown.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::config::ResponderConfig;
use crate::definitions;
use crate::error::Result;
use crate::protocol::{BiosHandler, Dispatcher};
use crate::storage::FileStore;
use crate::transport::local;

/// Build the dispatcher-plus-handler pair from configuration.
pub fn build(config: &ResponderConfig) -> Result<(Arc<BiosHandler>, Arc<Dispatcher>)> {
    config.validate()?;
    let defs = definitions::load_definitions(&config.tables.definitions_path)?;
    info!(
        attributes = defs.len(),
        definitions = %config.tables.definitions_path.display(),
        "Loaded attribute definitions"
    );
    let store = Arc::new(FileStore::new(&config.tables.table_dir)?);
    let handler = Arc::new(BiosHandler::new(store, defs));
    let dispatcher = Arc::new(Dispatcher::new());
    handler.register(&dispatcher)?;
    Ok((handler, dispatcher))
}

/// Run the responder until ctrl-c.
pub async fn run(config: ResponderConfig) -> Result<()> {
    let (_handler, dispatcher) = build(&config)?;
    local::start_server(&config.service.socket_path, dispatcher).await
}

/// Run the responder until the shutdown channel fires. The handler is
/// returned to the caller so an external config-change signal can
/// invalidate its table cache.
pub async fn run_with_shutdown(
    config: ResponderConfig,
    shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let (_handler, dispatcher) = build(&config)?;
    local::start_server_with_shutdown(&config.service.socket_path, dispatcher, shutdown_rx).await
}
