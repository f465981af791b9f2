//! Structured logging setup.
//!
//! Initializes a `tracing` subscriber from the responder's logging
//! configuration. Safe to call once per process; later calls are ignored so
//! tests can initialize freely.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global tracing subscriber.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if config.compact {
        builder.compact().try_init()
    } else {
        builder.try_init()
    };

    // A subscriber may already be installed (tests, embedding binaries).
    let _ = result;
}
