//! # pldm-bios
//!
//! BIOS-control responder core for BMC platform management.
//!
//! The responder builds, persists, traverses, and mutates the three binary
//! BIOS tables (String, Attribute, AttributeValue) that describe firmware
//! configuration attributes, and serves the BIOS command family that reads
//! or updates individual attribute values and the platform date/time.
//!
//! ## Architecture
//! - [`table`]: the binary table format — entry model, traversal engine,
//!   builder, and attribute accessor
//! - [`definitions`]: attribute definitions parsed from platform JSON
//! - [`storage`]: table persistence with atomic replace
//! - [`protocol`]: command decoding, dispatch, and response encoding
//! - [`codec`]: BCD date/time conversion
//! - [`core`] + [`transport`]: framed command delivery over a local socket
//! - [`service`]: composition root wiring the above together
//!
//! ## Example
//! ```no_run
//! use pldm_bios::config::ResponderConfig;
//!
//! #[tokio::main]
//! async fn main() -> pldm_bios::error::Result<()> {
//!     let config = ResponderConfig::from_env()?;
//!     pldm_bios::utils::logging::init_logging(&config.logging);
//!     pldm_bios::service::run(config).await
//! }
//! ```

pub mod codec;
pub mod config;
pub mod core;
pub mod definitions;
pub mod error;
pub mod protocol;
pub mod service;
pub mod storage;
pub mod table;
pub mod transport;
pub mod utils;

pub use config::ResponderConfig;
pub use error::{BiosError, Result};
pub use protocol::{BiosHandler, CompletionCode, Dispatcher};
pub use table::builder::{build_tables, BuiltTables};
pub use table::TableKind;
