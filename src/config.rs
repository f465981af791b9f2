//! # Configuration Management
//!
//! Centralized configuration for the BIOS responder.
//!
//! This module provides structured configuration for the responder service:
//! where attribute definitions are read from, where the persisted tables
//! live, which socket the service answers on, and logging settings.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{BiosError, Result};

/// Current supported frame version on the local socket
pub const PROTOCOL_VERSION: u8 = 1;

/// Magic bytes identifying responder frames (0x50424F53 -> "PBOS")
pub const MAGIC_BYTES: [u8; 4] = [0x50, 0x42, 0x4F, 0x53];

/// Max allowed frame payload size. Tables are bounded by firmware attribute
/// counts; anything near this limit is a corrupt header, not a real table.
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Main responder configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ResponderConfig {
    /// Table persistence and definition sources
    #[serde(default)]
    pub tables: TableConfig,

    /// Local service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ResponderConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| BiosError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| BiosError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| BiosError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("PLDM_BIOS_TABLE_DIR") {
            config.tables.table_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("PLDM_BIOS_DEFINITIONS") {
            config.tables.definitions_path = PathBuf::from(path);
        }
        if let Ok(socket) = std::env::var("PLDM_BIOS_SOCKET") {
            config.service.socket_path = PathBuf::from(socket);
        }
        if let Ok(level) = std::env::var("PLDM_BIOS_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Validate the configuration before the service starts.
    pub fn validate(&self) -> Result<()> {
        if self.tables.definitions_path.as_os_str().is_empty() {
            return Err(BiosError::ConfigError(
                "attribute definitions path is empty".to_string(),
            ));
        }
        if self.tables.table_dir.as_os_str().is_empty() {
            return Err(BiosError::ConfigError("table directory is empty".to_string()));
        }
        if self.service.socket_path.as_os_str().is_empty() {
            return Err(BiosError::ConfigError("socket path is empty".to_string()));
        }
        Ok(())
    }
}

/// Table sources and persistence location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TableConfig {
    /// Directory holding the three persisted table files
    #[serde(default = "default_table_dir")]
    pub table_dir: PathBuf,

    /// Attribute definition JSON file consumed by the builder
    #[serde(default = "default_definitions_path")]
    pub definitions_path: PathBuf,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            table_dir: default_table_dir(),
            definitions_path: default_definitions_path(),
        }
    }
}

fn default_table_dir() -> PathBuf {
    PathBuf::from("/var/lib/pldm-bios/tables")
}

fn default_definitions_path() -> PathBuf {
    PathBuf::from("/etc/pldm-bios/attributes.json")
}

/// Local service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Unix socket the responder answers on
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            socket_path: default_socket_path(),
        }
    }
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("/run/pldm-bios.sock")
}

/// Logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter directive, e.g. "info" or "pldm_bios=debug"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit compact single-line output instead of the default format
    #[serde(default)]
    pub compact: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            compact: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
