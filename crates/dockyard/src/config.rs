//! Host Configuration
//!
//! Defines the `dockyard.toml` file format. Every field has a default, so an
//! empty file (or no file at all) yields a working host.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Host configuration (dockyard.toml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub symbols: SymbolConfig,
    #[serde(default)]
    pub handlers: HandlerConfig,
}

/// Archive discovery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Archive file extension, compared case-insensitively
    #[serde(default = "default_archive_extension")]
    pub extension: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            extension: default_archive_extension(),
        }
    }
}

fn default_archive_extension() -> String {
    dockyard_archive::DEFAULT_ARCHIVE_EXTENSION.to_string()
}

/// Symbol entry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolConfig {
    /// Extension of symbol entries inside an archive
    #[serde(default = "default_symbol_extension")]
    pub extension: String,
}

impl Default for SymbolConfig {
    fn default() -> Self {
        Self {
            extension: default_symbol_extension(),
        }
    }
}

fn default_symbol_extension() -> String {
    dockyard_archive::DEFAULT_SYMBOL_EXTENSION.to_string()
}

/// Event handler discovery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Attribute marking a function as an event handler
    #[serde(default = "default_handler_attribute")]
    pub attribute: String,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            attribute: default_handler_attribute(),
        }
    }
}

fn default_handler_attribute() -> String {
    "subscribe".to_string()
}

impl HostConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_toml_str(&content)
    }
}
