//! Configuration for header template parsing
//!
//! Defaults match what emulation profiles expect; a TOML file can override
//! any subset of the keys:
//!
//! ```toml
//! max_line_length = 131072
//! suppress_content_length = false
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Longest line the scanner accepts by default, in bytes
///
/// A 64 KiB line buffer that also has to hold the `\n`.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024 - 1;

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Options controlling how rendered header text is scanned and collected
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseConfig {
    /// Lines longer than this are a scan error rather than a header
    pub max_line_length: usize,

    /// Keep `content-length` out of the value map, recording only its
    /// position. When off it is collected like any other header.
    pub suppress_content_length: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            suppress_content_length: true,
        }
    }
}

impl ParseConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Set the maximum accepted line length
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Set whether `content-length` is kept out of the value map
    pub fn with_suppress_content_length(mut self, suppress: bool) -> Self {
        self.suppress_content_length = suppress;
        self
    }
}
