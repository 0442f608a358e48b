//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Why a [`BotyardConfig`](super::BotyardConfig) could not be produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file extension names no enabled format.
    #[error("Unsupported configuration format '.{extension}' for {}", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// A source failed to parse or does not fit the schema.
    #[error("Failed to extract configuration: {0}")]
    Extract(#[from] figment::Error),

    /// A value parsed but is out of range.
    #[error("Invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(key: &'static str) -> Self {
        Self::invalid(key, "must not be empty")
    }

    /// Dotted key of the offending setting, for validation failures.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Self::Invalid { key, .. } => Some(*key),
            _ => None,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
