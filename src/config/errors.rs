//! Configuration errors

use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Malformed config: {0}")]
    Parse(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "TABULA_CONFIG_INVALID",
            ConfigError::Io { .. } => "TABULA_CONFIG_IO",
            ConfigError::Parse(_) => "TABULA_CONFIG_PARSE",
        }
    }
}
