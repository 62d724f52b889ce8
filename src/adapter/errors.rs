//! # Adapter Errors

use thiserror::Error;

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Adapter errors
///
/// The core never retries these and never swallows them: they abort the
/// in-flight query and reach the caller unchanged.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdapterError {
    #[error("Adapter not connected")]
    NotConnected,

    #[error("Table not found: {0}")]
    UnknownTable(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Write to {0} needs a primary key")]
    KeyRequired(String),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Injected failure on {0}")]
    Injected(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdapterError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            AdapterError::NotConnected => "TABULA_ADAPTER_NOT_CONNECTED",
            AdapterError::UnknownTable(_) => "TABULA_ADAPTER_UNKNOWN_TABLE",
            AdapterError::TableExists(_) => "TABULA_ADAPTER_TABLE_EXISTS",
            AdapterError::KeyRequired(_) => "TABULA_ADAPTER_KEY_REQUIRED",
            AdapterError::Storage(_) => "TABULA_ADAPTER_STORAGE",
            AdapterError::Injected(_) => "TABULA_ADAPTER_INJECTED",
            AdapterError::Internal(_) => "TABULA_ADAPTER_INTERNAL",
        }
    }
}
