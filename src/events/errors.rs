//! # Event Errors

use thiserror::Error;

/// Result type for event operations
pub type EventResult<T> = Result<T, EventError>;

/// Event errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EventError {
    #[error("Subscription table name is empty")]
    EmptyTable,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EventError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            EventError::EmptyTable => "TABULA_EVENT_EMPTY_TABLE",
            EventError::Internal(_) => "TABULA_EVENT_INTERNAL",
        }
    }
}
