//! Observability
//!
//! Structured JSON logging and typed lifecycle events.
//!
//! # Usage
//!
//! ```ignore
//! use tabula::observability::{log_event_with_fields, Event, Logger};
//!
//! Logger::info("QUERY_COMPLETE", &[("rows", "42")]);
//! log_event_with_fields(Event::TableRegistered, &[("table", "users")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    if event.is_failure() {
        Logger::error(event.as_str(), fields);
    } else {
        Logger::info(event.as_str(), fields);
    }
}
