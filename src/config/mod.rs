//! Configuration
//!
//! Plain structs, deserializable from JSON, validated before use.

mod settings;
mod errors;

pub use settings::{DatabaseConfig, TableConfig};
pub use errors::{ConfigError, ConfigResult};
