//! Table data model subsystem for tabula
//!
//! A table's model is an ordered list of column descriptors carrying a
//! type, an optional default, and properties (`pk`, `ai`, `trie`, `idx`,
//! `ref=>Table`).
//!
//! # Invariants
//!
//! - Zero or one `pk` column per table
//! - `ai` implies `pk` and a numeric type
//! - Every row handed to an adapter has been normalized against its model

mod errors;
mod loader;
mod normalizer;
mod types;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity};
pub use loader::SchemaLoader;
pub use normalizer::{RowNormalizer, WILDCARD_COLUMN};
pub use types::{ColumnDef, ColumnProp, ColumnType, TableModel};
