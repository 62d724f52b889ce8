//! tabula - A storage-agnostic database core
//!
//! Query processing, indexing and relationship maintenance over pluggable
//! storage adapters.

pub mod adapter;
pub mod config;
pub mod database;
pub mod diff;
pub mod error;
pub mod events;
pub mod executor;
pub mod functions;
pub mod index;
pub mod observability;
pub mod planner;
pub mod relation;
pub mod schema;
pub mod value;

pub use adapter::{Adapter, AdapterError, MemoryAdapter};
pub use config::{DatabaseConfig, TableConfig};
pub use database::{Database, QueryResult};
pub use error::{DbError, DbResult, ErrorCategory};
pub use events::{ChangeAction, ChangeEvent, EventKind};
pub use planner::{JoinKind, JoinSpec, Op, Query, RelateOp, SortSpec, Where};
pub use schema::{ColumnDef, TableModel};
pub use value::{Row, Value};
