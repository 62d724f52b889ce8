//! # Database
//!
//! The explicit instance handle. A [`Database`] owns its adapter, the
//! in-memory index state of every table, the function registry and the
//! change-event bus; several instances can live side by side.
//!
//! # Usage
//!
//! ```ignore
//! use tabula::{Database, DatabaseConfig, Op, Query, TableConfig, Where};
//!
//! let db = Database::in_memory(DatabaseConfig::new("app").with_table(users));
//! db.connect().await?;
//! let adults = db.query(Query::select("users").filter(Where::cond("age", Op::Gte, 18))).await?;
//! ```

mod handle;
mod result;
mod state;

pub use handle::Database;
pub use result::QueryResult;
pub use state::{with_implicit_pk, IMPLICIT_PK};
