//! Query Executor subsystem
//!
//! Consumes a classified query and produces its result rows.
//!
//! # Execution Flow (strict order)
//!
//! 1. Fetch candidates by the resolved fetch (keys, pk range, window, all)
//! 2. Skip rows whose TTL expired when the query started
//! 3. Filter every candidate with the full predicate
//! 4. Join, group, aggregate, `having`
//! 5. Sort, then offset and limit
//!
//! # Invariants
//!
//! - Same plan + same data = same results
//! - An adapter error aborts the query, no partial results

mod aggregate;
mod errors;
mod executor;
mod filters;
mod join;
mod result;
mod sorter;

pub use aggregate::Projector;
pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult, Severity};
pub use executor::{Fetch, PreparedJoin, PreparedQuery, QueryExecutor};
pub use filters::{compare, CompiledWhere};
pub use join::{apply_join, qualify, JoinInput};
pub use result::{ExecutionResult, Fetched};
pub use sorter::ResultSorter;
