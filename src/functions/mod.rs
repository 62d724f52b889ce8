//! # Function Registry
//!
//! Named functions usable in select lists, and predicate helpers usable
//! inside `where` clauses.
//!
//! - Scalar ("S"): pure per-row transform
//! - Aggregate ("A"): folds a row group into an [`Accumulator`]
//!
//! Referencing an unregistered name is a configuration error reported
//! while the query is prepared.

pub mod builtins;
pub mod call;
pub mod errors;
pub mod function;
pub mod predicates;
pub mod registry;

pub use call::{split_alias, Arg, FunctionCall};
pub use errors::{FunctionError, FunctionResult};
pub use function::{Accumulator, AggregateFn, FunctionKind, QueryFunction, ScalarFn};
pub use predicates::{PredicateHelper, PredicateHelpers};
pub use registry::FunctionRegistry;
