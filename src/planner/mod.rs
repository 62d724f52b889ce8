//! Query Planner subsystem for tabula
//!
//! Owns the query descriptor and its lifecycle, the predicate grammar,
//! and predicate cost classification.
//!
//! # Cost classes (cheapest first)
//!
//! - fast: one equality or range term on the pk or an `idx` column
//! - medium: an AND of plain terms, at least one of which narrows
//! - slow: full scan with in-memory evaluation
//! - fn: a predicate helper appears anywhere, full scan
//! - none: no predicate, all rows in pk order
//!
//! Ties between narrowing terms are broken lexicographically by column.

mod ast;
mod errors;
mod explain;
mod planner;

pub use ast::{
    Action, JoinKind, JoinOn, JoinSpec, Modifiers, Op, Query, QueryState, RelateOp, SelectColumn,
    SelectExpr, SortDirection, SortSpec, Where,
};
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult, Severity};
pub use explain::ExplainPlan;
pub use planner::{validate_predicate, CostClass, FetchPlan, QueryPlan, QueryPlanner};
