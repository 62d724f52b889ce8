//! # Function definitions

use std::fmt;
use std::sync::Arc;

use crate::value::{Row, Value};

use super::errors::FunctionResult;

/// Function kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Pure per-row transform
    Scalar,
    /// Folds a row group into an accumulator
    Aggregate,
}

impl FunctionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionKind::Scalar => "S",
            FunctionKind::Aggregate => "A",
        }
    }
}

/// Carried state of an aggregate across one row group
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    /// Current output. Valid after every step, not only the last.
    pub result: Value,
    /// Running numeric total
    pub total: f64,
    /// Rows folded in so far
    pub count: u64,
    /// Row that produced `result` (MIN / MAX)
    pub row: Option<Row>,
}

impl Accumulator {
    pub fn starting_at(result: Value) -> Self {
        Self {
            result,
            total: 0.0,
            count: 0,
            row: None,
        }
    }
}

/// Scalar implementation: `(row, resolved args) -> result`
pub type ScalarFn = Arc<dyn Fn(&Row, &[Value]) -> FunctionResult<Value> + Send + Sync>;

/// Aggregate step: `(row, accumulator, resolved args) -> accumulator`
pub type AggregateFn = Arc<dyn Fn(&Row, Accumulator, &[Value]) -> Accumulator + Send + Sync>;

/// A registered function
#[derive(Clone)]
pub enum QueryFunction {
    Scalar(ScalarFn),
    Aggregate {
        /// Seed accumulator for every group
        start: Accumulator,
        step: AggregateFn,
    },
}

impl QueryFunction {
    pub fn kind(&self) -> FunctionKind {
        match self {
            QueryFunction::Scalar(_) => FunctionKind::Scalar,
            QueryFunction::Aggregate { .. } => FunctionKind::Aggregate,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.kind() == FunctionKind::Aggregate
    }
}

impl fmt::Debug for QueryFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryFunction::Scalar(_) => write!(f, "QueryFunction::Scalar"),
            QueryFunction::Aggregate { start, .. } => f
                .debug_struct("QueryFunction::Aggregate")
                .field("start", start)
                .finish(),
        }
    }
}
