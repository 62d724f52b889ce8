//! Query planner
//!
//! Validates a query before dispatch and assigns its predicate a cost
//! class. Classification is deterministic: the same predicate against
//! the same model always yields the same class and fetch plan.
//!
//! Narrowing term priority (strict order):
//! 1. Primary key equality (`=`, `IN`)
//! 2. Primary key range
//! 3. Indexed equality
//! 4. Indexed range
//!
//! Ties broken lexicographically by column name.

use std::fmt;

use regex::Regex;

use crate::functions::{FunctionRegistry, PredicateHelpers};
use crate::schema::TableModel;
use crate::value::Value;

use super::ast::{Action, Op, Query, SelectExpr, Where};
use super::errors::{PlannerError, PlannerResult};

/// Predicate cost class, cheapest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CostClass {
    Fast,
    Medium,
    Slow,
    Fn,
    None,
}

impl CostClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostClass::Fast => "fast",
            CostClass::Medium => "medium",
            CostClass::Slow => "slow",
            CostClass::Fn => "fn",
            CostClass::None => "none",
        }
    }
}

impl fmt::Display for CostClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How candidate rows are obtained from the adapter
#[derive(Debug, Clone, PartialEq)]
pub enum FetchPlan {
    /// `read_all`
    All,
    /// `read_pk` per key
    PkKeys(Vec<Value>),
    /// `read_pk_range`, inclusive, open where `None`
    PkRange {
        low: Option<Value>,
        high: Option<Value>,
    },
    /// Secondary index equality, then `read_pk` per key
    IndexKeys { column: String, values: Vec<Value> },
    /// Secondary index range, then `read_pk` per key
    IndexRange {
        column: String,
        low: Option<Value>,
        high: Option<Value>,
    },
}

impl FetchPlan {
    pub fn describe(&self) -> String {
        match self {
            FetchPlan::All => "READ_ALL".to_string(),
            FetchPlan::PkKeys(keys) => format!("PK_LOOKUP ({} keys)", keys.len()),
            FetchPlan::PkRange { low, high } => format!("PK_RANGE [{}, {}]", bound(low), bound(high)),
            FetchPlan::IndexKeys { column, values } => {
                format!("INDEX_EQ {} ({} values)", column, values.len())
            }
            FetchPlan::IndexRange { column, low, high } => {
                format!("INDEX_RANGE {} [{}, {}]", column, bound(low), bound(high))
            }
        }
    }
}

fn bound(v: &Option<Value>) -> String {
    v.as_ref().map_or_else(|| "*".to_string(), |v| v.to_string())
}

/// Immutable query plan
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub class: CostClass,
    pub fetch: FetchPlan,
}

/// Query planner for one table
pub struct QueryPlanner<'a> {
    model: &'a TableModel,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(model: &'a TableModel) -> Self {
        Self { model }
    }

    /// Validates everything that can be checked without touching rows:
    /// predicate operands, regex syntax, function and helper names,
    /// join specs.
    pub fn validate(
        &self,
        query: &Query,
        functions: &FunctionRegistry,
        helpers: &PredicateHelpers,
    ) -> PlannerResult<()> {
        if let Some(predicate) = &query.predicate {
            validate_predicate(predicate, helpers)?;
        }
        if let Some(having) = &query.modifiers.having {
            validate_predicate(having, helpers)?;
        }

        for column in &query.modifiers.select {
            if let SelectExpr::Call(call) = &column.expr {
                functions
                    .check_call(call)
                    .map_err(|_| PlannerError::unknown_function(&call.name))?;
            }
        }

        for join in &query.modifiers.joins {
            match (&join.on, join.kind) {
                (None, super::ast::JoinKind::Cross) => {}
                (None, kind) => {
                    return Err(PlannerError::query_invalid(format!(
                        "{} join on '{}' needs an 'on' condition",
                        kind.as_str(),
                        join.table
                    )))
                }
                (Some(on), _) => {
                    if matches!(on.op, Op::Like | Op::NotLike | Op::Regexp | Op::Prefix) {
                        return Err(PlannerError::query_invalid(format!(
                            "join on '{}' does not support {}",
                            join.table, on.op
                        )));
                    }
                    for side in [&on.left, &on.right] {
                        if !side.contains('.') {
                            return Err(PlannerError::query_invalid(format!(
                                "join column '{}' must be written table.column",
                                side
                            )));
                        }
                    }
                }
            }
        }

        if let Action::Relate(_) | Action::Delete = query.action {
            if !query.modifiers.joins.is_empty() {
                return Err(PlannerError::query_invalid(format!(
                    "{} does not accept joins",
                    query.action.name()
                )));
            }
        }

        Ok(())
    }

    /// Assigns the predicate its cost class and fetch plan
    pub fn classify(&self, predicate: Option<&Where>) -> QueryPlan {
        let predicate = match predicate {
            None => {
                return QueryPlan {
                    class: CostClass::None,
                    fetch: FetchPlan::All,
                }
            }
            Some(p) => p,
        };

        if predicate.has_function() {
            return QueryPlan {
                class: CostClass::Fn,
                fetch: FetchPlan::All,
            };
        }

        match predicate {
            Where::Cond { column, op, value } if self.narrows(column, *op) => QueryPlan {
                class: CostClass::Fast,
                fetch: self.fetch_for(&[(column.as_str(), *op, value)]),
            },
            Where::And(terms) => {
                let conds: Option<Vec<(&str, Op, &Value)>> = terms
                    .iter()
                    .map(|t| match t {
                        Where::Cond { column, op, value } => Some((column.as_str(), *op, value)),
                        _ => None,
                    })
                    .collect();
                match conds {
                    Some(conds) if conds.iter().any(|(c, op, _)| self.narrows(c, *op)) => QueryPlan {
                        class: CostClass::Medium,
                        fetch: self.fetch_for(&conds),
                    },
                    _ => slow(),
                }
            }
            _ => slow(),
        }
    }

    fn is_pk(&self, column: &str) -> bool {
        self.model.pk() == Some(column)
    }

    fn narrows(&self, column: &str, op: Op) -> bool {
        op.is_indexable() && (self.is_pk(column) || self.model.column(column).map_or(false, |c| c.is_indexed()))
    }

    /// Picks the narrowing term and builds the fetch plan from it
    fn fetch_for(&self, conds: &[(&str, Op, &Value)]) -> FetchPlan {
        let mut candidates: Vec<(u8, &str, Op, &Value)> = conds
            .iter()
            .filter(|(c, op, _)| self.narrows(c, *op))
            .map(|&(c, op, v)| {
                let rank = match (self.is_pk(c), op.is_equality()) {
                    (true, true) => 0,
                    (true, false) => 1,
                    (false, true) => 2,
                    (false, false) => 3,
                };
                (rank, c, op, v)
            })
            .collect();
        candidates.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let (_, column, op, value) = match candidates.first() {
            Some(c) => *c,
            None => return FetchPlan::All,
        };
        let pk = self.is_pk(column);

        if op.is_equality() {
            let values = match op {
                Op::In => value.to_list(),
                _ => vec![value.clone()],
            };
            return if pk {
                FetchPlan::PkKeys(values)
            } else {
                FetchPlan::IndexKeys {
                    column: column.to_string(),
                    values,
                }
            };
        }

        let (low, high) = merge_range(column, conds);
        if pk {
            FetchPlan::PkRange { low, high }
        } else {
            FetchPlan::IndexRange {
                column: column.to_string(),
                low,
                high,
            }
        }
    }
}

fn slow() -> QueryPlan {
    QueryPlan {
        class: CostClass::Slow,
        fetch: FetchPlan::All,
    }
}

/// Intersects every range term on `column` into one inclusive window.
/// Exclusive bounds are widened to inclusive; the in-memory filter
/// drops the boundary rows.
fn merge_range(column: &str, conds: &[(&str, Op, &Value)]) -> (Option<Value>, Option<Value>) {
    let mut low: Option<Value> = None;
    let mut high: Option<Value> = None;

    let mut raise = |v: &Value| {
        if low.as_ref().map_or(true, |l| v > l) {
            low = Some(v.clone());
        }
    };
    let mut lower_high = Vec::new();

    for (c, op, value) in conds {
        if *c != column {
            continue;
        }
        match op {
            Op::Gt | Op::Gte => raise(value),
            Op::Lt | Op::Lte => lower_high.push((*value).clone()),
            Op::Between => {
                if let Some(bounds) = value.as_array().filter(|b| b.len() == 2) {
                    raise(&bounds[0]);
                    lower_high.push(bounds[1].clone());
                }
            }
            _ => {}
        }
    }

    for v in lower_high {
        if high.as_ref().map_or(true, |h| v < *h) {
            high = Some(v);
        }
    }
    (low, high)
}

/// Checks operand shapes, regex syntax and helper names
pub fn validate_predicate(predicate: &Where, helpers: &PredicateHelpers) -> PlannerResult<()> {
    match predicate {
        Where::Cond { column, op, value } => validate_operand(column, *op, value),
        Where::And(terms) | Where::Or(terms) => {
            if terms.is_empty() {
                return Err(PlannerError::predicate_invalid("empty AND/OR"));
            }
            terms.iter().try_for_each(|t| validate_predicate(t, helpers))
        }
        Where::Not(inner) => validate_predicate(inner, helpers),
        Where::Fn { name, op, value, .. } => {
            helpers
                .get(name)
                .map_err(|_| PlannerError::unknown_function(name))?;
            validate_operand(name, *op, value)
        }
    }
}

fn validate_operand(column: &str, op: Op, value: &Value) -> PlannerResult<()> {
    match op {
        Op::In | Op::NotIn | Op::Intersect | Op::IntersectAll | Op::NotIntersect => {
            if value.as_array().is_none() {
                return Err(PlannerError::operand_invalid(
                    column,
                    format!("{} needs an array operand", op),
                ));
            }
        }
        Op::Between | Op::NotBetween => {
            if value.as_array().map(|a| a.len()) != Some(2) {
                return Err(PlannerError::operand_invalid(
                    column,
                    format!("{} needs a two-element array", op),
                ));
            }
        }
        Op::Like | Op::NotLike | Op::Prefix => {
            if value.as_str().is_none() {
                return Err(PlannerError::operand_invalid(
                    column,
                    format!("{} needs a string operand", op),
                ));
            }
        }
        Op::Regexp => {
            let pattern = value.as_str().ok_or_else(|| {
                PlannerError::operand_invalid(column, "REGEXP needs a string pattern")
            })?;
            Regex::new(pattern)
                .map_err(|e| PlannerError::operand_invalid(column, format!("invalid regex: {}", e)))?;
        }
        _ => {}
    }
    Ok(())
}
