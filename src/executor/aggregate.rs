//! Grouping, aggregation and projection
//!
//! Groups are bucketed by the tuple of `group_by` values and emitted in
//! first-seen order. Aggregates fold every row of their group through the
//! registry's step function; the accumulator's `result` is the output.
//!
//! Plain columns of an aggregated group are read from the row an
//! aggregate tracked (MIN / MAX), or else the group's first row.

use std::collections::BTreeMap;

use crate::functions::{Accumulator, AggregateFn, FunctionCall, FunctionRegistry, QueryFunction, ScalarFn};
use crate::planner::{SelectColumn, SelectExpr};
use crate::value::{get_path, Row, Value};

use super::errors::ExecutorResult;

enum Resolved<'q> {
    Column(&'q str),
    Scalar(&'q FunctionCall, ScalarFn),
    Aggregate(&'q FunctionCall, Accumulator, AggregateFn),
}

/// Applies `group_by` and the select list to filtered rows
pub struct Projector<'q> {
    columns: Vec<(&'q str, Resolved<'q>)>,
    group_by: &'q [String],
}

impl<'q> Projector<'q> {
    pub fn new(select: &'q [SelectColumn], group_by: &'q [String], functions: &FunctionRegistry) -> ExecutorResult<Self> {
        let mut columns = Vec::with_capacity(select.len());
        for column in select {
            let resolved = match &column.expr {
                SelectExpr::Column(name) => Resolved::Column(name),
                SelectExpr::Call(call) => match functions.get(&call.name)?.as_ref() {
                    QueryFunction::Scalar(f) => Resolved::Scalar(call, f.clone()),
                    QueryFunction::Aggregate { start, step } => Resolved::Aggregate(call, start.clone(), step.clone()),
                },
            };
            columns.push((column.output_name(), resolved));
        }
        Ok(Self { columns, group_by })
    }

    fn has_aggregate(&self) -> bool {
        self.columns.iter().any(|(_, r)| matches!(r, Resolved::Aggregate(..)))
    }

    /// Whether projection leaves rows untouched
    pub fn is_identity(&self) -> bool {
        self.columns.is_empty() && self.group_by.is_empty()
    }

    /// Whether each output row comes from exactly one input row
    pub fn is_per_row(&self) -> bool {
        !self.columns.is_empty() && self.group_by.is_empty() && !self.has_aggregate()
    }

    /// Projects a single row; only meaningful when [`Self::is_per_row`]
    pub fn project_row(&self, row: &Row) -> ExecutorResult<Row> {
        self.project(row, &[])
    }

    pub fn apply(&self, rows: Vec<Row>) -> ExecutorResult<Vec<Row>> {
        if self.is_identity() {
            return Ok(rows);
        }
        if !self.has_aggregate() && self.group_by.is_empty() {
            return rows.iter().map(|row| self.project(row, &[])).collect();
        }

        let mut out = Vec::new();
        for group in self.bucket(rows) {
            let accumulators = self.fold(&group);
            let base = accumulators
                .iter()
                .flatten()
                .find_map(|acc| acc.row.as_ref())
                .or_else(|| group.first());
            let empty = Row::new();
            let base = base.unwrap_or(&empty);

            if self.columns.is_empty() {
                out.push(base.clone());
            } else {
                out.push(self.project(base, &accumulators)?);
            }
        }
        Ok(out)
    }

    /// Buckets rows by group key, preserving first-seen order. Without
    /// `group_by` every row lands in one group, which exists even when
    /// there are no rows so that `COUNT(*)` yields 0.
    fn bucket(&self, rows: Vec<Row>) -> Vec<Vec<Row>> {
        if self.group_by.is_empty() {
            return vec![rows];
        }

        let mut positions: BTreeMap<Vec<Value>, usize> = BTreeMap::new();
        let mut groups: Vec<Vec<Row>> = Vec::new();
        for row in rows {
            let key: Vec<Value> = self
                .group_by
                .iter()
                .map(|c| get_path(&row, c).cloned().unwrap_or(Value::Null))
                .collect();
            let position = *positions.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[position].push(row);
        }
        groups
    }

    fn fold(&self, group: &[Row]) -> Vec<Option<Accumulator>> {
        self.columns
            .iter()
            .map(|(_, resolved)| match resolved {
                Resolved::Aggregate(call, start, step) => Some(
                    group
                        .iter()
                        .fold(start.clone(), |acc, row| step(row, acc, &call.resolve_args(row))),
                ),
                _ => None,
            })
            .collect()
    }

    fn project(&self, row: &Row, accumulators: &[Option<Accumulator>]) -> ExecutorResult<Row> {
        let mut out = Row::new();
        for (i, (name, resolved)) in self.columns.iter().enumerate() {
            let value = match resolved {
                Resolved::Column(path) => get_path(row, path).cloned().unwrap_or(Value::Null),
                Resolved::Scalar(call, f) => f(row, &call.resolve_args(row))?,
                Resolved::Aggregate(..) => accumulators
                    .get(i)
                    .and_then(|a| a.as_ref())
                    .map(|a| a.result.clone())
                    .unwrap_or(Value::Null),
            };
            out.insert(name.to_string(), value);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: serde_json::Value) -> Vec<Row> {
        match Value::from(value) {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::Map(m) => Some(m),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn select(cols: &[&str]) -> Vec<SelectColumn> {
        cols.iter().map(|c| SelectColumn::parse(c).unwrap()).collect()
    }

    fn people() -> Vec<Row> {
        rows(json!([
            {"id": 1, "name": "ann", "team": "red", "age": 30},
            {"id": 2, "name": "bob", "team": "blue", "age": 25},
            {"id": 3, "name": "cat", "team": "red", "age": 41},
            {"id": 4, "name": "dan", "team": "blue", "age": 19},
        ]))
    }

    #[test]
    fn test_plain_projection_with_alias() {
        let registry = FunctionRegistry::with_builtins();
        let cols = select(&["name", "UPPER(name) AS loud"]);
        let out = Projector::new(&cols, &[], &registry).unwrap().apply(people()).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out[0]["loud"], Value::from("ANN"));
        assert_eq!(out[0].len(), 2);
    }

    #[test]
    fn test_count_without_group() {
        let registry = FunctionRegistry::with_builtins();
        let cols = select(&["COUNT(*) AS total"]);
        let out = Projector::new(&cols, &[], &registry).unwrap().apply(people()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["total"], Value::Int(4));
    }

    #[test]
    fn test_count_of_nothing_is_zero() {
        let registry = FunctionRegistry::with_builtins();
        let cols = select(&["COUNT(*) AS total"]);
        let out = Projector::new(&cols, &[], &registry).unwrap().apply(Vec::new()).unwrap();
        assert_eq!(out[0]["total"], Value::Int(0));
    }

    #[test]
    fn test_group_by_first_seen_order() {
        let registry = FunctionRegistry::with_builtins();
        let cols = select(&["team", "SUM(age) AS years"]);
        let group_by = vec!["team".to_string()];
        let out = Projector::new(&cols, &group_by, &registry).unwrap().apply(people()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["team"], Value::from("red"));
        assert_eq!(out[0]["years"], Value::Int(71));
        assert_eq!(out[1]["team"], Value::from("blue"));
        assert_eq!(out[1]["years"], Value::Int(44));
    }

    #[test]
    fn test_max_row_supplies_plain_columns() {
        let registry = FunctionRegistry::with_builtins();
        let cols = select(&["name", "MAX(age) AS oldest"]);
        let out = Projector::new(&cols, &[], &registry).unwrap().apply(people()).unwrap();
        assert_eq!(out[0]["oldest"], Value::Int(41));
        assert_eq!(out[0]["name"], Value::from("cat"));
    }

    #[test]
    fn test_group_without_select_returns_first_rows() {
        let registry = FunctionRegistry::with_builtins();
        let group_by = vec!["team".to_string()];
        let out = Projector::new(&[], &group_by, &registry).unwrap().apply(people()).unwrap();
        let ids: Vec<i64> = out.iter().filter_map(|r| r["id"].as_i64()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_unknown_function_rejected() {
        let registry = FunctionRegistry::with_builtins();
        let cols = select(&["MEDIAN(age)"]);
        assert!(Projector::new(&cols, &[], &registry).is_err());
    }
}
