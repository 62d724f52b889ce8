//! Join row expansion
//!
//! Joined rows carry `table.column` keys for every side. The base table's
//! rows are prefixed before the first join.

use crate::planner::{JoinKind, JoinSpec};
use crate::value::{get_path, Row, Value};

use super::filters::compare;

/// Rows of one joined table, already fetched
#[derive(Debug, Clone)]
pub struct JoinInput {
    pub spec: JoinSpec,
    /// Column keys of the joined table, used to null-fill unmatched sides
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Prefixes every key of a row with its table name
pub fn qualify(table: &str, row: Row) -> Row {
    row.into_iter()
        .map(|(k, v)| (format!("{}.{}", table, k), v))
        .collect()
}

fn null_row(table: &str, columns: &[String]) -> Row {
    columns
        .iter()
        .map(|c| (format!("{}.{}", table, c), Value::Null))
        .collect()
}

fn merge(left: &Row, right: &Row) -> Row {
    let mut out = left.clone();
    out.extend(right.iter().map(|(k, v)| (k.clone(), v.clone())));
    out
}

/// Applies one join to already-qualified left rows.
///
/// `left_columns` are the qualified keys of the left side, used when a
/// right or outer join emits right rows without a partner.
pub fn apply_join(left: Vec<Row>, left_columns: &[String], input: JoinInput) -> Vec<Row> {
    let table = input.spec.table.as_str();
    let right: Vec<Row> = input.rows.into_iter().map(|r| qualify(table, r)).collect();
    let right_nulls = null_row(table, &input.columns);
    let left_nulls: Row = left_columns.iter().map(|c| (c.clone(), Value::Null)).collect();

    let on = match (&input.spec.on, input.spec.kind) {
        (_, JoinKind::Cross) | (None, _) => {
            let mut out = Vec::with_capacity(left.len() * right.len());
            for l in &left {
                for r in &right {
                    out.push(merge(l, r));
                }
            }
            return out;
        }
        (Some(on), _) => on,
    };

    let joined = |l: &Row, r: &Row| {
        let lv = get_path(l, &on.left).or_else(|| get_path(r, &on.left));
        let rv = get_path(r, &on.right).or_else(|| get_path(l, &on.right));
        compare(on.op, lv.unwrap_or(&Value::Null), rv.unwrap_or(&Value::Null))
    };

    let mut out = Vec::new();
    let mut right_matched = vec![false; right.len()];

    for l in &left {
        let mut matched = false;
        for (i, r) in right.iter().enumerate() {
            if joined(l, r) {
                matched = true;
                right_matched[i] = true;
                out.push(merge(l, r));
            }
        }
        if !matched && matches!(input.spec.kind, JoinKind::Left | JoinKind::Outer) {
            out.push(merge(l, &right_nulls));
        }
    }

    if matches!(input.spec.kind, JoinKind::Right | JoinKind::Outer) {
        for (r, matched) in right.iter().zip(right_matched) {
            if !matched {
                out.push(merge(&left_nulls, r));
            }
        }
    }

    out
}
