//! Result sorting for query execution
//!
//! Multi-key, stable. Nulls sort last in either direction.

use std::cmp::Ordering;

use crate::planner::{SortDirection, SortSpec};
use crate::value::{get_path, Row, Value};

static NULL: Value = Value::Null;

/// Sorts result rows
pub struct ResultSorter;

impl ResultSorter {
    /// Sorts rows by each key in turn; ties keep their input order.
    pub fn sort(rows: &mut [Row], specs: &[SortSpec]) {
        if specs.is_empty() {
            return;
        }
        rows.sort_by(|a, b| Self::compare_rows(&[a], &[b], specs));
    }

    /// Sorts `(projected, source)` pairs. Keys are read from the projected
    /// row first, so aliases work, then from the source row, so columns
    /// left out of the select list still order the result.
    pub fn sort_projected(pairs: &mut [(Row, Row)], specs: &[SortSpec]) {
        if specs.is_empty() {
            return;
        }
        pairs.sort_by(|(pa, sa), (pb, sb)| Self::compare_rows(&[pa, sa], &[pb, sb], specs));
    }

    fn compare_rows(a: &[&Row], b: &[&Row], specs: &[SortSpec]) -> Ordering {
        for spec in specs {
            let ordering = Self::compare_values(
                Self::lookup(a, &spec.column),
                Self::lookup(b, &spec.column),
                spec.direction,
            );
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    fn lookup<'r>(layers: &[&'r Row], column: &str) -> &'r Value {
        layers.iter().find_map(|row| get_path(*row, column)).unwrap_or(&NULL)
    }

    fn compare_values(a: &Value, b: &Value, direction: SortDirection) -> Ordering {
        match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => match direction {
                SortDirection::Asc => a.cmp(b),
                SortDirection::Desc => b.cmp(a),
            },
        }
    }
}
