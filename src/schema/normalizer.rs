//! Row normalization against a table model
//!
//! Applied to every row before it is handed to an adapter:
//! - merge the incoming (possibly partial) row over the stored row
//! - cast every declared column to its column type
//! - fill absent columns with their default, or null
//! - drop columns the model does not declare, unless the model carries
//!   a `*` wildcard column

use crate::value::Row;

use super::types::TableModel;

/// Wildcard column key that admits undeclared columns
pub const WILDCARD_COLUMN: &str = "*";

/// Normalizes rows for one table
pub struct RowNormalizer<'a> {
    model: &'a TableModel,
}

impl<'a> RowNormalizer<'a> {
    pub fn new(model: &'a TableModel) -> Self {
        Self { model }
    }

    /// Produces the row to persist from `incoming` merged over `existing`.
    pub fn normalize(&self, incoming: &Row, existing: Option<&Row>) -> Row {
        let mut merged = existing.cloned().unwrap_or_default();
        for (k, v) in incoming {
            merged.insert(k.clone(), v.clone());
        }

        let wildcard = self.model.column(WILDCARD_COLUMN).is_some();
        let mut out = Row::new();

        for col in &self.model.columns {
            if col.key == WILDCARD_COLUMN {
                continue;
            }
            let value = match merged.remove(&col.key) {
                Some(v) if !v.is_null() => col.col_type.coerce(&v),
                _ => col.default.clone().unwrap_or_default(),
            };
            out.insert(col.key.clone(), value);
        }

        if wildcard {
            out.extend(merged);
        }

        out
    }
}
