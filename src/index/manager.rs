//! Secondary index manager for one table
//!
//! Maintains an [`IndexTree`] per `idx` column. Indexes are derived,
//! in-memory state: rebuilt from the adapter when a table is registered
//! and updated only after the adapter confirms a write or delete.
//!
//! # API
//!
//! - `rebuild(rows)` - Rebuild every index from a full row scan
//! - `apply_write(pk, old, new)` - Update after a confirmed write
//! - `apply_delete(pk, row)` - Update after a confirmed delete
//! - `lookup_eq(column, value)` - Exact match lookup
//! - `lookup_range(column, min, max)` - Range lookup

use std::collections::BTreeMap;

use crate::schema::TableModel;
use crate::value::{Row, Value};

use super::btree::IndexTree;

/// Secondary indexes of one table
#[derive(Debug, Default, Clone)]
pub struct IndexManager {
    /// Column -> index tree. BTreeMap keeps iteration deterministic.
    indexes: BTreeMap<String, IndexTree>,
}

impl IndexManager {
    /// Creates empty indexes for every `idx` column of `model`
    pub fn for_model(model: &TableModel) -> Self {
        Self {
            indexes: model
                .indexed_columns()
                .map(|c| (c.key.clone(), IndexTree::new()))
                .collect(),
        }
    }

    /// Returns true when `column` carries a secondary index
    pub fn has_index(&self, column: &str) -> bool {
        self.indexes.contains_key(column)
    }

    pub fn indexed_columns(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(String::as_str)
    }

    /// Rebuild all indexes from `(pk, row)` pairs.
    pub fn rebuild<'a>(&mut self, rows: impl IntoIterator<Item = (&'a Value, &'a Row)>) {
        for tree in self.indexes.values_mut() {
            tree.clear();
        }
        for (pk, row) in rows {
            self.index_row(pk, row);
        }
    }

    fn index_row(&mut self, pk: &Value, row: &Row) {
        for (column, tree) in self.indexes.iter_mut() {
            let value = row.get(column).cloned().unwrap_or_default();
            tree.insert(value, pk.clone());
        }
    }

    fn unindex_row(&mut self, pk: &Value, row: &Row) {
        for (column, tree) in self.indexes.iter_mut() {
            let value = row.get(column).cloned().unwrap_or_default();
            tree.remove(&value, pk);
        }
    }

    /// Apply a write (insert or update) to indexes.
    ///
    /// Called AFTER the adapter confirms the write.
    pub fn apply_write(&mut self, pk: &Value, old: Option<&Row>, new: &Row) {
        if let Some(old) = old {
            self.unindex_row(pk, old);
        }
        self.index_row(pk, new);
    }

    /// Apply a delete to indexes.
    ///
    /// Called AFTER the adapter confirms the delete.
    pub fn apply_delete(&mut self, pk: &Value, row: &Row) {
        self.unindex_row(pk, row);
    }

    /// Primary keys whose `column` equals `value`, sorted ascending.
    pub fn lookup_eq(&self, column: &str, value: &Value) -> Vec<Value> {
        self.indexes
            .get(column)
            .map(|tree| tree.lookup_eq(value))
            .unwrap_or_default()
    }

    /// Primary keys whose `column` lies in [min, max], sorted ascending.
    pub fn lookup_range(&self, column: &str, min: Option<&Value>, max: Option<&Value>) -> Vec<Value> {
        self.indexes
            .get(column)
            .map(|tree| tree.lookup_range(min, max))
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        for tree in self.indexes.values_mut() {
            tree.clear();
        }
    }
}
