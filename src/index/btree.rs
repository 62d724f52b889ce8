//! BTreeMap-based secondary index structures
//!
//! Indexes use BTreeMap<Value, Vec<PrimaryKey>> for deterministic ordering.
//! Primary keys under one column value are always sorted ascending.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::value::Value;

/// A single column index: column value to the primary keys holding it.
#[derive(Debug, Default, Clone)]
pub struct IndexTree {
    tree: BTreeMap<Value, Vec<Value>>,
}

impl IndexTree {
    /// Creates a new empty index tree
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    /// Insert a primary key for a column value.
    ///
    /// Maintains sorted ascending order.
    pub fn insert(&mut self, key: Value, pk: Value) {
        let pks = self.tree.entry(key).or_default();

        match pks.binary_search(&pk) {
            Ok(_) => {}
            Err(pos) => pks.insert(pos, pk),
        }
    }

    /// Remove a primary key for a column value.
    ///
    /// If the value has no more keys, removes the value entirely.
    pub fn remove(&mut self, key: &Value, pk: &Value) {
        if let Some(pks) = self.tree.get_mut(key) {
            if let Ok(pos) = pks.binary_search(pk) {
                pks.remove(pos);
            }
            if pks.is_empty() {
                self.tree.remove(key);
            }
        }
    }

    /// Lookup all primary keys for an exact value match.
    pub fn lookup_eq(&self, key: &Value) -> Vec<Value> {
        self.tree.get(key).cloned().unwrap_or_default()
    }

    /// Lookup primary keys for values in [min, max] (inclusive).
    ///
    /// Returns keys sorted ascending. A missing bound is open.
    pub fn lookup_range(&self, min: Option<&Value>, max: Option<&Value>) -> Vec<Value> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Vec::new();
            }
        }

        let min_bound = min.map_or(Bound::Unbounded, Bound::Included);
        let max_bound = max.map_or(Bound::Unbounded, Bound::Included);

        let mut result: Vec<Value> = self
            .tree
            .range::<Value, _>((min_bound, max_bound))
            .flat_map(|(_, pks)| pks.iter().cloned())
            .collect();

        // Combining several values can interleave keys
        result.sort();
        result.dedup();
        result
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns the number of distinct values
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    /// Returns the total number of indexed primary keys
    pub fn entry_count(&self) -> usize {
        self.tree.values().map(|v| v.len()).sum()
    }
}
