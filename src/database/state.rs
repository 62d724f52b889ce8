//! In-memory state the core keeps per table
//!
//! Secondary indexes, tries and TTL write times are only touched after the
//! adapter confirmed the write or delete they describe.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::TableConfig;
use crate::index::{IndexManager, TrieIndex};
use crate::schema::{ColumnDef, TableModel};
use crate::value::{Row, Value};

/// Primary key column added to models that declare none
pub const IMPLICIT_PK: &str = "_id";

/// Adds an auto-increment `_id` key to a model without a primary key
pub fn with_implicit_pk(mut model: TableModel) -> TableModel {
    if model.pk().is_none() {
        model.columns.insert(
            0,
            ColumnDef::new(IMPLICIT_PK, "int").with_prop("pk").with_prop("ai"),
        );
    }
    model
}

#[derive(Debug)]
pub(crate) struct TableState {
    pub model: TableModel,
    /// Whether the adapter keeps the primary key index sorted
    pub sorted: bool,
    pub indexes: IndexManager,
    pub tries: BTreeMap<String, TrieIndex>,
    pub ttl: Option<Duration>,
    /// Write time of every row written since the instance started
    pub write_times: BTreeMap<Value, DateTime<Utc>>,
    pub prune_dangling_refs: bool,
}

impl TableState {
    pub fn new(model: TableModel, sorted: bool, config: &TableConfig) -> Self {
        let indexes = IndexManager::for_model(&model);
        let tries = model
            .trie_columns()
            .map(|c| (c.key.clone(), TrieIndex::new()))
            .collect();
        Self {
            model,
            sorted,
            indexes,
            tries,
            ttl: config.ttl_secs.map(Duration::from_secs),
            write_times: BTreeMap::new(),
            prune_dangling_refs: config.prune_dangling_refs,
        }
    }

    pub fn pk(&self) -> &str {
        self.model.pk().unwrap_or(IMPLICIT_PK)
    }

    /// Column keys in model order
    pub fn columns(&self) -> Vec<String> {
        self.model.columns.iter().map(|c| c.key.clone()).collect()
    }

    /// Rebuilds indexes and tries from rows the adapter already holds
    pub fn load(&mut self, rows: &[Row]) {
        let pk = self.model.pk().unwrap_or(IMPLICIT_PK);
        self.indexes
            .rebuild(rows.iter().filter_map(|r| r.get(pk).map(|k| (k, r))));
        for trie in self.tries.values_mut() {
            trie.clear();
        }
        for row in rows {
            index_words(&mut self.tries, row, true);
        }
    }

    pub fn apply_write(&mut self, pk: &Value, old: Option<&Row>, new: &Row, now: DateTime<Utc>) {
        self.indexes.apply_write(pk, old, new);
        if let Some(old) = old {
            index_words(&mut self.tries, old, false);
        }
        index_words(&mut self.tries, new, true);
        if self.ttl.is_some() {
            self.write_times.insert(pk.clone(), now);
        }
    }

    pub fn apply_delete(&mut self, pk: &Value, row: &Row) {
        self.indexes.apply_delete(pk, row);
        index_words(&mut self.tries, row, false);
        self.write_times.remove(pk);
    }

    pub fn is_expired(&self, pk: &Value, now: DateTime<Utc>) -> bool {
        match (self.ttl, self.write_times.get(pk)) {
            (Some(ttl), Some(written)) => elapsed_beyond(*written, now, ttl),
            _ => false,
        }
    }

    /// Keys whose TTL ran out by `now`
    pub fn expired_keys(&self, now: DateTime<Utc>) -> BTreeSet<Value> {
        match self.ttl {
            Some(ttl) => self
                .write_times
                .iter()
                .filter(|(_, written)| elapsed_beyond(**written, now, ttl))
                .map(|(pk, _)| pk.clone())
                .collect(),
            None => BTreeSet::new(),
        }
    }
}

fn elapsed_beyond(written: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    now.signed_duration_since(written)
        .to_std()
        .map(|elapsed| elapsed > ttl)
        .unwrap_or(false)
}

fn index_words(tries: &mut BTreeMap<String, TrieIndex>, row: &Row, insert: bool) {
    for (column, trie) in tries.iter_mut() {
        if let Some(word) = row.get(column).and_then(|v| v.as_str()) {
            if insert {
                trie.insert_value(word);
            } else {
                trie.remove_value(word);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> TableModel {
        TableModel::new(
            "users",
            vec![
                ColumnDef::new("id", "int").with_prop("pk"),
                ColumnDef::new("name", "string").with_prop("trie"),
                ColumnDef::new("city", "string").with_prop("idx"),
            ],
        )
    }

    fn row(id: i64, name: &str, city: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), Value::Int(id));
        row.insert("name".into(), Value::from(name));
        row.insert("city".into(), Value::from(city));
        row
    }

    #[test]
    fn test_implicit_pk() {
        let model = with_implicit_pk(TableModel::new("logs", vec![ColumnDef::new("line", "string")]));
        assert_eq!(model.pk(), Some(IMPLICIT_PK));
        assert!(model.is_auto_increment());

        let kept = with_implicit_pk(model.clone());
        assert_eq!(kept.columns.len(), 2);
    }

    #[test]
    fn test_write_then_delete_maintains_indexes() {
        let config = TableConfig::new("users", model().columns);
        let mut state = TableState::new(model(), true, &config);
        let now = Utc::now();

        let first = row(1, "Alice", "Oslo");
        state.apply_write(&Value::Int(1), None, &first, now);
        assert_eq!(state.indexes.lookup_eq("city", &Value::from("Oslo")), vec![Value::Int(1)]);
        assert_eq!(state.tries["name"].trie().get_prefix("al"), vec!["alice".to_string()]);

        let renamed = row(1, "Bob", "Rome");
        state.apply_write(&Value::Int(1), Some(&first), &renamed, now);
        assert!(state.indexes.lookup_eq("city", &Value::from("Oslo")).is_empty());
        assert!(state.tries["name"].trie().get_prefix("al").is_empty());

        state.apply_delete(&Value::Int(1), &renamed);
        assert!(state.indexes.lookup_eq("city", &Value::from("Rome")).is_empty());
        assert!(!state.tries["name"].trie().is_prefix("bob"));
    }

    #[test]
    fn test_ttl_expiry() {
        let config = TableConfig::new("users", model().columns).with_ttl(60);
        let mut state = TableState::new(model(), true, &config);
        let written = Utc::now();
        state.apply_write(&Value::Int(1), None, &row(1, "a", "b"), written);

        assert!(!state.is_expired(&Value::Int(1), written + chrono::Duration::seconds(30)));
        let later = written + chrono::Duration::seconds(61);
        assert!(state.is_expired(&Value::Int(1), later));
        assert_eq!(state.expired_keys(later).len(), 1);

        // rows the instance never wrote do not expire
        assert!(!state.is_expired(&Value::Int(2), later));
    }

    #[test]
    fn test_load_rebuilds_from_rows() {
        let config = TableConfig::new("users", model().columns);
        let mut state = TableState::new(model(), true, &config);
        state.load(&[row(1, "Ann", "Oslo"), row(2, "Andy", "Oslo")]);
        assert_eq!(state.indexes.lookup_eq("city", &Value::from("Oslo")).len(), 2);
        assert_eq!(state.tries["name"].trie().get_prefix("an").len(), 2);
    }
}
