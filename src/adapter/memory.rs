//! In-memory reference adapter
//!
//! Keeps one [`SortedIndex`] per table next to a key-to-row map. Streaming
//! reads snapshot the key list when they start, so rows written during a
//! read are not observed by it and the index is never read torn.

use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::index::SortedIndex;
use crate::schema::TableModel;
use crate::value::{Row, Value};

use super::adapter::{Adapter, AdapterFuture, RowCallback, ScanFlow};
use super::errors::{AdapterError, AdapterResult};

/// Adapter operations a failure can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterOp {
    Connect,
    MakeTable,
    Write,
    ReadPk,
    Read,
    Delete,
    GetIndex,
}

impl AdapterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterOp::Connect => "connect",
            AdapterOp::MakeTable => "make_table",
            AdapterOp::Write => "write",
            AdapterOp::ReadPk => "read_pk",
            AdapterOp::Read => "read",
            AdapterOp::Delete => "delete_pk",
            AdapterOp::GetIndex => "get_index",
        }
    }
}

#[derive(Debug)]
struct MemoryTable {
    pk: Option<String>,
    index: SortedIndex,
    rows: BTreeMap<Value, Row>,
}

#[derive(Debug, Default)]
struct MemoryState {
    instance_id: Option<String>,
    tables: BTreeMap<String, MemoryTable>,
}

impl MemoryState {
    fn table(&self, name: &str) -> AdapterResult<&MemoryTable> {
        if self.instance_id.is_none() {
            return Err(AdapterError::NotConnected);
        }
        self.tables
            .get(name)
            .ok_or_else(|| AdapterError::UnknownTable(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> AdapterResult<&mut MemoryTable> {
        if self.instance_id.is_none() {
            return Err(AdapterError::NotConnected);
        }
        self.tables
            .get_mut(name)
            .ok_or_else(|| AdapterError::UnknownTable(name.to_string()))
    }
}

/// In-memory adapter
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    state: RwLock<MemoryState>,
    failures: Mutex<Vec<AdapterOp>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call of `op` fail with [`AdapterError::Injected`].
    /// Injections queue up and are consumed one per call.
    pub fn inject_failure(&self, op: AdapterOp) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(op);
        }
    }

    /// Connected instance id
    pub fn instance_id(&self) -> Option<String> {
        self.state.read().ok().and_then(|s| s.instance_id.clone())
    }

    fn check(&self, op: AdapterOp) -> AdapterResult<()> {
        let mut failures = self
            .failures
            .lock()
            .map_err(|_| AdapterError::Internal("Lock poisoned".into()))?;
        if let Some(pos) = failures.iter().position(|f| *f == op) {
            failures.remove(pos);
            return Err(AdapterError::Injected(op.as_str().to_string()));
        }
        Ok(())
    }

    fn read_state(&self) -> AdapterResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| AdapterError::Internal("Lock poisoned".into()))
    }

    fn write_state(&self) -> AdapterResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| AdapterError::Internal("Lock poisoned".into()))
    }

    /// Snapshots keys under the lock, then hands rows out one at a time
    fn stream(
        &self,
        table: &str,
        snapshot: impl FnOnce(&SortedIndex) -> Vec<Value>,
        on_row: RowCallback<'_>,
    ) -> AdapterResult<()> {
        self.check(AdapterOp::Read)?;
        let keys = snapshot(&self.read_state()?.table(table)?.index);

        for key in keys {
            let row = self.read_state()?.table(table)?.rows.get(&key).cloned();
            if let Some(row) = row {
                if on_row(row) == ScanFlow::Stop {
                    break;
                }
            }
        }
        Ok(())
    }
}

impl Adapter for MemoryAdapter {
    fn name(&self) -> &str {
        "memory"
    }

    fn connect<'a>(&'a self, instance_id: &'a str) -> AdapterFuture<'a, ()> {
        Box::pin(async move {
            self.check(AdapterOp::Connect)?;
            self.write_state()?.instance_id = Some(instance_id.to_string());
            Ok(())
        })
    }

    fn make_table<'a>(&'a self, model: &'a TableModel, sorted: bool) -> AdapterFuture<'a, ()> {
        Box::pin(async move {
            self.check(AdapterOp::MakeTable)?;
            let mut state = self.write_state()?;
            if state.instance_id.is_none() {
                return Err(AdapterError::NotConnected);
            }
            // reopening keeps the stored rows; a different key column is a conflict
            if let Some(existing) = state.tables.get(&model.name) {
                if existing.pk.as_deref() == model.pk() {
                    return Ok(());
                }
                return Err(AdapterError::TableExists(model.name.clone()));
            }
            state.tables.insert(
                model.name.clone(),
                MemoryTable {
                    pk: model.pk().map(str::to_string),
                    index: SortedIndex::new(sorted, model.is_auto_increment()),
                    rows: BTreeMap::new(),
                },
            );
            Ok(())
        })
    }

    fn destroy_table<'a>(&'a self, table: &'a str) -> AdapterFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.write_state()?;
            state.table(table)?;
            state.tables.remove(table);
            Ok(())
        })
    }

    fn disconnect<'a>(&'a self) -> AdapterFuture<'a, ()> {
        Box::pin(async move {
            self.write_state()?.instance_id = None;
            Ok(())
        })
    }

    fn write<'a>(&'a self, table: &'a str, pk: Option<Value>, mut row: Row) -> AdapterFuture<'a, Row> {
        Box::pin(async move {
            self.check(AdapterOp::Write)?;
            let mut state = self.write_state()?;
            let t = state.table_mut(table)?;

            let key = match pk {
                Some(key) => key,
                None if t.index.does_auto_increment() => Value::Int(t.index.next_auto_increment()),
                None => return Err(AdapterError::KeyRequired(table.to_string())),
            };
            if let Some(pk_column) = &t.pk {
                row.insert(pk_column.clone(), key.clone());
            }

            t.index.add(key.clone());
            t.rows.insert(key, row.clone());
            Ok(row)
        })
    }

    fn read_pk<'a>(&'a self, table: &'a str, pk: &'a Value) -> AdapterFuture<'a, Option<Row>> {
        Box::pin(async move {
            self.check(AdapterOp::ReadPk)?;
            Ok(self.read_state()?.table(table)?.rows.get(pk).cloned())
        })
    }

    fn read_all<'a>(&'a self, table: &'a str, on_row: RowCallback<'a>) -> AdapterFuture<'a, ()> {
        Box::pin(async move { self.stream(table, |index| index.keys().to_vec(), on_row) })
    }

    fn read_pk_range<'a>(
        &'a self,
        table: &'a str,
        low: Option<&'a Value>,
        high: Option<&'a Value>,
        on_row: RowCallback<'a>,
    ) -> AdapterFuture<'a, ()> {
        Box::pin(async move { self.stream(table, |index| index.range(low, high), on_row) })
    }

    fn read_offset_limit<'a>(
        &'a self,
        table: &'a str,
        offset: usize,
        limit: usize,
        reverse: bool,
        on_row: RowCallback<'a>,
    ) -> AdapterFuture<'a, ()> {
        Box::pin(async move {
            self.stream(table, |index| index.keys_at(offset, limit, reverse), on_row)
        })
    }

    fn delete_pk<'a>(&'a self, table: &'a str, pk: &'a Value) -> AdapterFuture<'a, ()> {
        Box::pin(async move {
            self.check(AdapterOp::Delete)?;
            let mut state = self.write_state()?;
            let t = state.table_mut(table)?;
            if t.rows.remove(pk).is_some() {
                t.index.remove(pk);
            }
            Ok(())
        })
    }

    fn get_index<'a>(&'a self, table: &'a str) -> AdapterFuture<'a, Vec<Value>> {
        Box::pin(async move {
            self.check(AdapterOp::GetIndex)?;
            Ok(self.read_state()?.table(table)?.index.keys().to_vec())
        })
    }

    fn get_number_of_records<'a>(&'a self, table: &'a str) -> AdapterFuture<'a, usize> {
        Box::pin(async move { Ok(self.read_state()?.table(table)?.rows.len()) })
    }

    fn next_auto_increment<'a>(&'a self, table: &'a str) -> AdapterFuture<'a, i64> {
        Box::pin(async move { Ok(self.read_state()?.table(table)?.index.next_auto_increment()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDef;

    fn users() -> TableModel {
        TableModel::new(
            "users",
            vec![
                ColumnDef::new("id", "int").with_prop("pk").with_prop("ai"),
                ColumnDef::new("name", "string"),
            ],
        )
    }

    fn row(name: &str) -> Row {
        let mut row = Row::new();
        row.insert("name".into(), Value::from(name));
        row
    }

    async fn connected() -> MemoryAdapter {
        let adapter = MemoryAdapter::new();
        adapter.connect("test").await.unwrap();
        adapter.make_table(&users(), true).await.unwrap();
        adapter
    }

    async fn collect_all(adapter: &MemoryAdapter) -> Vec<Row> {
        let mut rows = Vec::new();
        adapter
            .read_all("users", &mut |r| {
                rows.push(r);
                ScanFlow::Continue
            })
            .await
            .unwrap();
        rows
    }

    #[tokio::test]
    async fn test_make_table_reopens_existing() {
        let adapter = connected().await;
        adapter.write("users", None, row("ann")).await.unwrap();

        adapter.disconnect().await.unwrap();
        adapter.connect("test").await.unwrap();
        adapter.make_table(&users(), true).await.unwrap();
        assert_eq!(collect_all(&adapter).await.len(), 1);
        assert_eq!(adapter.next_auto_increment("users").await.unwrap(), 2);

        let rekeyed = TableModel::new(
            "users",
            vec![
                ColumnDef::new("name", "string").with_prop("pk"),
                ColumnDef::new("id", "int"),
            ],
        );
        let err = adapter.make_table(&rekeyed, true).await.unwrap_err();
        assert_eq!(err, AdapterError::TableExists("users".into()));
    }

    #[tokio::test]
    async fn test_requires_connect() {
        let adapter = MemoryAdapter::new();
        let err = adapter.make_table(&users(), true).await.unwrap_err();
        assert_eq!(err, AdapterError::NotConnected);
    }

    #[tokio::test]
    async fn test_auto_increment_assignment() {
        let adapter = connected().await;
        assert_eq!(adapter.next_auto_increment("users").await.unwrap(), 1);

        let a = adapter.write("users", None, row("a")).await.unwrap();
        let b = adapter.write("users", None, row("b")).await.unwrap();
        assert_eq!(a.get("id"), Some(&Value::Int(1)));
        assert_eq!(b.get("id"), Some(&Value::Int(2)));

        adapter.write("users", Some(Value::Int(10)), row("c")).await.unwrap();
        let d = adapter.write("users", None, row("d")).await.unwrap();
        assert_eq!(d.get("id"), Some(&Value::Int(11)));
    }

    #[tokio::test]
    async fn test_explicit_keys_are_sorted() {
        let adapter = connected().await;
        for id in [3, 1, 2] {
            adapter.write("users", Some(Value::Int(id)), row("x")).await.unwrap();
        }
        assert_eq!(
            adapter.get_index("users").await.unwrap(),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );

        let mut ids = Vec::new();
        let (lo, hi) = (Value::Int(1), Value::Int(2));
        adapter
            .read_pk_range("users", Some(&lo), Some(&hi), &mut |r| {
                ids.push(r.get("id").cloned().unwrap_or_default());
                ScanFlow::Continue
            })
            .await
            .unwrap();
        assert_eq!(ids, vec![Value::Int(1), Value::Int(2)]);
    }

    #[tokio::test]
    async fn test_stop_short_circuits() {
        let adapter = connected().await;
        for _ in 0..5 {
            adapter.write("users", None, row("x")).await.unwrap();
        }
        let mut seen = 0;
        adapter
            .read_all("users", &mut |_| {
                seen += 1;
                if seen == 2 {
                    ScanFlow::Stop
                } else {
                    ScanFlow::Continue
                }
            })
            .await
            .unwrap();
        assert_eq!(seen, 2);
    }

    #[tokio::test]
    async fn test_offset_limit_reverse() {
        let adapter = connected().await;
        for _ in 0..5 {
            adapter.write("users", None, row("x")).await.unwrap();
        }
        let mut ids = Vec::new();
        adapter
            .read_offset_limit("users", 1, 2, true, &mut |r| {
                ids.push(r.get("id").cloned().unwrap_or_default());
                ScanFlow::Continue
            })
            .await
            .unwrap();
        assert_eq!(ids, vec![Value::Int(4), Value::Int(3)]);
    }

    #[tokio::test]
    async fn test_delete_updates_index() {
        let adapter = connected().await;
        adapter.write("users", None, row("a")).await.unwrap();
        adapter.write("users", None, row("b")).await.unwrap();
        adapter.delete_pk("users", &Value::Int(1)).await.unwrap();
        adapter.delete_pk("users", &Value::Int(99)).await.unwrap();

        assert_eq!(adapter.get_index("users").await.unwrap(), vec![Value::Int(2)]);
        assert_eq!(adapter.get_number_of_records("users").await.unwrap(), 1);
        assert_eq!(collect_all(&adapter).await.len(), 1);
        assert_eq!(adapter.read_pk("users", &Value::Int(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed() {
        let adapter = connected().await;
        adapter.inject_failure(AdapterOp::Write);

        let err = adapter.write("users", None, row("a")).await.unwrap_err();
        assert_eq!(err, AdapterError::Injected("write".into()));
        assert!(adapter.write("users", None, row("a")).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let adapter = connected().await;
        let err = adapter.get_index("nope").await.unwrap_err();
        assert_eq!(err, AdapterError::UnknownTable("nope".into()));
        assert!(adapter.make_table(&users(), true).await.is_err());
    }
}
