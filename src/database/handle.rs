//! Database instance handle
//!
//! Query flow (strict order):
//! 1. Validate against the table model (configuration errors surface here)
//! 2. `pending -> processing`
//! 3. Dispatch the action; adapter calls are the only suspension points
//! 4. Update indexes, tries and TTL times after the adapter confirms
//! 5. Publish change events, then keep relationships in sync
//! 6. `processing -> complete`
//!
//! An error at any step after 2 abandons the descriptor.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::adapter::{Adapter, MemoryAdapter, ScanFlow};
use crate::config::DatabaseConfig;
use crate::diff::diff;
use crate::error::{DbError, DbResult};
use crate::events::{ChangeAction, ChangeEvent, EventBus, EventKind, EventReceiver, SubscriptionId, ALL_TABLES};
use crate::executor::{CompiledWhere, Fetch, Fetched, PreparedJoin, PreparedQuery, QueryExecutor};
use crate::functions::{FunctionRegistry, PredicateHelpers};
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::planner::{Action, CostClass, ExplainPlan, Query, QueryPlanner, RelateOp, Where};
use crate::relation::{derive_relationships, RefEdit, RelationStore, Relationship, RelationshipEngine, StoreFuture};
use crate::schema::{ColumnType, RowNormalizer, SchemaError, TableModel};
use crate::value::{Row, Value};

use super::result::QueryResult;
use super::state::{with_implicit_pk, TableState};

/// Rows an action produced and how they were found
struct Outcome {
    rows: Vec<Row>,
    class: CostClass,
    scanned_count: usize,
}

impl Outcome {
    fn listing(rows: Vec<Row>) -> Self {
        Self {
            rows,
            class: CostClass::None,
            scanned_count: 0,
        }
    }
}

/// A database instance
///
/// Owns the adapter, the per-table index state, the function registry and
/// the event bus. Every instance is independent; nothing is global.
pub struct Database {
    config: DatabaseConfig,
    adapter: Arc<dyn Adapter>,
    functions: FunctionRegistry,
    helpers: PredicateHelpers,
    events: EventBus,
    tables: RwLock<BTreeMap<String, TableState>>,
    relations: RwLock<BTreeMap<String, Vec<Relationship>>>,
    connected: AtomicBool,
    /// Held for the whole of a query in queue-queries mode
    queue: tokio::sync::Mutex<()>,
}

impl Database {
    pub fn new(config: DatabaseConfig, adapter: Arc<dyn Adapter>) -> Self {
        Self {
            config,
            adapter,
            functions: FunctionRegistry::with_builtins(),
            helpers: PredicateHelpers::with_builtins(),
            events: EventBus::new(),
            tables: RwLock::new(BTreeMap::new()),
            relations: RwLock::new(BTreeMap::new()),
            connected: AtomicBool::new(false),
            queue: tokio::sync::Mutex::new(()),
        }
    }

    /// Instance backed by a fresh [`MemoryAdapter`]
    pub fn in_memory(config: DatabaseConfig) -> Self {
        Self::new(config, Arc::new(MemoryAdapter::new()))
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn adapter(&self) -> &dyn Adapter {
        self.adapter.as_ref()
    }

    /// Registry for select-list functions; register custom ones here
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Registry for `where` helpers
    pub fn helpers(&self) -> &PredicateHelpers {
        &self.helpers
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Connects the adapter and registers every configured table.
    ///
    /// Models are validated before the adapter is touched. Indexes and
    /// tries are rebuilt from any rows the adapter already holds.
    pub async fn connect(&self) -> DbResult<()> {
        if self.is_connected() {
            return Err(DbError::AlreadyConnected);
        }
        self.config.validate()?;

        let mut models = BTreeMap::new();
        for table in &self.config.tables {
            let model = with_implicit_pk(table.table_model());
            model.validate_structure()?;
            models.insert(model.name.clone(), model);
        }
        let relations = derive_relationships(&models)?;

        self.adapter.connect(&self.config.id).await?;

        let mut states = BTreeMap::new();
        for table in &self.config.tables {
            let model = match models.remove(&table.name) {
                Some(model) => model,
                None => continue,
            };
            let sorted = table.sort_index.unwrap_or_else(|| model.keys_sortable());
            self.adapter.make_table(&model, sorted).await?;

            let mut rows = Vec::new();
            let mut on_row = |row: Row| {
                rows.push(row);
                ScanFlow::Continue
            };
            self.adapter.read_all(&table.name, &mut on_row).await?;

            let mut state = TableState::new(model, sorted, table);
            state.load(&rows);

            let count = rows.len().to_string();
            log_event_with_fields(
                Event::TableRegistered,
                &[
                    ("rows", count.as_str()),
                    ("sorted", if sorted { "true" } else { "false" }),
                    ("table", table.name.as_str()),
                ],
            );
            states.insert(table.name.clone(), state);
        }

        *self.write_tables()? = states;
        *self
            .relations
            .write()
            .map_err(|_| DbError::Internal("Lock poisoned".into()))? = relations;
        self.connected.store(true, Ordering::SeqCst);

        let count = self.config.tables.len().to_string();
        log_event_with_fields(
            Event::DbConnect,
            &[
                ("adapter", self.adapter.name()),
                ("instance", self.config.id.as_str()),
                ("tables", count.as_str()),
            ],
        );
        Ok(())
    }

    pub async fn disconnect(&self) -> DbResult<()> {
        self.ensure_connected()?;
        self.adapter.disconnect().await?;
        self.connected.store(false, Ordering::SeqCst);
        log_event_with_fields(Event::DbDisconnect, &[("instance", self.config.id.as_str())]);
        Ok(())
    }

    /// Registered table names, sorted
    pub fn table_names(&self) -> DbResult<Vec<String>> {
        Ok(self.read_tables()?.keys().cloned().collect())
    }

    /// The model a table was registered with, including an implicit key
    pub fn model(&self, table: &str) -> DbResult<TableModel> {
        self.with_table(table, |state| Ok(state.model.clone()))
    }

    /// Relationships owned by a table
    pub fn relationships(&self, table: &str) -> DbResult<Vec<Relationship>> {
        Ok(self
            .relations
            .read()
            .map_err(|_| DbError::Internal("Lock poisoned".into()))?
            .get(table)
            .cloned()
            .unwrap_or_default())
    }

    /// Words of a trie column starting with `prefix`. An absent prefix
    /// yields nothing.
    pub fn prefix_search(&self, table: &str, column: &str, prefix: &str) -> DbResult<Vec<String>> {
        self.with_table(table, |state| match state.tries.get(column) {
            Some(trie) => Ok(trie.trie().get_prefix(&prefix.to_lowercase())),
            None => Err(SchemaError::invalid_column(table, column, "column has no trie").into()),
        })
    }

    /// Subscribe to change events of `table`, or of every table with `"*"`
    pub fn subscribe(&self, table: &str, kind: EventKind) -> DbResult<(SubscriptionId, EventReceiver)> {
        if table != ALL_TABLES && !self.read_tables()?.contains_key(table) {
            return Err(SchemaError::unknown_table(table).into());
        }
        Ok(self.events.subscribe(table, kind)?)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Describes how a query would fetch its rows without running it
    pub fn explain(&self, query: &Query) -> DbResult<ExplainPlan> {
        let plan = self.with_table(&query.table, |state| {
            let planner = QueryPlanner::new(&state.model);
            Ok(match planner.validate(query, &self.functions, &self.helpers) {
                Ok(()) => ExplainPlan::from_plan(query, &planner.classify(query.predicate.as_ref())),
                Err(e) => ExplainPlan::from_error(query, &e),
            })
        })?;
        Logger::trace(Event::ExplainComplete.as_str(), &[("table", query.table.as_str())]);
        Ok(plan)
    }

    /// Runs a query to completion.
    ///
    /// Configuration errors are returned before the descriptor leaves
    /// `pending`. Adapter errors abandon it mid-flight.
    pub async fn query(&self, mut query: Query) -> DbResult<QueryResult> {
        let _turn = if self.config.queue_queries {
            Some(self.queue.lock().await)
        } else {
            None
        };
        self.ensure_connected()?;

        if let Err(e) = self.check(&query) {
            Logger::warn(
                Event::QueryRejected.as_str(),
                &[
                    ("code", e.code()),
                    ("reason", e.to_string().as_str()),
                    ("table", query.table.as_str()),
                ],
            );
            return Err(e);
        }

        query.begin()?;
        let query_id = query.query_id().to_string();
        Logger::trace(
            Event::QueryStart.as_str(),
            &[
                ("action", query.action.name()),
                ("query_id", query_id.as_str()),
                ("table", query.table.as_str()),
            ],
        );

        match self.dispatch(&query).await {
            Ok(outcome) => {
                let rows = outcome.rows.len().to_string();
                query.complete(outcome.rows)?;
                Logger::trace(
                    Event::QueryComplete.as_str(),
                    &[
                        ("class", outcome.class.as_str()),
                        ("query_id", query_id.as_str()),
                        ("rows", rows.as_str()),
                    ],
                );
                Ok(QueryResult::new(query, outcome.class, outcome.scanned_count))
            }
            Err(e) => {
                log_event_with_fields(
                    Event::QueryAborted,
                    &[
                        ("code", e.code()),
                        ("query_id", query_id.as_str()),
                        ("reason", e.to_string().as_str()),
                        ("table", query.table.as_str()),
                    ],
                );
                Err(e)
            }
        }
    }

    fn check(&self, query: &Query) -> DbResult<()> {
        if let Action::ShowTables = query.action {
            return Ok(());
        }
        let tables = self.read_tables()?;
        let state = tables
            .get(&query.table)
            .ok_or_else(|| SchemaError::unknown_table(&query.table))?;
        QueryPlanner::new(&state.model).validate(query, &self.functions, &self.helpers)?;
        for join in &query.modifiers.joins {
            if !tables.contains_key(&join.table) {
                return Err(SchemaError::unknown_table(&join.table).into());
            }
        }
        Ok(())
    }

    async fn dispatch(&self, query: &Query) -> DbResult<Outcome> {
        match &query.action {
            Action::Select => {
                let prepared = self.prepare(query)?;
                let result = QueryExecutor::new(self.adapter.as_ref(), &self.functions)
                    .select(query, &prepared)
                    .await?;
                Ok(Outcome {
                    rows: result.rows,
                    class: result.class,
                    scanned_count: result.scanned_count,
                })
            }
            Action::Upsert(rows) => self.upsert(query, rows).await,
            Action::Delete => self.remove(query, ChangeAction::Delete).await,
            Action::Drop => self.remove(query, ChangeAction::Drop).await,
            Action::ShowTables => Ok(Outcome::listing(self.table_listing()?)),
            Action::Describe => Ok(Outcome::listing(self.describe(&query.table)?)),
            Action::Relate(op) => self.relate(query, op).await,
        }
    }

    /// Decides everything a read needs while holding the state lock
    fn prepare(&self, query: &Query) -> DbResult<PreparedQuery> {
        let tables = self.read_tables()?;
        let state = tables
            .get(&query.table)
            .ok_or_else(|| SchemaError::unknown_table(&query.table))?;
        let now = Utc::now();

        let plan = QueryPlanner::new(&state.model).classify(query.predicate.as_ref());
        let expired = state.expired_keys(now);
        let fetch = Fetch::resolve(
            &plan,
            query,
            state.model.pk(),
            state.sorted,
            &state.indexes,
            !expired.is_empty(),
        );

        let filter = match &query.predicate {
            Some(p) => Some(CompiledWhere::compile(
                p,
                &state.tries,
                &self.helpers,
                Some(&query.table),
            )?),
            None => None,
        };

        let joins = query
            .modifiers
            .joins
            .iter()
            .map(|spec| {
                let joined = tables
                    .get(&spec.table)
                    .ok_or_else(|| SchemaError::unknown_table(&spec.table))?;
                Ok(PreparedJoin {
                    spec: spec.clone(),
                    pk: Some(joined.pk().to_string()),
                    columns: joined.columns(),
                    expired: joined.expired_keys(now),
                })
            })
            .collect::<DbResult<Vec<_>>>()?;

        let having = match &query.modifiers.having {
            Some(h) => {
                let compiled = CompiledWhere::compile(h, &BTreeMap::new(), &self.helpers, None)?;
                Some(if joins.is_empty() { compiled } else { compiled.for_join() })
            }
            None => None,
        };

        let fetch_desc = format!("{:?}", fetch);
        Logger::trace(
            Event::QueryPlanned.as_str(),
            &[
                ("class", plan.class.as_str()),
                ("fetch", fetch_desc.as_str()),
                ("table", query.table.as_str()),
            ],
        );

        Ok(PreparedQuery {
            table: query.table.clone(),
            pk: Some(state.pk().to_string()),
            columns: state.columns(),
            class: plan.class,
            fetch,
            filter,
            having,
            joins,
            expired,
        })
    }

    /// Live rows of a table matching `predicate`
    async fn fetch_rows(&self, table: &str, predicate: Option<Where>) -> DbResult<(Fetched, CostClass)> {
        let mut query = Query::select(table);
        query.predicate = predicate;
        let prepared = self.prepare(&query)?;
        let fetched = QueryExecutor::new(self.adapter.as_ref(), &self.functions)
            .fetch(&prepared, None)
            .await?;
        Ok((fetched, prepared.class))
    }

    /// Row by key, unless its TTL ran out
    async fn read_live(&self, table: &str, pk: &Value) -> DbResult<Option<Row>> {
        if self.with_table(table, |state| Ok(state.is_expired(pk, Utc::now())))? {
            return Ok(None);
        }
        Ok(self.adapter.read_pk(table, pk).await?)
    }

    async fn upsert(&self, query: &Query, rows: &[Row]) -> DbResult<Outcome> {
        let table = query.table.as_str();
        self.purge_expired(table).await?;

        let predicate = match &query.predicate {
            Some(p) => p.clone(),
            None => {
                let mut written = Vec::with_capacity(rows.len());
                for row in rows {
                    written.push(self.write_row(table, row.clone(), true).await?);
                }
                return Ok(Outcome::listing(written));
            }
        };

        // later rows of the patch win
        let patch: Row = rows
            .iter()
            .flat_map(|r| r.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect();
        let pk = self.with_table(table, |state| Ok(state.pk().to_string()))?;
        let (matched, class) = self.fetch_rows(table, Some(predicate)).await?;

        let mut written = Vec::with_capacity(matched.rows.len());
        for row in matched.rows {
            let mut partial = patch.clone();
            match row.get(&pk) {
                Some(key) => partial.insert(pk.clone(), key.clone()),
                None => continue,
            };
            written.push(self.write_row(table, partial, true).await?);
        }
        Ok(Outcome {
            rows: written,
            class,
            scanned_count: matched.scanned_count,
        })
    }

    /// Writes one row: key resolution, normalization, no-op detection,
    /// adapter write, then index upkeep and events.
    ///
    /// With `sync`, relationships owned by the table follow the write.
    async fn write_row(&self, table: &str, incoming: Row, sync: bool) -> DbResult<Row> {
        let model = self.model(table)?;
        let (pk_name, pk_type) = match model.pk_column() {
            Some(c) => (c.key.clone(), c.col_type.clone()),
            None => return Err(SchemaError::primary_key_unresolved(table).into()),
        };

        let given = incoming
            .get(&pk_name)
            .filter(|v| !v.is_null())
            .map(|v| pk_type.coerce(v));
        let existing = match &given {
            Some(key) => self.adapter.read_pk(table, key).await?,
            None => None,
        };

        let mut row = RowNormalizer::new(&model).normalize(&incoming, existing.as_ref());
        let key = match given {
            Some(key) => Some(key),
            None => generate_key(&model)?,
        };
        match &key {
            Some(k) => row.insert(pk_name.clone(), k.clone()),
            None => row.remove(&pk_name),
        };

        if let Some(old) = &existing {
            if diff(&Value::Map(old.clone()), &Value::Map(row.clone())).is_empty() {
                Logger::trace(Event::WriteUnchanged.as_str(), &[("table", table)]);
                return Ok(old.clone());
            }
        }

        let stored = self.adapter.write(table, key, row).await?;
        let pk = stored
            .get(&pk_name)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| SchemaError::primary_key_unresolved(table))?;

        self.with_table_mut(table, |state| {
            state.apply_write(&pk, existing.as_ref(), &stored, Utc::now());
            Ok(())
        })?;
        self.publish(table, ChangeAction::Upsert, vec![pk], vec![stored.clone()]);

        if sync {
            let engine = RelationshipEngine::new(self);
            for rel in self.relationships(table)? {
                engine.sync_write(&rel, existing.as_ref(), &stored).await?;
            }
        }
        Ok(stored)
    }

    /// Deletes one stored row. With `announce` a delete event follows.
    async fn delete_row(&self, table: &str, row: Row, announce: bool) -> DbResult<Row> {
        let pk_name = self.with_table(table, |state| Ok(state.pk().to_string()))?;
        let pk = match row.get(&pk_name) {
            Some(pk) if !pk.is_null() => pk.clone(),
            _ => return Err(SchemaError::primary_key_unresolved(table).into()),
        };

        self.adapter.delete_pk(table, &pk).await?;
        self.with_table_mut(table, |state| {
            state.apply_delete(&pk, &row);
            Ok(())
        })?;
        if announce {
            self.publish(table, ChangeAction::Delete, vec![pk], vec![row.clone()]);
        }

        let engine = RelationshipEngine::new(self);
        for rel in self.relationships(table)? {
            engine.sync_delete(&rel, &row).await?;
        }
        Ok(row)
    }

    /// Delete (matching rows) or drop (every row)
    async fn remove(&self, query: &Query, action: ChangeAction) -> DbResult<Outcome> {
        let table = query.table.as_str();
        self.purge_expired(table).await?;

        let predicate = match action {
            ChangeAction::Drop => None,
            _ => query.predicate.clone(),
        };
        let (matched, class) = self.fetch_rows(table, predicate).await?;
        let batched = action == ChangeAction::Drop;

        let mut removed = Vec::with_capacity(matched.rows.len());
        let mut failure = None;
        for row in matched.rows {
            match self.delete_row(table, row, !batched).await {
                Ok(row) => removed.push(row),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        // a drop announces what it removed, even when cut short
        if batched && !removed.is_empty() {
            let pk = self.with_table(table, |state| Ok(state.pk().to_string()))?;
            let keys = removed.iter().filter_map(|r| r.get(&pk).cloned()).collect();
            self.publish(table, ChangeAction::Drop, keys, removed.clone());
        }
        if let Some(e) = failure {
            return Err(e);
        }

        Ok(Outcome {
            rows: removed,
            class,
            scanned_count: matched.scanned_count,
        })
    }

    /// Physically removes rows whose TTL ran out
    async fn purge_expired(&self, table: &str) -> DbResult<()> {
        let expired = self.with_table(table, |state| Ok(state.expired_keys(Utc::now())))?;
        if expired.is_empty() {
            return Ok(());
        }

        for key in &expired {
            match self.adapter.read_pk(table, key).await? {
                Some(row) => {
                    self.delete_row(table, row, true).await?;
                }
                None => self.with_table_mut(table, |state| {
                    state.write_times.remove(key);
                    Ok(())
                })?,
            }
        }

        let count = expired.len().to_string();
        log_event_with_fields(Event::TtlExpired, &[("rows", count.as_str()), ("table", table)]);
        Ok(())
    }

    async fn relate(&self, query: &Query, op: &RelateOp) -> DbResult<Outcome> {
        let table = query.table.as_str();
        let engine = RelationshipEngine::new(self);

        let (column, edit) = match RefEdit::from_op(op) {
            Some(edit) => edit,
            None => {
                let prune = self.with_table(table, |state| Ok(state.prune_dangling_refs))?;
                let mut rows = Vec::new();
                for rel in self.relationships(table)? {
                    rows.extend(engine.rebuild(&rel, prune).await?);
                }
                return Ok(Outcome::listing(rows));
            }
        };

        let rel = match self.relationships(table)?.into_iter().find(|r| r.column == column) {
            Some(rel) => rel,
            None => return Ok(Outcome::listing(Vec::new())),
        };

        let target_type = self
            .model(&rel.target)?
            .pk_column()
            .map(|c| c.col_type.clone())
            .unwrap_or(ColumnType::Any);
        let ids: Vec<Value> = edit.ids().iter().map(|id| target_type.coerce(id)).collect();

        let (owners, class) = self.fetch_rows(table, query.predicate.clone()).await?;
        let rows = engine.apply(&rel, edit.with_ids(&ids), owners.rows).await?;
        Ok(Outcome {
            rows,
            class,
            scanned_count: owners.scanned_count,
        })
    }

    fn table_listing(&self) -> DbResult<Vec<Row>> {
        Ok(self
            .table_names()?
            .into_iter()
            .map(|name| {
                let mut row = Row::new();
                row.insert("table".into(), Value::String(name));
                row
            })
            .collect())
    }

    fn describe(&self, table: &str) -> DbResult<Vec<Row>> {
        let model = self.model(table)?;
        model
            .columns
            .iter()
            .map(|column| {
                let json = serde_json::to_value(column).map_err(|e| DbError::Internal(e.to_string()))?;
                match Value::from(json) {
                    Value::Map(row) => Ok(row),
                    _ => Err(DbError::Internal(format!("column '{}' did not describe as a map", column.key))),
                }
            })
            .collect()
    }

    fn publish(&self, table: &str, action: ChangeAction, keys: Vec<Value>, rows: Vec<Row>) {
        self.events
            .publish(ChangeEvent::new(self.config.id.as_str(), table, action, keys, rows));
    }

    fn ensure_connected(&self) -> DbResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(DbError::NotConnected)
        }
    }

    fn read_tables(&self) -> DbResult<RwLockReadGuard<'_, BTreeMap<String, TableState>>> {
        self.tables
            .read()
            .map_err(|_| DbError::Internal("Lock poisoned".into()))
    }

    fn write_tables(&self) -> DbResult<RwLockWriteGuard<'_, BTreeMap<String, TableState>>> {
        self.tables
            .write()
            .map_err(|_| DbError::Internal("Lock poisoned".into()))
    }

    fn with_table<T>(&self, table: &str, f: impl FnOnce(&TableState) -> DbResult<T>) -> DbResult<T> {
        let tables = self.read_tables()?;
        let state = tables
            .get(table)
            .ok_or_else(|| SchemaError::unknown_table(table))?;
        f(state)
    }

    fn with_table_mut<T>(&self, table: &str, f: impl FnOnce(&mut TableState) -> DbResult<T>) -> DbResult<T> {
        let mut tables = self.write_tables()?;
        let state = tables
            .get_mut(table)
            .ok_or_else(|| SchemaError::unknown_table(table))?;
        f(state)
    }
}

/// Key for a write that carries none. `None` lets the adapter assign the
/// next auto-increment value.
fn generate_key(model: &TableModel) -> DbResult<Option<Value>> {
    let column = model
        .pk_column()
        .ok_or_else(|| SchemaError::primary_key_unresolved(&model.name))?;
    if column.is_auto_increment() {
        return Ok(None);
    }
    match column.col_type {
        ColumnType::Uuid => Ok(Some(Value::String(Uuid::new_v4().to_string()))),
        ColumnType::TimeId => {
            let noise = Uuid::new_v4().simple().to_string();
            Ok(Some(Value::String(format!(
                "{}-{}",
                Utc::now().timestamp(),
                &noise[..16]
            ))))
        }
        _ => Err(SchemaError::primary_key_unresolved(&model.name).into()),
    }
}

impl RelationStore for Database {
    fn read_row<'a>(&'a self, table: &'a str, pk: &'a Value) -> StoreFuture<'a, Option<Row>> {
        Box::pin(self.read_live(table, pk))
    }

    fn rows_where<'a>(&'a self, table: &'a str, predicate: Option<Where>) -> StoreFuture<'a, Vec<Row>> {
        Box::pin(async move { Ok(self.fetch_rows(table, predicate).await?.0.rows) })
    }

    fn write_raw<'a>(&'a self, table: &'a str, row: Row) -> StoreFuture<'a, Row> {
        Box::pin(self.write_row(table, row, false))
    }
}
