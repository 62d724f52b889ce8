//! Relationship engine
//!
//! Every edit runs in two phases:
//! 1. rewrite the owning row's reference column
//! 2. rewrite the back-reference column of every target row whose link
//!    changed, adding or removing the owner's key
//!
//! Phase 2 is skipped when the relationship has no back-reference. All
//! writes go through [`RelationStore::write_raw`], which never recurses
//! into relationship sync. The first failure aborts the remaining work.

use std::collections::{BTreeMap, BTreeSet};

use futures_util::future::BoxFuture;

use crate::error::DbResult;
use crate::observability::{log_event_with_fields, Event};
use crate::planner::{Op, RelateOp, Where};
use crate::value::{Row, Value};

use super::descriptor::{BackRef, Cardinality, Relationship};

/// Future returned by store calls
pub type StoreFuture<'a, T> = BoxFuture<'a, DbResult<T>>;

/// Row access the engine needs from a database instance
pub trait RelationStore: Send + Sync {
    /// Live row by primary key
    fn read_row<'a>(&'a self, table: &'a str, pk: &'a Value) -> StoreFuture<'a, Option<Row>>;

    /// Live rows matching `predicate` (all rows when `None`), in index order
    fn rows_where<'a>(&'a self, table: &'a str, predicate: Option<Where>) -> StoreFuture<'a, Vec<Row>>;

    /// Persists a complete row without relationship sync
    fn write_raw<'a>(&'a self, table: &'a str, row: Row) -> StoreFuture<'a, Row>;
}

/// An edit to the ids held by a reference column
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefEdit<'a> {
    Set(&'a [Value]),
    Add(&'a [Value]),
    Remove(&'a [Value]),
    Clear,
}

impl<'a> RefEdit<'a> {
    /// The column and edit of a relate operation; `None` for rebuild
    pub fn from_op(op: &'a RelateOp) -> Option<(&'a str, RefEdit<'a>)> {
        match op {
            RelateOp::Set { column, ids } => Some((column, RefEdit::Set(ids))),
            RelateOp::Add { column, ids } => Some((column, RefEdit::Add(ids))),
            RelateOp::Delete { column, ids } => Some((column, RefEdit::Remove(ids))),
            RelateOp::Drop { column } => Some((column, RefEdit::Clear)),
            RelateOp::Rebuild => None,
        }
    }

    /// Ids named by the edit
    pub fn ids(&self) -> &'a [Value] {
        match *self {
            RefEdit::Set(ids) | RefEdit::Add(ids) | RefEdit::Remove(ids) => ids,
            RefEdit::Clear => &[],
        }
    }

    /// The same edit over other ids
    pub fn with_ids<'b>(&self, ids: &'b [Value]) -> RefEdit<'b> {
        match self {
            RefEdit::Set(_) => RefEdit::Set(ids),
            RefEdit::Add(_) => RefEdit::Add(ids),
            RefEdit::Remove(_) => RefEdit::Remove(ids),
            RefEdit::Clear => RefEdit::Clear,
        }
    }

    /// Ids the column holds after the edit
    fn apply(&self, current: &[Value], cardinality: Cardinality) -> Vec<Value> {
        let next = match (self, cardinality) {
            (RefEdit::Set(ids), _) | (RefEdit::Add(ids), Cardinality::One) => union(&[], ids),
            (RefEdit::Add(ids), Cardinality::Many) => union(current, ids),
            (RefEdit::Remove(ids), _) => minus(current, ids),
            (RefEdit::Clear, _) => Vec::new(),
        };
        match cardinality {
            Cardinality::One => next.into_iter().take(1).collect(),
            Cardinality::Many => next,
        }
    }

    /// Whether targets linked through drifted back-references are
    /// revisited as well
    fn sweeps_links(&self) -> bool {
        matches!(self, RefEdit::Set(_) | RefEdit::Clear)
    }
}

fn union(current: &[Value], extra: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(current.len() + extra.len());
    for id in current.iter().chain(extra) {
        if !id.is_null() && !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}

fn minus(current: &[Value], removed: &[Value]) -> Vec<Value> {
    current.iter().filter(|id| !removed.contains(id)).cloned().collect()
}

fn column_ids(row: &Row, column: &str) -> Vec<Value> {
    Cardinality::decode(row.get(column).unwrap_or(&Value::Null))
}

/// Keeps both sides of relationships consistent
pub struct RelationshipEngine<'s, S: RelationStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: RelationStore + ?Sized> RelationshipEngine<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Applies an edit to each owner row. Returns the owner rows as stored.
    pub async fn apply(&self, rel: &Relationship, edit: RefEdit<'_>, owners: Vec<Row>) -> DbResult<Vec<Row>> {
        let mut out = Vec::with_capacity(owners.len());
        for mut owner in owners {
            let pk = match owner.get(&rel.owner_pk) {
                Some(pk) if !pk.is_null() => pk.clone(),
                _ => continue,
            };
            let old = column_ids(&owner, &rel.column);
            let new = edit.apply(&old, rel.cardinality);

            let encoded = rel.cardinality.encode(&new);
            if owner.get(&rel.column) != Some(&encoded) {
                owner.insert(rel.column.clone(), encoded);
                owner = self.store.write_raw(&rel.owner, owner).await?;
            }

            if let Some(back) = &rel.back_ref {
                self.sync_targets(rel, back, &pk, &old, &new, edit.sweeps_links()).await?;
            }
            out.push(owner);
        }
        Ok(out)
    }

    /// Follows a normal write of an owner row
    pub async fn sync_write(&self, rel: &Relationship, old: Option<&Row>, new: &Row) -> DbResult<()> {
        let back = match &rel.back_ref {
            Some(back) => back,
            None => return Ok(()),
        };
        let pk = match new.get(&rel.owner_pk) {
            Some(pk) if !pk.is_null() => pk,
            _ => return Ok(()),
        };
        let before = old.map(|r| column_ids(r, &rel.column)).unwrap_or_default();
        let after = column_ids(new, &rel.column);
        if before == after {
            return Ok(());
        }
        self.sync_targets(rel, back, pk, &before, &after, false).await
    }

    /// Follows a delete of an owner row
    pub async fn sync_delete(&self, rel: &Relationship, old: &Row) -> DbResult<()> {
        let back = match &rel.back_ref {
            Some(back) => back,
            None => return Ok(()),
        };
        let pk = match old.get(&rel.owner_pk) {
            Some(pk) if !pk.is_null() => pk,
            _ => return Ok(()),
        };
        let before = column_ids(old, &rel.column);
        self.sync_targets(rel, back, pk, &before, &[], false).await
    }

    /// Re-derives the forward column of every owner row.
    ///
    /// With a back-reference the column is rebuilt from the targets'
    /// back-reference contents. Without one it is left alone, unless
    /// `prune` asks for ids of vanished targets to be dropped.
    pub async fn rebuild(&self, rel: &Relationship, prune: bool) -> DbResult<Vec<Row>> {
        log_event_with_fields(
            Event::RelationRebuildStart,
            &[("table", rel.owner.as_str()), ("column", rel.column.as_str())],
        );

        let rewritten = match &rel.back_ref {
            Some(back) => self.rebuild_from_back_refs(rel, back).await?,
            None if prune => {
                let rows = self.prune_dangling(rel).await?;
                if !rows.is_empty() {
                    let count = rows.len().to_string();
                    log_event_with_fields(
                        Event::RelationPruned,
                        &[
                            ("table", rel.owner.as_str()),
                            ("column", rel.column.as_str()),
                            ("rows", count.as_str()),
                        ],
                    );
                }
                rows
            }
            None => Vec::new(),
        };

        let count = rewritten.len().to_string();
        log_event_with_fields(
            Event::RelationRebuildComplete,
            &[
                ("table", rel.owner.as_str()),
                ("column", rel.column.as_str()),
                ("rewritten", count.as_str()),
            ],
        );
        Ok(rewritten)
    }

    async fn rebuild_from_back_refs(&self, rel: &Relationship, back: &BackRef) -> DbResult<Vec<Row>> {
        let mut derived: BTreeMap<Value, Vec<Value>> = BTreeMap::new();
        for target in self.store.rows_where(&rel.target, None).await? {
            let target_pk = match target.get(&rel.target_pk) {
                Some(pk) if !pk.is_null() => pk.clone(),
                _ => continue,
            };
            for owner in column_ids(&target, &back.column) {
                let ids = derived.entry(owner).or_default();
                if !ids.contains(&target_pk) {
                    ids.push(target_pk.clone());
                }
            }
        }

        let mut rewritten = Vec::new();
        for mut owner in self.store.rows_where(&rel.owner, None).await? {
            let ids = owner
                .get(&rel.owner_pk)
                .and_then(|pk| derived.get(pk))
                .map(|ids| ids.as_slice())
                .unwrap_or(&[]);
            let encoded = rel.cardinality.encode(ids);
            if owner.get(&rel.column) != Some(&encoded) {
                owner.insert(rel.column.clone(), encoded);
                rewritten.push(self.store.write_raw(&rel.owner, owner).await?);
            }
        }
        Ok(rewritten)
    }

    async fn prune_dangling(&self, rel: &Relationship) -> DbResult<Vec<Row>> {
        let existing: BTreeSet<Value> = self
            .store
            .rows_where(&rel.target, None)
            .await?
            .into_iter()
            .filter_map(|mut r| r.remove(&rel.target_pk))
            .collect();

        let mut rewritten = Vec::new();
        for mut owner in self.store.rows_where(&rel.owner, None).await? {
            let ids = column_ids(&owner, &rel.column);
            let kept: Vec<Value> = ids.iter().filter(|id| existing.contains(id)).cloned().collect();
            if kept.len() != ids.len() {
                owner.insert(rel.column.clone(), rel.cardinality.encode(&kept));
                rewritten.push(self.store.write_raw(&rel.owner, owner).await?);
            }
        }
        Ok(rewritten)
    }

    /// Phase 2: brings target back-references in line with `new`
    async fn sync_targets(
        &self,
        rel: &Relationship,
        back: &BackRef,
        owner_pk: &Value,
        old: &[Value],
        new: &[Value],
        sweep: bool,
    ) -> DbResult<()> {
        let mut affected: Vec<Value> = union(old, new);

        if sweep {
            let linked = match back.cardinality {
                Cardinality::Many => Where::cond(back.column.as_str(), Op::Have, owner_pk.clone()),
                Cardinality::One => Where::eq(back.column.as_str(), owner_pk.clone()),
            };
            for row in self.store.rows_where(&rel.target, Some(linked)).await? {
                if let Some(pk) = row.get(&rel.target_pk) {
                    if !affected.contains(pk) {
                        affected.push(pk.clone());
                    }
                }
            }
        }

        for target_pk in &affected {
            let target = match self.store.read_row(&rel.target, target_pk).await? {
                Some(row) => row,
                None => continue,
            };
            self.set_back_link(rel, back, target, owner_pk, new.contains(target_pk))
                .await?;
        }
        Ok(())
    }

    /// Adds or removes `owner_pk` in one target row's back-reference
    async fn set_back_link(
        &self,
        rel: &Relationship,
        back: &BackRef,
        mut target: Row,
        owner_pk: &Value,
        linked: bool,
    ) -> DbResult<()> {
        let current = column_ids(&target, &back.column);
        let next = match (linked, back.cardinality) {
            (true, Cardinality::Many) => union(&current, std::slice::from_ref(owner_pk)),
            (true, Cardinality::One) => vec![owner_pk.clone()],
            (false, _) => minus(&current, std::slice::from_ref(owner_pk)),
        };
        if next == current {
            return Ok(());
        }

        // a to-one back-reference moving to a new owner leaves the old
        // owner's forward column pointing at this target
        if linked && back.cardinality == Cardinality::One {
            if let (Some(previous), Some(target_pk)) = (current.first(), target.get(&rel.target_pk)) {
                if previous != owner_pk {
                    self.unlink_forward(rel, previous, target_pk).await?;
                }
            }
        }

        target.insert(back.column.clone(), back.cardinality.encode(&next));
        self.store.write_raw(&rel.target, target).await?;
        Ok(())
    }

    async fn unlink_forward(&self, rel: &Relationship, owner_pk: &Value, target_pk: &Value) -> DbResult<()> {
        let mut owner = match self.store.read_row(&rel.owner, owner_pk).await? {
            Some(row) => row,
            None => return Ok(()),
        };
        let ids = column_ids(&owner, &rel.column);
        if !ids.contains(target_pk) {
            return Ok(());
        }
        let kept = minus(&ids, std::slice::from_ref(target_pk));
        owner.insert(rel.column.clone(), rel.cardinality.encode(&kept));
        self.store.write_raw(&rel.owner, owner).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::error::DbError;

    /// In-memory store keyed by table, then primary key column "id"
    #[derive(Default)]
    struct FakeStore {
        tables: Mutex<BTreeMap<String, BTreeMap<Value, Row>>>,
        writes: Mutex<usize>,
    }

    impl FakeStore {
        fn put(&self, table: &str, row: Row) {
            let pk = row["id"].clone();
            self.tables
                .lock()
                .unwrap()
                .entry(table.to_string())
                .or_default()
                .insert(pk, row);
        }

        fn get(&self, table: &str, pk: i64) -> Row {
            self.tables.lock().unwrap()[table][&Value::Int(pk)].clone()
        }

        fn writes(&self) -> usize {
            *self.writes.lock().unwrap()
        }
    }

    impl RelationStore for FakeStore {
        fn read_row<'a>(&'a self, table: &'a str, pk: &'a Value) -> StoreFuture<'a, Option<Row>> {
            Box::pin(async move {
                Ok(self
                    .tables
                    .lock()
                    .map_err(|e| DbError::Internal(e.to_string()))?
                    .get(table)
                    .and_then(|t| t.get(pk))
                    .cloned())
            })
        }

        fn rows_where<'a>(&'a self, table: &'a str, predicate: Option<Where>) -> StoreFuture<'a, Vec<Row>> {
            Box::pin(async move {
                let rows: Vec<Row> = self
                    .tables
                    .lock()
                    .map_err(|e| DbError::Internal(e.to_string()))?
                    .get(table)
                    .map(|t| t.values().cloned().collect())
                    .unwrap_or_default();
                Ok(match predicate {
                    Some(Where::Cond { column, op: Op::Have, value }) => rows
                        .into_iter()
                        .filter(|r| column_ids(r, &column).contains(&value))
                        .collect(),
                    Some(Where::Cond { column, value, .. }) => rows
                        .into_iter()
                        .filter(|r| r.get(&column) == Some(&value))
                        .collect(),
                    _ => rows,
                })
            })
        }

        fn write_raw<'a>(&'a self, table: &'a str, row: Row) -> StoreFuture<'a, Row> {
            Box::pin(async move {
                *self.writes.lock().map_err(|e| DbError::Internal(e.to_string()))? += 1;
                self.put(table, row.clone());
                Ok(row)
            })
        }
    }

    fn user(id: i64, team: Value) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), Value::Int(id));
        row.insert("team".into(), team);
        row
    }

    fn team(id: i64, members: Vec<i64>) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), Value::Int(id));
        row.insert("members".into(), Value::Array(members.into_iter().map(Value::Int).collect()));
        row
    }

    fn user_team() -> Relationship {
        Relationship {
            owner: "users".into(),
            owner_pk: "id".into(),
            column: "team".into(),
            cardinality: Cardinality::One,
            target: "teams".into(),
            target_pk: "id".into(),
            back_ref: Some(BackRef {
                column: "members".into(),
                cardinality: Cardinality::Many,
            }),
        }
    }

    fn seeded() -> FakeStore {
        let store = FakeStore::default();
        store.put("users", user(1, Value::Int(10)));
        store.put("users", user(2, Value::Int(10)));
        store.put("teams", team(10, vec![1, 2]));
        store.put("teams", team(20, vec![]));
        store
    }

    #[tokio::test]
    async fn test_set_moves_back_reference() {
        let store = seeded();
        let engine = RelationshipEngine::new(&store);
        let ids = [Value::Int(20)];
        let owners = vec![store.get("users", 1)];
        let out = engine.apply(&user_team(), RefEdit::Set(&ids), owners).await.unwrap();

        assert_eq!(out[0]["team"], Value::Int(20));
        assert_eq!(store.get("teams", 20)["members"], Value::Array(vec![Value::Int(1)]));
        assert_eq!(store.get("teams", 10)["members"], Value::Array(vec![Value::Int(2)]));
    }

    #[tokio::test]
    async fn test_clear_removes_back_reference() {
        let store = seeded();
        let engine = RelationshipEngine::new(&store);
        let owners = vec![store.get("users", 2)];
        engine.apply(&user_team(), RefEdit::Clear, owners).await.unwrap();

        assert_eq!(store.get("users", 2)["team"], Value::Null);
        assert_eq!(store.get("teams", 10)["members"], Value::Array(vec![Value::Int(1)]));
    }

    #[tokio::test]
    async fn test_add_to_many_is_deduplicated() {
        let store = seeded();
        let engine = RelationshipEngine::new(&store);
        let rel = Relationship {
            owner: "teams".into(),
            owner_pk: "id".into(),
            column: "members".into(),
            cardinality: Cardinality::Many,
            target: "users".into(),
            target_pk: "id".into(),
            back_ref: Some(BackRef {
                column: "team".into(),
                cardinality: Cardinality::One,
            }),
        };
        let ids = [Value::Int(1), Value::Int(1)];
        engine
            .apply(&rel, RefEdit::Add(&ids), vec![store.get("teams", 20)])
            .await
            .unwrap();

        assert_eq!(store.get("teams", 20)["members"], Value::Array(vec![Value::Int(1)]));
        assert_eq!(store.get("users", 1)["team"], Value::Int(20));
        // user 1 left team 10 through its to-one back-reference
        assert_eq!(store.get("teams", 10)["members"], Value::Array(vec![Value::Int(2)]));
    }

    #[tokio::test]
    async fn test_sync_write_and_delete() {
        let store = seeded();
        let engine = RelationshipEngine::new(&store);
        let rel = user_team();

        let old = store.get("users", 2);
        let new = user(2, Value::Int(20));
        store.put("users", new.clone());
        engine.sync_write(&rel, Some(&old), &new).await.unwrap();
        assert_eq!(store.get("teams", 20)["members"], Value::Array(vec![Value::Int(2)]));
        assert_eq!(store.get("teams", 10)["members"], Value::Array(vec![Value::Int(1)]));

        engine.sync_delete(&rel, &new).await.unwrap();
        assert_eq!(store.get("teams", 20)["members"], Value::Array(vec![]));
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let store = FakeStore::default();
        store.put("users", user(1, Value::Null));
        store.put("users", user(2, Value::Int(99)));
        store.put("teams", team(10, vec![1]));
        store.put("teams", team(20, vec![2]));
        let engine = RelationshipEngine::new(&store);
        let rel = user_team();

        let first = engine.rebuild(&rel, false).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(store.get("users", 1)["team"], Value::Int(10));
        assert_eq!(store.get("users", 2)["team"], Value::Int(20));

        let writes = store.writes();
        let second = engine.rebuild(&rel, false).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(store.writes(), writes);
    }

    #[tokio::test]
    async fn test_prune_without_back_reference() {
        let store = FakeStore::default();
        store.put("users", user(1, Value::Int(10)));
        store.put("users", user(2, Value::Int(30)));
        store.put("teams", team(10, vec![]));
        let engine = RelationshipEngine::new(&store);
        let rel = Relationship {
            back_ref: None,
            ..user_team()
        };

        assert!(engine.rebuild(&rel, false).await.unwrap().is_empty());
        assert_eq!(store.get("users", 2)["team"], Value::Int(30));

        let pruned = engine.rebuild(&rel, true).await.unwrap();
        assert_eq!(pruned.len(), 1);
        assert_eq!(store.get("users", 2)["team"], Value::Null);
        assert_eq!(store.get("users", 1)["team"], Value::Int(10));
    }

    #[test]
    fn test_edit_semantics() {
        let current = vec![Value::Int(1), Value::Int(2)];
        let ids = [Value::Int(2), Value::Int(3)];
        assert_eq!(
            RefEdit::Add(&ids).apply(&current, Cardinality::Many),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
        assert_eq!(RefEdit::Remove(&ids).apply(&current, Cardinality::Many), vec![Value::Int(1)]);
        assert_eq!(RefEdit::Set(&ids).apply(&current, Cardinality::One), vec![Value::Int(2)]);
        assert!(RefEdit::Clear.apply(&current, Cardinality::Many).is_empty());
    }
}
