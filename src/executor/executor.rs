//! Query executor
//!
//! Execution flow (strict order):
//! 1. Fetch candidate rows from the adapter per the resolved fetch
//! 2. Drop rows whose TTL expired
//! 3. Filter rows with the full predicate
//! 4. Expand joins
//! 5. Group, aggregate and project
//! 6. Apply `having`
//! 7. Sort
//! 8. Apply offset and limit
//!
//! Adapter calls are the only suspension points. Any error abandons the
//! query; partial results are dropped with it.

use std::collections::BTreeSet;

use crate::adapter::{Adapter, ScanFlow};
use crate::functions::FunctionRegistry;
use crate::index::IndexManager;
use crate::planner::{Action, CostClass, FetchPlan, JoinSpec, Query, QueryPlan, SortDirection};
use crate::value::{Row, Value};

use super::aggregate::Projector;
use super::errors::{ExecutorError, ExecutorResult};
use super::filters::CompiledWhere;
use super::join::{apply_join, qualify, JoinInput};
use super::result::{ExecutionResult, Fetched};
use super::sorter::ResultSorter;

/// Adapter read that yields candidate rows
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch {
    /// `read_all`
    All,
    /// `read_pk` per key
    Keys(Vec<Value>),
    /// `read_pk_range`
    PkRange {
        low: Option<Value>,
        high: Option<Value>,
    },
    /// `read_offset_limit`; offset and limit are already applied
    Window {
        offset: usize,
        limit: usize,
        reverse: bool,
    },
}

impl Fetch {
    /// Turns a plan into concrete adapter reads.
    ///
    /// Secondary index lookups are resolved to primary keys here. An
    /// unfiltered select whose only ordering is the primary key reads a
    /// window directly, unless TTL may hide rows inside that window.
    pub fn resolve(
        plan: &QueryPlan,
        query: &Query,
        pk: Option<&str>,
        index_sorted: bool,
        indexes: &IndexManager,
        ttl_active: bool,
    ) -> Fetch {
        match &plan.fetch {
            FetchPlan::All => Self::window(plan, query, pk, index_sorted, ttl_active).unwrap_or(Fetch::All),
            FetchPlan::PkKeys(keys) => Fetch::Keys(sorted_unique(keys.clone())),
            FetchPlan::PkRange { low, high } => Fetch::PkRange {
                low: low.clone(),
                high: high.clone(),
            },
            FetchPlan::IndexKeys { column, values } => Fetch::Keys(sorted_unique(
                values.iter().flat_map(|v| indexes.lookup_eq(column, v)).collect(),
            )),
            FetchPlan::IndexRange { column, low, high } => {
                Fetch::Keys(sorted_unique(indexes.lookup_range(column, low.as_ref(), high.as_ref())))
            }
        }
    }

    fn window(plan: &QueryPlan, query: &Query, pk: Option<&str>, index_sorted: bool, ttl_active: bool) -> Option<Fetch> {
        let m = &query.modifiers;
        if plan.class != CostClass::None
            || !matches!(query.action, Action::Select)
            || ttl_active
            || !m.joins.is_empty()
            || !m.select.is_empty()
            || !m.group_by.is_empty()
            || m.having.is_some()
        {
            return None;
        }

        let reverse = match m.order_by.as_slice() {
            [] => false,
            [sort] if index_sorted && Some(sort.column.as_str()) == pk => sort.direction == SortDirection::Desc,
            _ => return None,
        };
        if m.offset.is_none() && m.limit.is_none() && !reverse {
            return None;
        }

        Some(Fetch::Window {
            offset: m.offset.unwrap_or(0),
            limit: m.limit.unwrap_or(usize::MAX),
            reverse,
        })
    }
}

fn sorted_unique(mut keys: Vec<Value>) -> Vec<Value> {
    keys.sort();
    keys.dedup();
    keys
}

/// A joined table, ready to read
#[derive(Debug, Clone)]
pub struct PreparedJoin {
    pub spec: JoinSpec,
    pub pk: Option<String>,
    /// Column keys of the joined table
    pub columns: Vec<String>,
    /// Expired primary keys of the joined table
    pub expired: BTreeSet<Value>,
}

/// Everything the executor needs that was decided under the database lock
#[derive(Debug)]
pub struct PreparedQuery {
    pub table: String,
    pub pk: Option<String>,
    /// Column keys of the base table
    pub columns: Vec<String>,
    pub class: CostClass,
    pub fetch: Fetch,
    pub filter: Option<CompiledWhere>,
    pub having: Option<CompiledWhere>,
    pub joins: Vec<PreparedJoin>,
    /// Primary keys whose TTL expired when the query started
    pub expired: BTreeSet<Value>,
}

/// Accepts streamed rows into a result buffer
struct Collector<'p> {
    filter: Option<&'p CompiledWhere>,
    pk: Option<&'p str>,
    expired: &'p BTreeSet<Value>,
    stop_after: Option<usize>,
    fetched: Fetched,
    failure: Option<ExecutorError>,
}

impl<'p> Collector<'p> {
    fn new(
        filter: Option<&'p CompiledWhere>,
        pk: Option<&'p str>,
        expired: &'p BTreeSet<Value>,
        stop_after: Option<usize>,
    ) -> Self {
        Self {
            filter,
            pk,
            expired,
            stop_after,
            fetched: Fetched::default(),
            failure: None,
        }
    }

    fn offer(&mut self, row: Row) -> ScanFlow {
        if let Some(pk) = self.pk {
            if row.get(pk).map(|k| self.expired.contains(k)).unwrap_or(false) {
                return ScanFlow::Continue;
            }
        }
        self.fetched.scanned_count += 1;

        let keep = match self.filter {
            Some(filter) => match filter.matches(&row) {
                Ok(keep) => keep,
                Err(e) => {
                    self.failure = Some(e);
                    return ScanFlow::Stop;
                }
            },
            None => true,
        };
        if keep {
            self.fetched.rows.push(row);
        }

        match self.stop_after {
            Some(n) if self.fetched.rows.len() >= n => ScanFlow::Stop,
            _ => ScanFlow::Continue,
        }
    }

    fn finish(self) -> ExecutorResult<Fetched> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.fetched),
        }
    }
}

/// Runs prepared queries against an adapter
pub struct QueryExecutor<'a> {
    adapter: &'a dyn Adapter,
    functions: &'a FunctionRegistry,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(adapter: &'a dyn Adapter, functions: &'a FunctionRegistry) -> Self {
        Self { adapter, functions }
    }

    /// Reads the rows matching the prepared predicate, in fetch order.
    ///
    /// With `stop_after`, the read stops once that many rows matched.
    pub async fn fetch(&self, prepared: &PreparedQuery, stop_after: Option<usize>) -> ExecutorResult<Fetched> {
        let table = prepared.table.as_str();
        let mut collector = Collector::new(
            prepared.filter.as_ref(),
            prepared.pk.as_deref(),
            &prepared.expired,
            stop_after,
        );

        match &prepared.fetch {
            Fetch::Keys(keys) => {
                for key in keys {
                    if prepared.expired.contains(key) {
                        continue;
                    }
                    if let Some(row) = self.adapter.read_pk(table, key).await? {
                        if collector.offer(row) == ScanFlow::Stop {
                            break;
                        }
                    }
                }
            }
            Fetch::All => {
                let mut on_row = |row: Row| collector.offer(row);
                self.adapter.read_all(table, &mut on_row).await?;
            }
            Fetch::PkRange { low, high } => {
                let mut on_row = |row: Row| collector.offer(row);
                self.adapter
                    .read_pk_range(table, low.as_ref(), high.as_ref(), &mut on_row)
                    .await?;
            }
            Fetch::Window { offset, limit, reverse } => {
                let mut on_row = |row: Row| collector.offer(row);
                self.adapter
                    .read_offset_limit(table, *offset, *limit, *reverse, &mut on_row)
                    .await?;
            }
        }

        collector.finish()
    }

    /// Every live row of a joined table
    async fn fetch_join(&self, join: &PreparedJoin) -> ExecutorResult<Vec<Row>> {
        let mut collector = Collector::new(None, join.pk.as_deref(), &join.expired, None);
        let mut on_row = |row: Row| collector.offer(row);
        self.adapter.read_all(&join.spec.table, &mut on_row).await?;
        Ok(collector.finish()?.rows)
    }

    /// Runs a select through the whole pipeline
    pub async fn select(&self, query: &Query, prepared: &PreparedQuery) -> ExecutorResult<ExecutionResult> {
        let m = &query.modifiers;
        let projector = Projector::new(&m.select, &m.group_by, self.functions)?;
        let windowed = matches!(prepared.fetch, Fetch::Window { .. });

        // stop early when nothing downstream needs the rest of the rows
        let streamable = prepared.joins.is_empty()
            && projector.is_identity()
            && prepared.having.is_none()
            && m.order_by.is_empty();
        let stop_after = match (streamable && !windowed, m.limit) {
            (true, Some(limit)) => Some(limit.saturating_add(m.offset.unwrap_or(0))),
            _ => None,
        };

        let fetched = self.fetch(prepared, stop_after).await?;
        let scanned_count = fetched.scanned_count;
        let mut rows = fetched.rows;

        if !prepared.joins.is_empty() {
            rows = rows.into_iter().map(|r| qualify(&prepared.table, r)).collect();
            let mut left_columns: Vec<String> = prepared
                .columns
                .iter()
                .map(|c| format!("{}.{}", prepared.table, c))
                .collect();

            for join in &prepared.joins {
                let right = self.fetch_join(join).await?;
                rows = apply_join(
                    rows,
                    &left_columns,
                    JoinInput {
                        spec: join.spec.clone(),
                        columns: join.columns.clone(),
                        rows: right,
                    },
                );
                left_columns.extend(join.columns.iter().map(|c| format!("{}.{}", join.spec.table, c)));
            }
        }

        if projector.is_per_row() {
            // order keys may name columns the select list leaves out
            let mut pairs = Vec::with_capacity(rows.len());
            for row in rows {
                let projected = projector.project_row(&row)?;
                if let Some(having) = &prepared.having {
                    if !having.matches(&projected)? {
                        continue;
                    }
                }
                pairs.push((projected, row));
            }
            ResultSorter::sort_projected(&mut pairs, &m.order_by);
            rows = pairs.into_iter().map(|(projected, _)| projected).collect();
        } else {
            rows = projector.apply(rows)?;

            if let Some(having) = &prepared.having {
                let mut kept = Vec::with_capacity(rows.len());
                for row in rows {
                    if having.matches(&row)? {
                        kept.push(row);
                    }
                }
                rows = kept;
            }

            ResultSorter::sort(&mut rows, &m.order_by);
        }

        if !windowed {
            let offset = m.offset.unwrap_or(0);
            let limit = m.limit.unwrap_or(usize::MAX);
            rows = rows.into_iter().skip(offset).take(limit).collect();
        }

        Ok(ExecutionResult {
            rows,
            scanned_count,
            class: prepared.class,
        })
    }
}
