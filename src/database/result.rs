//! Result of a completed query

use crate::planner::{CostClass, Query, QueryState};
use crate::value::Row;

/// A completed query descriptor with how its rows were found
#[derive(Debug, Clone)]
pub struct QueryResult {
    query: Query,
    class: CostClass,
    scanned_count: usize,
}

impl QueryResult {
    pub(crate) fn new(query: Query, class: CostClass, scanned_count: usize) -> Self {
        debug_assert_eq!(query.state(), QueryState::Complete);
        Self {
            query,
            class,
            scanned_count,
        }
    }

    pub fn rows(&self) -> &[Row] {
        self.query.result()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.query.into_result()
    }

    /// The completed descriptor
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Cost class of the predicate that selected the rows
    pub fn class(&self) -> CostClass {
        self.class
    }

    /// Rows the adapter delivered while answering the query
    pub fn scanned_count(&self) -> usize {
        self.scanned_count
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }
}
