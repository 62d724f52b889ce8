//! # Adapter Interface
//!
//! Capability trait every storage backend implements. Each call is a
//! suspension point of the core; nothing else awaits.

use futures_util::future::BoxFuture;

use crate::schema::TableModel;
use crate::value::{Row, Value};

use super::errors::AdapterResult;

/// Future returned by adapter calls
pub type AdapterFuture<'a, T> = BoxFuture<'a, AdapterResult<T>>;

/// Per-row callback of streaming reads
///
/// The adapter does not advance to the next row until the callback
/// returns; returning [`ScanFlow::Stop`] ends the read early.
pub type RowCallback<'a> = &'a mut (dyn FnMut(Row) -> ScanFlow + Send);

/// Whether a streaming read should continue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanFlow {
    Continue,
    Stop,
}

/// Storage backend
pub trait Adapter: Send + Sync {
    /// Adapter name for logs
    fn name(&self) -> &str;

    /// Opens the backend for a database instance
    fn connect<'a>(&'a self, instance_id: &'a str) -> AdapterFuture<'a, ()>;

    /// Creates storage for a table. `sorted` selects a sorted or an
    /// insertion-ordered primary key index.
    ///
    /// A table that already exists with the same primary key column is
    /// reopened with its rows intact.
    fn make_table<'a>(&'a self, model: &'a TableModel, sorted: bool) -> AdapterFuture<'a, ()>;

    fn destroy_table<'a>(&'a self, table: &'a str) -> AdapterFuture<'a, ()>;

    fn disconnect<'a>(&'a self) -> AdapterFuture<'a, ()> {
        Box::pin(async { Ok(()) })
    }

    /// Writes a row. With `pk == None` the adapter assigns the next
    /// auto-increment key. Returns the row as stored.
    fn write<'a>(&'a self, table: &'a str, pk: Option<Value>, row: Row) -> AdapterFuture<'a, Row>;

    fn read_pk<'a>(&'a self, table: &'a str, pk: &'a Value) -> AdapterFuture<'a, Option<Row>>;

    /// Streams every row in index order
    fn read_all<'a>(&'a self, table: &'a str, on_row: RowCallback<'a>) -> AdapterFuture<'a, ()>;

    /// Streams rows with `low <= pk <= high`; `None` is open
    fn read_pk_range<'a>(
        &'a self,
        table: &'a str,
        low: Option<&'a Value>,
        high: Option<&'a Value>,
        on_row: RowCallback<'a>,
    ) -> AdapterFuture<'a, ()>;

    /// Streams a window of rows, from the tail when `reverse`
    fn read_offset_limit<'a>(
        &'a self,
        table: &'a str,
        offset: usize,
        limit: usize,
        reverse: bool,
        on_row: RowCallback<'a>,
    ) -> AdapterFuture<'a, ()>;

    /// Deletes a row. Deleting an absent key succeeds.
    fn delete_pk<'a>(&'a self, table: &'a str, pk: &'a Value) -> AdapterFuture<'a, ()>;

    /// Every primary key in index order
    fn get_index<'a>(&'a self, table: &'a str) -> AdapterFuture<'a, Vec<Value>>;

    fn get_number_of_records<'a>(&'a self, table: &'a str) -> AdapterFuture<'a, usize> {
        Box::pin(async move { Ok(self.get_index(table).await?.len()) })
    }

    /// The key the next `write` with `pk == None` would receive
    fn next_auto_increment<'a>(&'a self, table: &'a str) -> AdapterFuture<'a, i64>;
}
