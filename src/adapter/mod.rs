//! Adapter Interface
//!
//! Storage backends implement [`Adapter`]. The core calls nothing else
//! that can suspend, and mutates its own indexes only after an adapter
//! call has confirmed the change.
//!
//! [`MemoryAdapter`] is the reference implementation used by the tests.

mod adapter;
mod errors;
mod memory;

pub use adapter::{Adapter, AdapterFuture, RowCallback, ScanFlow};
pub use errors::{AdapterError, AdapterResult};
pub use memory::{AdapterOp, MemoryAdapter};
