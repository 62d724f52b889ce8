//! Structural diff subsystem for tabula
//!
//! Computes an edit script between two nested values. The core uses it
//! to detect whether an update actually changes a stored row; callers
//! use it for caching and history features.
//!
//! # Entries
//!
//! - `New`: present only on the right
//! - `Deleted`: present only on the left
//! - `Edited`: leaf value or type changed
//! - `ArrayChange`: an array element at `index` was added, removed or
//!   replaced
//!
//! # Invariants
//!
//! - `diff(x, x)` is empty, including for self-referential graphs
//! - `New` entries of `diff(a, b)` are exactly the `Deleted` entries of
//!   `diff(b, a)`
//! - NaN equals NaN

mod engine;
mod entry;
mod graph;
mod hash;
mod node;

pub use engine::{diff, diff_nodes, diff_with, DiffOptions};
pub use entry::{DiffEntry, DiffKind, ItemChange, PathSegment};
pub use graph::{GraphNode, GraphValue};
pub use hash::structural_hash;
pub use node::{DiffNode, NodeView};
