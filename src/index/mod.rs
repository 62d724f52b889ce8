//! Index subsystem for tabula
//!
//! Indexes are derived, in-memory state that mirrors what an adapter has
//! persisted. They are never the source of truth.
//!
//! - [`SortedIndex`]: ordered primary keys plus auto-increment counter,
//!   maintained by every adapter
//! - [`IndexManager`]: secondary indexes over `idx` columns
//! - [`PrefixTrie`] / [`TrieIndex`]: prefix search over `trie` columns
//!
//! # Invariants
//!
//! - A sorted index holds exactly the keys physically present, ascending
//! - Updates occur AFTER adapter writes and deletes are acknowledged
//! - Lookups return primary keys sorted ascending

mod btree;
mod manager;
mod sorted;
mod trie;

pub use btree::IndexTree;
pub use manager::IndexManager;
pub use sorted::SortedIndex;
pub use trie::{PrefixTrie, TrieIndex};
