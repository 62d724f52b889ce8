//! # Relationship Engine
//!
//! Keeps both sides of a declared relationship consistent. The owning
//! side is a column carrying `ref=>Target`; the optional back-reference
//! is a target column listing the owners that point at each target row.
//!
//! # Invariants
//!
//! - After any relate operation or synced write, a target row lists an
//!   owner in its back-reference exactly when that owner's column holds
//!   the target's key
//! - Array back-references never hold duplicates
//! - `rebuild` run twice leaves the same state as run once
//!
//! Operating on a column that is not a relationship is a no-op.

mod descriptor;
mod engine;

pub use descriptor::{derive_relationships, BackRef, Cardinality, Relationship};
pub use engine::{RefEdit, RelationStore, RelationshipEngine, StoreFuture};
