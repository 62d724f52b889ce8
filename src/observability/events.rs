//! Observable lifecycle events
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Adapter connected, tables registered
    DbConnect,
    /// Adapter disconnected
    DbDisconnect,
    /// Configuration loaded
    ConfigLoaded,
    /// Table model registered with the adapter
    TableRegistered,

    // Query processing
    /// Query entered the processing state
    QueryStart,
    /// Query planned
    QueryPlanned,
    /// Query completed successfully
    QueryComplete,
    /// Query rejected during validation
    QueryRejected,
    /// Query aborted after an adapter or integrity failure
    QueryAborted,
    /// Upsert skipped because the stored row is unchanged
    WriteUnchanged,

    // Relationships
    /// Relationship rebuild begins
    RelationRebuildStart,
    /// Relationship rebuild complete
    RelationRebuildComplete,
    /// Reference to a missing row removed
    RelationPruned,

    // Expiry
    /// Expired rows removed
    TtlExpired,

    // Explain
    /// Explain produced
    ExplainComplete,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::DbConnect => "DB_CONNECT",
            Event::DbDisconnect => "DB_DISCONNECT",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::TableRegistered => "TABLE_REGISTERED",

            Event::QueryStart => "QUERY_START",
            Event::QueryPlanned => "QUERY_PLANNED",
            Event::QueryComplete => "QUERY_COMPLETE",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::QueryAborted => "QUERY_ABORTED",
            Event::WriteUnchanged => "WRITE_UNCHANGED",

            Event::RelationRebuildStart => "RELATION_REBUILD_START",
            Event::RelationRebuildComplete => "RELATION_REBUILD_COMPLETE",
            Event::RelationPruned => "RELATION_PRUNED",

            Event::TtlExpired => "TTL_EXPIRED",

            Event::ExplainComplete => "EXPLAIN_COMPLETE",
        }
    }

    /// Returns true if the event reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::QueryAborted)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
