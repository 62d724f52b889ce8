//! # Change Events
//!
//! Emitted after the adapter confirms a write or delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::{Row, Value};

/// What changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    /// Rows inserted or updated
    Upsert,
    /// Rows deleted
    Delete,
    /// Every row of the table deleted
    Drop,
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeAction::Upsert => write!(f, "upsert"),
            ChangeAction::Delete => write!(f, "delete"),
            ChangeAction::Drop => write!(f, "drop"),
        }
    }
}

/// Which actions a subscription receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Any,
    Upsert,
    Delete,
    Drop,
}

impl EventKind {
    pub fn matches(&self, action: ChangeAction) -> bool {
        matches!(
            (self, action),
            (EventKind::Any, _)
                | (EventKind::Upsert, ChangeAction::Upsert)
                | (EventKind::Delete, ChangeAction::Delete)
                | (EventKind::Drop, ChangeAction::Drop)
        )
    }
}

/// A committed change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Monotonic per bus, in commit order
    pub sequence: u64,
    /// Database instance id
    pub source: String,
    pub table: String,
    pub time: DateTime<Utc>,
    pub action: ChangeAction,
    /// Primary keys touched, in commit order
    pub affected_keys: Vec<Value>,
    /// Rows as written (upsert) or as they were before removal (delete)
    pub result: Vec<Row>,
}

impl ChangeEvent {
    /// Builds an event; the bus assigns the sequence on publish
    pub fn new(
        source: impl Into<String>,
        table: impl Into<String>,
        action: ChangeAction,
        affected_keys: Vec<Value>,
        result: Vec<Row>,
    ) -> Self {
        Self {
            sequence: 0,
            source: source.into(),
            table: table.into(),
            time: Utc::now(),
            action,
            affected_keys,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matching() {
        assert!(EventKind::Any.matches(ChangeAction::Drop));
        assert!(EventKind::Upsert.matches(ChangeAction::Upsert));
        assert!(!EventKind::Upsert.matches(ChangeAction::Delete));
    }

    #[test]
    fn test_serialize() {
        let event = ChangeEvent::new("db", "users", ChangeAction::Delete, vec![Value::Int(1)], vec![]);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "delete");
        assert_eq!(json["affected_keys"][0], 1);
    }
}
