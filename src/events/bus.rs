//! # Event Bus
//!
//! Typed publish/subscribe per table and event kind. Subscribing to the
//! table `"*"` receives events of every table.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tokio::sync::mpsc;

use super::errors::{EventError, EventResult};
use super::event::{ChangeEvent, EventKind};

/// Event sender for a subscription
pub type EventSender = mpsc::UnboundedSender<ChangeEvent>;

/// Event receiver for a subscription
pub type EventReceiver = mpsc::UnboundedReceiver<ChangeEvent>;

/// Table name matching every table
pub const ALL_TABLES: &str = "*";

/// Subscription handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct Subscription {
    table: String,
    kind: EventKind,
    sender: EventSender,
}

/// Publish/subscribe hub
#[derive(Debug, Default)]
pub struct EventBus {
    subscriptions: RwLock<BTreeMap<SubscriptionId, Subscription>>,
    next_id: AtomicU64,
    sequence: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `kind` events of `table`
    pub fn subscribe(&self, table: &str, kind: EventKind) -> EventResult<(SubscriptionId, EventReceiver)> {
        if table.is_empty() {
            return Err(EventError::EmptyTable);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);

        let mut subscriptions = self
            .subscriptions
            .write()
            .map_err(|_| EventError::Internal("Lock poisoned".into()))?;
        subscriptions.insert(
            id,
            Subscription {
                table: table.to_string(),
                kind,
                sender: tx,
            },
        );
        Ok((id, rx))
    }

    /// Removes a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions
            .write()
            .map(|mut s| s.remove(&id).is_some())
            .unwrap_or(false)
    }

    /// Delivers an event to every matching subscription, in subscription
    /// order. Subscriptions whose receiver was dropped are removed.
    pub fn publish(&self, mut event: ChangeEvent) -> DispatchResult {
        let mut result = DispatchResult::default();
        event.sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        let mut subscriptions = match self.subscriptions.write() {
            Ok(s) => s,
            Err(_) => return result,
        };

        let mut closed = Vec::new();
        for (id, sub) in subscriptions.iter() {
            let table_matches = sub.table == ALL_TABLES || sub.table == event.table;
            if !table_matches || !sub.kind.matches(event.action) {
                continue;
            }
            result.matched += 1;
            match sub.sender.send(event.clone()) {
                Ok(()) => result.delivered += 1,
                Err(_) => {
                    result.failed += 1;
                    closed.push(*id);
                }
            }
        }
        for id in closed {
            subscriptions.remove(&id);
        }

        result
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().map(|s| s.len()).unwrap_or(0)
    }
}

/// Result of publishing an event
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchResult {
    /// Number of matching subscriptions
    pub matched: usize,
    /// Number of events delivered
    pub delivered: usize,
    /// Number of closed receivers
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeAction;
    use crate::value::Value;

    fn event(table: &str, action: ChangeAction) -> ChangeEvent {
        ChangeEvent::new("db", table, action, vec![Value::Int(1)], vec![])
    }

    #[tokio::test]
    async fn test_subscribe_and_receive() {
        let bus = EventBus::new();
        let (_, mut rx) = bus.subscribe("users", EventKind::Any).unwrap();

        let result = bus.publish(event("users", ChangeAction::Upsert));
        assert_eq!(result.delivered, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.table, "users");
        assert_eq!(received.sequence, 1);
    }

    #[tokio::test]
    async fn test_filters_by_table_and_kind() {
        let bus = EventBus::new();
        let (_, mut deletes) = bus.subscribe("users", EventKind::Delete).unwrap();
        let (_, mut all) = bus.subscribe(ALL_TABLES, EventKind::Any).unwrap();

        bus.publish(event("users", ChangeAction::Upsert));
        bus.publish(event("teams", ChangeAction::Delete));
        bus.publish(event("users", ChangeAction::Delete));

        let d = deletes.recv().await.unwrap();
        assert_eq!((d.table.as_str(), d.sequence), ("users", 3));
        assert!(deletes.try_recv().is_err());

        let seqs: Vec<u64> = (0..3).map(|_| all.try_recv().unwrap().sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_unsubscribe_is_deterministic() {
        let bus = EventBus::new();
        let (id, _rx) = bus.subscribe("users", EventKind::Any).unwrap();
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.publish(event("users", ChangeAction::Upsert)).matched, 0);
    }

    #[test]
    fn test_dropped_receiver_pruned() {
        let bus = EventBus::new();
        let (_, rx) = bus.subscribe("users", EventKind::Any).unwrap();
        drop(rx);
        let result = bus.publish(event("users", ChangeAction::Upsert));
        assert_eq!(result.failed, 1);
        assert_eq!(bus.subscription_count(), 0);
    }

    #[test]
    fn test_empty_table_rejected() {
        let bus = EventBus::new();
        assert_eq!(bus.subscribe("", EventKind::Any).unwrap_err(), EventError::EmptyTable);
    }
}
