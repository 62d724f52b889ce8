//! # Change Events
//!
//! Every committed write or delete produces a [`ChangeEvent`]. Events are
//! published only after the adapter confirms the mutation, so delivery
//! order matches commit order.

mod bus;
mod errors;
mod event;

pub use bus::{DispatchResult, EventBus, EventReceiver, EventSender, SubscriptionId, ALL_TABLES};
pub use errors::{EventError, EventResult};
pub use event::{ChangeAction, ChangeEvent, EventKind};
