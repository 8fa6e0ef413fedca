//! In-process fan-out of workspace status updates.
//!
//! The lifecycle services push a [`StatusUpdate`] after every committed
//! mutation. Each subscriber owns a bounded queue; when it falls behind, its
//! oldest updates are dropped so publishers never wait on a slow consumer.

mod hub;
mod update;

pub use hub::{DEFAULT_QUEUE_DEPTH, StatusHub, StatusSubscription, SubscriptionId};
pub use update::{StatusPublisher, StatusUpdate};
