//! Subscriber registry with bounded per-subscriber queues.

use super::{StatusPublisher, StatusUpdate};
use crate::workspace::domain::{Workspace, WorkspaceId};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::Notify;

/// Default number of updates buffered per subscriber.
pub const DEFAULT_QUEUE_DEPTH: usize = 16;

/// Identifies one subscription within a hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Debug, Default)]
struct Queue {
    updates: VecDeque<StatusUpdate>,
    dropped: u64,
    closed: bool,
    newest: Option<i64>,
}

impl Queue {
    /// Whether `version` predates an update already queued for this
    /// subscriber.
    fn is_stale(&self, version: i64) -> bool {
        self.newest.is_some_and(|newest| version < newest)
    }
}

#[derive(Debug, Default)]
struct Subscriber {
    queue: Mutex<Queue>,
    notify: Notify,
}

impl Subscriber {
    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&self) {
        self.queue().closed = true;
        self.notify.notify_one();
    }
}

type Registry = HashMap<WorkspaceId, HashMap<SubscriptionId, Arc<Subscriber>>>;

#[derive(Debug)]
struct HubInner {
    depth: usize,
    next_id: AtomicU64,
    subscribers: Mutex<Registry>,
}

impl HubInner {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, workspace_id: WorkspaceId, id: SubscriptionId) -> Option<Arc<Subscriber>> {
        let mut registry = self.registry();
        let entry = registry.get_mut(&workspace_id)?;
        let removed = entry.remove(&id);
        if entry.is_empty() {
            registry.remove(&workspace_id);
        }
        removed
    }
}

/// Name-keyed fan-out of workspace status updates.
///
/// Publishing never blocks: each subscriber holds at most `depth` pending
/// updates and the oldest is discarded when a new one arrives at a full
/// queue. Each subscriber observes a workspace's versions in ascending order:
/// an update older than one it has already been handed is discarded, so a
/// slow writer cannot roll a subscriber back to a superseded state.
#[derive(Debug, Clone)]
pub struct StatusHub {
    inner: Arc<HubInner>,
}

impl Default for StatusHub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_DEPTH)
    }
}

impl StatusHub {
    /// Creates a hub buffering up to `depth` updates per subscriber.
    ///
    /// A depth of zero is treated as one.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                depth: depth.max(1),
                next_id: AtomicU64::new(1),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Registers a subscriber for `workspace_id`.
    #[must_use]
    pub fn subscribe(&self, workspace_id: WorkspaceId) -> StatusSubscription {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Arc::new(Subscriber::default());
        self.inner
            .registry()
            .entry(workspace_id)
            .or_default()
            .insert(id, Arc::clone(&subscriber));
        tracing::debug!(%workspace_id, subscription = id.0, "status subscriber registered");
        StatusSubscription {
            id,
            workspace_id,
            subscriber,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Deregisters a subscription. Pending receivers observe the end of the
    /// stream once their queue drains.
    pub fn unsubscribe(&self, workspace_id: WorkspaceId, id: SubscriptionId) {
        if let Some(subscriber) = self.inner.remove(workspace_id, id) {
            subscriber.close();
            tracing::debug!(%workspace_id, subscription = id.0, "status subscriber removed");
        }
    }

    /// Returns the number of live subscriptions for `workspace_id`.
    #[must_use]
    pub fn subscriber_count(&self, workspace_id: WorkspaceId) -> usize {
        self.inner
            .registry()
            .get(&workspace_id)
            .map_or(0, HashMap::len)
    }

    /// Pushes `update` to every subscriber of its workspace.
    pub fn broadcast(&self, update: &StatusUpdate) {
        let targets: Vec<Arc<Subscriber>> = self
            .inner
            .registry()
            .get(&update.workspace_id)
            .map(|entry| entry.values().cloned().collect())
            .unwrap_or_default();

        for subscriber in targets {
            let overflowed = {
                let mut queue = subscriber.queue();
                if queue.is_stale(update.version) {
                    tracing::debug!(
                        workspace_id = %update.workspace_id,
                        version = update.version,
                        "discarding superseded status update"
                    );
                    continue;
                }
                queue.newest = Some(update.version);
                let full = queue.updates.len() >= self.inner.depth;
                if full {
                    queue.updates.pop_front();
                    queue.dropped += 1;
                }
                queue.updates.push_back(update.clone());
                full
            };
            if overflowed {
                tracing::warn!(
                    workspace_id = %update.workspace_id,
                    "status subscriber lagging; dropped oldest update"
                );
            }
            subscriber.notify.notify_one();
        }
    }
}

impl StatusPublisher for StatusHub {
    fn publish(&self, workspace: &Workspace) {
        self.broadcast(&StatusUpdate::from(workspace));
    }
}

/// Receiving half of a status subscription.
///
/// Dropping it deregisters the subscriber.
#[derive(Debug)]
pub struct StatusSubscription {
    id: SubscriptionId,
    workspace_id: WorkspaceId,
    subscriber: Arc<Subscriber>,
    hub: Weak<HubInner>,
}

impl StatusSubscription {
    /// Returns the subscription identifier.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the observed workspace.
    #[must_use]
    pub const fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }

    /// Waits for the next update. Returns `None` once unsubscribed and
    /// drained.
    pub async fn recv(&mut self) -> Option<StatusUpdate> {
        loop {
            let notified = self.subscriber.notify.notified();
            {
                let mut queue = self.subscriber.queue();
                if let Some(update) = queue.updates.pop_front() {
                    return Some(update);
                }
                if queue.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Returns the next queued update without waiting.
    pub fn try_recv(&mut self) -> Option<StatusUpdate> {
        self.subscriber.queue().updates.pop_front()
    }

    /// Returns how many updates were discarded because this subscriber fell
    /// behind.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.subscriber.queue().dropped
    }
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.workspace_id, self.id);
        }
    }
}
