//! Transactional outbox port.

use crate::workspace::domain::WorkspaceId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for outbox operations.
pub type OutboxResult<T> = Result<T, OutboxError>;

/// Lifecycle intent committed alongside its row mutation and awaiting
/// delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    /// Monotonic entry identifier; delivery follows this order.
    pub id: i64,
    /// Workspace the intent targets.
    pub workspace_id: WorkspaceId,
    /// Bus subject.
    pub subject: String,
    /// JSON message body.
    pub payload: serde_json::Value,
    /// Commit timestamp.
    pub created_at: DateTime<Utc>,
}

/// Read side of the outbox written by
/// [`WorkspaceRepository`](super::WorkspaceRepository).
#[async_trait]
pub trait LifecycleOutbox: Send + Sync {
    /// Returns up to `limit` undelivered entries in id order.
    async fn pending(&self, limit: usize) -> OutboxResult<Vec<OutboxEntry>>;

    /// Marks an entry as delivered.
    async fn mark_delivered(&self, id: i64, delivered_at: DateTime<Utc>) -> OutboxResult<()>;

    /// Deletes entries delivered before `older_than` and returns how many
    /// were removed. Pending entries are never removed.
    async fn prune_delivered(&self, older_than: DateTime<Utc>) -> OutboxResult<usize>;
}

/// Errors returned by outbox adapters.
#[derive(Debug, Clone, Error)]
pub enum OutboxError {
    /// Persistence layer failure.
    #[error("outbox persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl OutboxError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
