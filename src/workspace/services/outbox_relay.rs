//! Relay from the transactional outbox to the message bus.

use crate::workspace::ports::{BusError, LifecycleOutbox, MessageBus, OutboxError};
use chrono::TimeDelta;
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Errors raised while relaying outbox entries.
#[derive(Debug, Clone, Error)]
pub enum OutboxRelayError {
    /// Reading or acknowledging entries failed.
    #[error(transparent)]
    Outbox(#[from] OutboxError),
    /// The bus refused an entry; it stays pending.
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Result type for outbox relay operations.
pub type OutboxRelayResult<T> = Result<T, OutboxRelayError>;

/// Publishes committed lifecycle intents in outbox order.
///
/// An entry is marked delivered only after the bus accepted it, so a crash
/// between the two steps redelivers it. Delivered entries are deleted by
/// [`OutboxRelay::run`] once they are older than the retention window.
pub struct OutboxRelay<C>
where
    C: Clock + Send + Sync,
{
    outbox: Arc<dyn LifecycleOutbox>,
    bus: Arc<dyn MessageBus>,
    clock: Arc<C>,
    batch_size: usize,
    retention: TimeDelta,
    dispatch: Arc<Mutex<()>>,
}

/// Retention applied until [`OutboxRelay::with_retention`] overrides it.
const DEFAULT_OUTBOX_RETENTION: TimeDelta = TimeDelta::hours(24);

impl<C> Clone for OutboxRelay<C>
where
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            outbox: Arc::clone(&self.outbox),
            bus: Arc::clone(&self.bus),
            clock: Arc::clone(&self.clock),
            batch_size: self.batch_size,
            retention: self.retention,
            dispatch: Arc::clone(&self.dispatch),
        }
    }
}

impl<C> OutboxRelay<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a relay reading `batch_size` entries at a time.
    #[must_use]
    pub fn new(
        outbox: Arc<dyn LifecycleOutbox>,
        bus: Arc<dyn MessageBus>,
        clock: Arc<C>,
        batch_size: usize,
    ) -> Self {
        Self {
            outbox,
            bus,
            clock,
            batch_size: batch_size.max(1),
            retention: DEFAULT_OUTBOX_RETENTION,
            dispatch: Arc::new(Mutex::new(())),
        }
    }

    /// Keeps delivered entries for `retention` before pruning them.
    #[must_use]
    pub const fn with_retention(mut self, retention: TimeDelta) -> Self {
        self.retention = retention;
        self
    }

    /// Publishes every pending entry and returns how many were delivered.
    ///
    /// Stops at the first bus failure so that entries for one workspace are
    /// never delivered out of order.
    ///
    /// # Errors
    ///
    /// Returns [`OutboxRelayError`] when the outbox or the bus fails.
    pub async fn dispatch_pending(&self) -> OutboxRelayResult<usize> {
        let _guard = self.dispatch.lock().await;
        let mut delivered = 0;
        loop {
            let batch = self.outbox.pending(self.batch_size).await?;
            let exhausted = batch.len() < self.batch_size;
            for entry in batch {
                self.bus.publish(&entry.subject, &entry.payload).await?;
                self.outbox.mark_delivered(entry.id, self.clock.utc()).await?;
                tracing::debug!(
                    outbox_id = entry.id,
                    workspace_id = %entry.workspace_id,
                    subject = %entry.subject,
                    "lifecycle intent published"
                );
                delivered += 1;
            }
            if exhausted {
                return Ok(delivered);
            }
        }
    }

    /// Deletes entries delivered more than the retention window ago and
    /// returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`OutboxRelayError::Outbox`] when the outbox fails.
    pub async fn prune_delivered(&self) -> OutboxRelayResult<usize> {
        let cutoff = self.clock.utc() - self.retention;
        Ok(self.outbox.prune_delivered(cutoff).await?)
    }

    /// Redelivers pending entries and prunes old delivered ones every
    /// `interval` until cancelled.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!("outbox relay stopped");
                    return;
                }
                _ = ticker.tick() => {
                    match self.dispatch_pending().await {
                        Ok(0) => {}
                        Ok(delivered) => tracing::info!(delivered, "redelivered pending lifecycle intents"),
                        Err(err) => tracing::warn!(error = %err, "outbox relay pass failed; retrying next tick"),
                    }
                    match self.prune_delivered().await {
                        Ok(0) => {}
                        Ok(pruned) => tracing::debug!(pruned, "pruned delivered lifecycle intents"),
                        Err(err) => tracing::warn!(error = %err, "outbox prune failed; retrying next tick"),
                    }
                }
            }
        }
    }
}
