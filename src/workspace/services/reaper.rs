//! Periodic teardown of expired workspaces.

use super::{WorkspaceLifecycleResult, WorkspaceLifecycleService};
use crate::workspace::domain::WorkspaceId;
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Destroys workspaces whose expiration has passed.
pub struct ExpirationReaper<C>
where
    C: Clock + Send + Sync,
{
    lifecycle: WorkspaceLifecycleService<C>,
    clock: Arc<C>,
}

impl<C> ExpirationReaper<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a reaper.
    #[must_use]
    pub const fn new(lifecycle: WorkspaceLifecycleService<C>, clock: Arc<C>) -> Self {
        Self { lifecycle, clock }
    }

    /// Destroys every expired workspace once, returning the ids torn down.
    ///
    /// A workspace that fails to destroy is logged and skipped so one bad
    /// row cannot stall the sweep.
    ///
    /// # Errors
    ///
    /// Returns [`super::WorkspaceLifecycleError`] when listing expired rows
    /// fails.
    pub async fn sweep(&self) -> WorkspaceLifecycleResult<Vec<WorkspaceId>> {
        let expired = self
            .lifecycle
            .ports()
            .workspaces
            .list_expired(self.clock.utc())
            .await?;
        let mut reaped = Vec::with_capacity(expired.len());
        for workspace in expired {
            let workspace_id = workspace.id();
            match self.lifecycle.reap(workspace_id).await {
                Ok(Some(_)) => reaped.push(workspace_id),
                Ok(None) => {}
                Err(err) => tracing::warn!(%workspace_id, error = %err, "failed to reap workspace"),
            }
        }
        if !reaped.is_empty() {
            tracing::info!(count = reaped.len(), "expired workspaces reaped");
        }
        Ok(reaped)
    }

    /// Sweeps every `interval` until `cancel` fires.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!("expiration reaper stopped");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.sweep().await {
                        tracing::warn!(error = %err, "expiration sweep failed");
                    }
                }
            }
        }
    }
}
