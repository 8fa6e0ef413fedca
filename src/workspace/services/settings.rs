//! Tunables for the lifecycle services.

use chrono::Duration;

/// Expiration windows and batch sizes used by the lifecycle services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Expiration granted to a freshly created workspace.
    pub create_expiration: Duration,
    /// Expiration granted when an existing workspace is reused or started.
    pub reuse_expiration: Duration,
    /// Expiration granted by an agent heartbeat.
    pub agent_extension: Duration,
    /// Longest AFK extension an agent may request.
    pub afk_ceiling: Duration,
    /// Number of outbox entries relayed per batch.
    pub outbox_batch_size: usize,
    /// How long delivered outbox entries are kept before pruning.
    pub outbox_retention: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            create_expiration: Duration::minutes(15),
            reuse_expiration: Duration::minutes(30),
            agent_extension: Duration::minutes(10),
            afk_ceiling: Duration::minutes(60),
            outbox_batch_size: 64,
            outbox_retention: Duration::hours(24),
        }
    }
}
