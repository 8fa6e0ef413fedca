//! Status snapshots and the publishing seam.

use crate::workspace::domain::{
    InitFailureRecord, PortDescriptor, UserId, Workspace, WorkspaceId, WorkspaceState,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a workspace row as shown to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Workspace identifier.
    pub workspace_id: WorkspaceId,
    /// Workspace owner.
    pub owner_id: UserId,
    /// Lifecycle state.
    pub state: WorkspaceState,
    /// Provisioning step in progress, as reported to the UI.
    pub init_state: i32,
    /// Failure details when provisioning failed.
    pub init_failure: Option<InitFailureRecord>,
    /// Reaper deadline.
    pub expiration: DateTime<Utc>,
    /// Timestamp of the last state change.
    pub last_state_update: DateTime<Utc>,
    /// Forwarded ports.
    pub ports: Vec<PortDescriptor>,
    /// Row version the snapshot was taken at.
    pub version: i64,
}

impl From<&Workspace> for StatusUpdate {
    fn from(workspace: &Workspace) -> Self {
        Self {
            workspace_id: workspace.id(),
            owner_id: workspace.owner_id(),
            state: workspace.state(),
            init_state: workspace.init_state().frontend_value(),
            init_failure: workspace.init_failure().cloned(),
            expiration: workspace.expiration(),
            last_state_update: workspace.last_state_update(),
            ports: workspace.ports().to_vec(),
            version: workspace.version(),
        }
    }
}

/// Receives status updates after lifecycle mutations commit.
///
/// Implementations must return promptly; they are called inline by the
/// lifecycle services.
pub trait StatusPublisher: Send + Sync {
    /// Publishes the current state of `workspace`.
    fn publish(&self, workspace: &Workspace);
}
