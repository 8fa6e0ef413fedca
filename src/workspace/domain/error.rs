//! Error types for workspace domain validation and parsing.

use super::{InitState, WorkspaceId};
use thiserror::Error;

/// Errors returned while mutating workspace domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkspaceDomainError {
    /// Transitioning between two lifecycle states is invalid.
    #[error("invalid workspace lifecycle transition for {workspace_id}: {from} -> {to}")]
    InvalidLifecycleTransition {
        /// Workspace being mutated.
        workspace_id: WorkspaceId,
        /// Current lifecycle state.
        from: String,
        /// Requested target lifecycle state.
        to: String,
    },

    /// A follower reported a state that only the orchestrator may set.
    #[error("followers cannot move workspace {workspace_id} to {state}")]
    UnreportableState {
        /// Workspace being mutated.
        workspace_id: WorkspaceId,
        /// Reported lifecycle state.
        state: String,
    },

    /// Provisioning progress was reported while the workspace is not running.
    #[error("workspace {workspace_id} does not accept agent updates in state {state}")]
    AgentNotPermitted {
        /// Workspace being mutated.
        workspace_id: WorkspaceId,
        /// Lifecycle state in canonical string form.
        state: String,
    },

    /// A provisioning step skipped ahead or moved backwards.
    #[error("init step {requested} cannot follow {current} on workspace {workspace_id}")]
    InitStepOutOfOrder {
        /// Workspace being mutated.
        workspace_id: WorkspaceId,
        /// Step currently recorded.
        current: InitState,
        /// Step reported by the agent.
        requested: InitState,
    },
}

/// Error returned while parsing a lifecycle state from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown workspace state: {0}")]
pub struct ParseWorkspaceStateError(pub String);

/// Error returned while parsing an init state from persistence.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("unknown workspace init state: {0}")]
pub struct ParseInitStateError(pub i32);

/// Error returned while parsing a code source type from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown code source type: {0}")]
pub struct ParseCodeSourceTypeError(pub String);
