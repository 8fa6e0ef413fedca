//! Domain model for workspaces and the rows they link to.
//!
//! The [`Workspace`] aggregate owns the lifecycle state machine. Everything
//! here is free of I/O; persistence and messaging live behind the ports.

mod agent;
mod attempt;
mod caller;
mod code_source;
mod ephemeral;
mod error;
mod failure;
mod ids;
mod intent;
mod state;
mod url;
mod workspace;

pub use agent::{AgentSecret, WorkspaceAgent};
pub use attempt::{Attempt, AttemptId, AttemptRecord, PostId, PostRecord, PostVisibility};
pub use caller::Caller;
pub use code_source::{CodeSourceRef, CodeSourceSummary, CodeSourceType};
pub use ephemeral::{EphemeralBinding, NetworkId};
pub use error::{
    ParseCodeSourceTypeError, ParseInitStateError, ParseWorkspaceStateError, WorkspaceDomainError,
};
pub use failure::{InitFailureRecord, PortDescriptor};
pub use ids::{CodeSourceId, RepoId, UserId, WorkspaceId};
pub use intent::{
    CreateWorkspaceMessage, DestroyWorkspaceMessage, IntentCodecError, LifecycleIntent,
    SUBJECT_CREATE, SUBJECT_DESTROY, SUBJECT_START, SUBJECT_STOP, StartWorkspaceMessage,
    StopWorkspaceMessage,
};
pub use state::{InitState, WorkspaceState};
pub use url::{byte_agent_url, editor_url};
pub use workspace::{NewWorkspaceData, PersistedWorkspaceData, Workspace, WorkspaceSourceKey};
