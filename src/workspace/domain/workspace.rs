//! Workspace aggregate root.

use super::{
    CodeSourceRef, InitFailureRecord, InitState, PortDescriptor, RepoId, UserId,
    WorkspaceDomainError, WorkspaceId, WorkspaceState,
};
use crate::resource_policy::{OverAllocated, ResourceSpec};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Tuple that identifies "the same workspace" for reuse purposes.
///
/// At most one live row may exist per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceSourceKey {
    /// Workspace owner.
    pub owner_id: UserId,
    /// Source repository.
    pub repo_id: RepoId,
    /// Pinned commit; empty for byte workspaces.
    pub commit: String,
    /// Code source row identifier.
    pub code_source_id: super::CodeSourceId,
}

/// Inputs for a freshly created workspace row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkspaceData {
    /// Identifier minted for the row.
    pub id: WorkspaceId,
    /// Workspace owner.
    pub owner_id: UserId,
    /// Source repository.
    pub repo_id: RepoId,
    /// Pinned commit.
    pub commit: String,
    /// Code source the workspace edits.
    pub code_source: CodeSourceRef,
    /// Editor settings copied from the code source or owner.
    pub workspace_settings: serde_json::Value,
    /// Clamping record, when the request exceeded the tier ceilings.
    pub over_allocated: Option<OverAllocated>,
    /// Granted resources.
    pub resources: ResourceSpec,
    /// Base container image.
    pub container: String,
    /// Whether this is a single-shot ephemeral session.
    pub is_ephemeral: bool,
    /// Initial expiration instant.
    pub expiration: DateTime<Utc>,
}

/// Container-backed development session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    id: WorkspaceId,
    owner_id: UserId,
    repo_id: RepoId,
    commit: String,
    code_source: CodeSourceRef,
    state: WorkspaceState,
    init_state: InitState,
    init_failure: Option<InitFailureRecord>,
    expiration: DateTime<Utc>,
    last_state_update: DateTime<Utc>,
    created_at: DateTime<Utc>,
    workspace_settings: serde_json::Value,
    over_allocated: Option<OverAllocated>,
    resources: ResourceSpec,
    container: String,
    ports: Vec<PortDescriptor>,
    is_ephemeral: bool,
    version: i64,
}

/// Parameter object for reconstructing persisted workspace state.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedWorkspaceData {
    /// Persisted identifier.
    pub id: WorkspaceId,
    /// Persisted owner.
    pub owner_id: UserId,
    /// Persisted repository.
    pub repo_id: RepoId,
    /// Persisted commit.
    pub commit: String,
    /// Persisted code source.
    pub code_source: CodeSourceRef,
    /// Persisted lifecycle state.
    pub state: WorkspaceState,
    /// Persisted provisioning step.
    pub init_state: InitState,
    /// Persisted failure record.
    pub init_failure: Option<InitFailureRecord>,
    /// Persisted expiration.
    pub expiration: DateTime<Utc>,
    /// Persisted last state change.
    pub last_state_update: DateTime<Utc>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted settings.
    pub workspace_settings: serde_json::Value,
    /// Persisted clamping record.
    pub over_allocated: Option<OverAllocated>,
    /// Persisted resources.
    pub resources: ResourceSpec,
    /// Persisted container image.
    pub container: String,
    /// Persisted forwarded ports.
    pub ports: Vec<PortDescriptor>,
    /// Persisted ephemeral flag.
    pub is_ephemeral: bool,
    /// Persisted optimistic-concurrency version.
    pub version: i64,
}

impl Workspace {
    /// Creates a workspace in `starting` with no provisioning progress.
    #[must_use]
    pub fn new(data: NewWorkspaceData, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: data.id,
            owner_id: data.owner_id,
            repo_id: data.repo_id,
            commit: data.commit,
            code_source: data.code_source,
            state: WorkspaceState::Starting,
            init_state: InitState::NotStarted,
            init_failure: None,
            expiration: data.expiration,
            last_state_update: timestamp,
            created_at: timestamp,
            workspace_settings: data.workspace_settings,
            over_allocated: data.over_allocated,
            resources: data.resources,
            container: data.container,
            ports: Vec::new(),
            is_ephemeral: data.is_ephemeral,
            version: 0,
        }
    }

    /// Reconstructs a workspace from persistence.
    #[must_use]
    pub fn from_persisted(data: PersistedWorkspaceData) -> Self {
        Self {
            id: data.id,
            owner_id: data.owner_id,
            repo_id: data.repo_id,
            commit: data.commit,
            code_source: data.code_source,
            state: data.state,
            init_state: data.init_state,
            init_failure: data.init_failure,
            expiration: data.expiration,
            last_state_update: data.last_state_update,
            created_at: data.created_at,
            workspace_settings: data.workspace_settings,
            over_allocated: data.over_allocated,
            resources: data.resources,
            container: data.container,
            ports: data.ports,
            is_ephemeral: data.is_ephemeral,
            version: data.version,
        }
    }

    /// Returns the workspace identifier.
    #[must_use]
    pub const fn id(&self) -> WorkspaceId {
        self.id
    }

    /// Returns the owner.
    #[must_use]
    pub const fn owner_id(&self) -> UserId {
        self.owner_id
    }

    /// Returns the source repository.
    #[must_use]
    pub const fn repo_id(&self) -> RepoId {
        self.repo_id
    }

    /// Returns the pinned commit.
    #[must_use]
    pub fn commit(&self) -> &str {
        &self.commit
    }

    /// Returns the code source.
    #[must_use]
    pub const fn code_source(&self) -> CodeSourceRef {
        self.code_source
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> WorkspaceState {
        self.state
    }

    /// Returns the recorded provisioning step.
    #[must_use]
    pub const fn init_state(&self) -> InitState {
        self.init_state
    }

    /// Returns the failure record, if provisioning failed.
    #[must_use]
    pub const fn init_failure(&self) -> Option<&InitFailureRecord> {
        self.init_failure.as_ref()
    }

    /// Returns the expiration instant.
    #[must_use]
    pub const fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    /// Returns the time of the last lifecycle state change.
    #[must_use]
    pub const fn last_state_update(&self) -> DateTime<Utc> {
        self.last_state_update
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the editor settings.
    #[must_use]
    pub const fn workspace_settings(&self) -> &serde_json::Value {
        &self.workspace_settings
    }

    /// Returns the clamping record.
    #[must_use]
    pub const fn over_allocated(&self) -> Option<OverAllocated> {
        self.over_allocated
    }

    /// Returns the granted resources.
    #[must_use]
    pub const fn resources(&self) -> ResourceSpec {
        self.resources
    }

    /// Returns the base container image.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Returns the forwarded ports.
    #[must_use]
    pub fn ports(&self) -> &[PortDescriptor] {
        &self.ports
    }

    /// Returns whether this is an ephemeral session.
    #[must_use]
    pub const fn is_ephemeral(&self) -> bool {
        self.is_ephemeral
    }

    /// Returns the optimistic-concurrency version.
    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }

    /// Returns the reuse key for this row.
    #[must_use]
    pub fn source_key(&self) -> WorkspaceSourceKey {
        WorkspaceSourceKey {
            owner_id: self.owner_id,
            repo_id: self.repo_id,
            commit: self.commit.clone(),
            code_source_id: self.code_source.id,
        }
    }

    /// Moves the expiration forward to `at`. Earlier instants are ignored
    /// so expiration never moves backwards within a lifetime.
    pub fn extend_expiration_to(&mut self, at: DateTime<Utc>) {
        if at > self.expiration {
            self.expiration = at;
        }
        self.bump();
    }

    /// Re-enters `starting` with provisioning progress reset.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::InvalidLifecycleTransition`] when the
    /// workspace cannot be restarted from its current state.
    pub fn restart(&mut self, clock: &impl Clock) -> Result<(), WorkspaceDomainError> {
        self.transition_to(WorkspaceState::Starting, clock)?;
        self.init_state = InitState::NotStarted;
        self.init_failure = None;
        Ok(())
    }

    /// Enters `stopping`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::InvalidLifecycleTransition`] when the
    /// transition is not allowed.
    pub fn begin_stop(&mut self, clock: &impl Clock) -> Result<(), WorkspaceDomainError> {
        self.transition_to(WorkspaceState::Stopping, clock)
    }

    /// Enters `removing`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::InvalidLifecycleTransition`] when the
    /// transition is not allowed.
    pub fn begin_destroy(&mut self, clock: &impl Clock) -> Result<(), WorkspaceDomainError> {
        self.transition_to(WorkspaceState::Removing, clock)
    }

    /// Records completion of a provisioning step.
    ///
    /// Returns `false` when `step` is already recorded, which makes replayed
    /// reports no-ops. Completing the final step activates the workspace.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::AgentNotPermitted`] outside `starting`
    /// and `active`, or [`WorkspaceDomainError::InitStepOutOfOrder`] when the
    /// step is not the current one or its direct successor.
    pub fn complete_init_step(
        &mut self,
        step: InitState,
        clock: &impl Clock,
    ) -> Result<bool, WorkspaceDomainError> {
        self.ensure_accepts_agent()?;
        if step == self.init_state {
            return Ok(false);
        }
        if self.init_state.next() != Some(step) {
            return Err(WorkspaceDomainError::InitStepOutOfOrder {
                workspace_id: self.id,
                current: self.init_state,
                requested: step,
            });
        }

        self.init_state = step;
        let target = if step == InitState::Completed {
            WorkspaceState::Active
        } else {
            WorkspaceState::Starting
        };
        self.transition_to(target, clock)?;
        Ok(true)
    }

    /// Marks provisioning as failed at `step`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::InvalidLifecycleTransition`] when the
    /// workspace can no longer fail (for example once deleted).
    pub fn fail_init(
        &mut self,
        step: InitState,
        failure: InitFailureRecord,
        clock: &impl Clock,
    ) -> Result<(), WorkspaceDomainError> {
        self.transition_to(WorkspaceState::Failed, clock)?;
        self.init_state = step;
        self.init_failure = Some(failure);
        Ok(())
    }

    /// Applies a state reported by a follower, optionally replacing the
    /// forwarded ports. Reporting the current state again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::UnreportableState`] when a follower
    /// tries to move the row into a state only the orchestrator may set, and
    /// [`WorkspaceDomainError::InvalidLifecycleTransition`] when the
    /// reported state cannot follow the current one.
    pub fn apply_follower_report(
        &mut self,
        state: WorkspaceState,
        ports: Option<Vec<PortDescriptor>>,
        clock: &impl Clock,
    ) -> Result<(), WorkspaceDomainError> {
        if state != self.state && !state.is_follower_reportable() {
            return Err(WorkspaceDomainError::UnreportableState {
                workspace_id: self.id,
                state: state.as_str().to_owned(),
            });
        }
        self.transition_to(state, clock)?;
        if let Some(reported) = ports {
            self.ports = reported;
            self.bump();
        }
        Ok(())
    }

    /// Validates that the in-container agent may act on this workspace.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceDomainError::AgentNotPermitted`] outside `starting`
    /// and `active`.
    pub fn ensure_accepts_agent(&self) -> Result<(), WorkspaceDomainError> {
        if self.state.accepts_agent() {
            return Ok(());
        }
        Err(WorkspaceDomainError::AgentNotPermitted {
            workspace_id: self.id,
            state: self.state.as_str().to_owned(),
        })
    }

    const fn bump(&mut self) {
        self.version += 1;
    }

    fn transition_to(
        &mut self,
        target: WorkspaceState,
        clock: &impl Clock,
    ) -> Result<(), WorkspaceDomainError> {
        if !self.state.can_transition_to(target) {
            return Err(WorkspaceDomainError::InvalidLifecycleTransition {
                workspace_id: self.id,
                from: self.state.as_str().to_owned(),
                to: target.as_str().to_owned(),
            });
        }

        if self.state != target {
            self.state = target;
            self.last_state_update = clock.utc();
        }
        self.bump();
        Ok(())
    }
}
