//! Workspace lifecycle orchestration.

use super::{
    LifecycleSettings, OutboxRelay, WorkspaceLifecycleError, WorkspaceLifecycleResult,
    WorkspacePorts,
};
use crate::vcs::ports::VcsClient;
use crate::workspace::{
    domain::{
        AgentSecret, CodeSourceId, CodeSourceRef, CodeSourceSummary, CodeSourceType, Caller,
        CreateWorkspaceMessage, DestroyWorkspaceMessage, InitFailureRecord, InitState,
        LifecycleIntent, NewWorkspaceData, PortDescriptor, RepoId, StartWorkspaceMessage,
        StopWorkspaceMessage, Workspace, WorkspaceAgent, WorkspaceId, WorkspaceSourceKey,
        WorkspaceState, byte_agent_url, editor_url,
    },
    ports::WorkspaceRepositoryError,
};
use crate::workspace_config::{
    ports::WorkspaceConfigRepository,
    services::{ResolveRequest, WorkspaceConfigResolver},
};
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use std::sync::Arc;

/// Message returned by successful creates, including reuse.
pub const WORKSPACE_CREATED_MESSAGE: &str = "Workspace Created Successfully";
const STARTING_MESSAGE: &str = "Workspace is starting.";
const STOPPING_MESSAGE: &str = "Workspace is stopping.";
const DESTROYING_MESSAGE: &str = "Workspace is destroying.";
const EXPIRATION_MESSAGE: &str = "Workspace Expiration Updated Successfully";
const AFK_MESSAGE: &str = "Workspace AFK Time Extension Added Successfully";

/// Request to open a workspace on a code source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWorkspaceRequest {
    /// Code source being edited.
    pub code_source: CodeSourceRef,
    /// Repository holding the code and its config.
    pub repo_id: RepoId,
    /// Commit or branch to open.
    pub commit: String,
    /// URL the follower should expose the workspace on.
    pub access_url: String,
}

impl CreateWorkspaceRequest {
    /// Creates a request for a repository-backed code source.
    #[must_use]
    pub fn new(
        code_source: CodeSourceRef,
        repo_id: RepoId,
        commit: impl Into<String>,
        access_url: impl Into<String>,
    ) -> Self {
        Self {
            code_source,
            repo_id,
            commit: commit.into(),
            access_url: access_url.into(),
        }
    }

    /// Creates a request for a byte scratch, which has no repository.
    #[must_use]
    pub fn byte(byte_id: CodeSourceId, access_url: impl Into<String>) -> Self {
        Self::new(
            CodeSourceRef::new(byte_id, CodeSourceType::Byte),
            RepoId::new(-1),
            String::new(),
            access_url,
        )
    }

    fn source_key(&self, caller: &Caller) -> WorkspaceSourceKey {
        WorkspaceSourceKey {
            owner_id: caller.id(),
            repo_id: self.repo_id,
            commit: self.commit.clone(),
            code_source_id: self.code_source.id,
        }
    }
}

/// How a create request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// A new row was inserted and a create intent published.
    Created,
    /// A starting or active row was reused; only its expiration moved.
    Reused,
    /// A stopped row was reused and a start intent published.
    Restarted,
}

/// Result of a create request.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceHandle {
    /// The workspace row after the operation.
    pub workspace: Workspace,
    /// Editor (or byte agent) URL for the UI.
    pub editor_url: String,
    /// Whether the row was created or reused.
    pub outcome: CreateOutcome,
    /// Explanation of clamped resources, when the config asked for too much.
    pub over_allocation: Option<String>,
    /// Short message for the UI.
    pub user_message: String,
}

/// Result of start, stop and destroy.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    /// The workspace row after the transition.
    pub workspace: Workspace,
    /// Short message for the UI.
    pub user_message: String,
}

/// Result of agent-driven expiration extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpirationOutcome {
    /// Extended workspace.
    pub workspace_id: WorkspaceId,
    /// Expiration after the extension.
    pub expiration: DateTime<Utc>,
    /// Short message for the UI.
    pub user_message: String,
}

impl ExpirationOutcome {
    /// Returns the expiration as a unix timestamp.
    #[must_use]
    pub const fn expiration_unix(&self) -> i64 {
        self.expiration.timestamp()
    }
}

/// Status view of a workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceStatus {
    /// The workspace row.
    pub workspace: Workspace,
    /// Editor URL, built from the current config.
    pub editor_url: String,
    /// Provisioning step in progress, as shown to the UI.
    pub init_state: i32,
    /// The code source the workspace edits.
    pub code_source: CodeSourceSummary,
}

/// A new workspace row and its create intent, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PreparedWorkspace {
    pub(crate) workspace: Workspace,
    pub(crate) intent: LifecycleIntent,
    pub(crate) editor_url: String,
    pub(crate) over_allocation: Option<String>,
}

type DynResolver = WorkspaceConfigResolver<dyn VcsClient, dyn WorkspaceConfigRepository>;

/// Owns the workspace row and its state machine.
///
/// Every mutation is written together with its lifecycle intent in one
/// repository call; intents reach the bus only after that call commits.
pub struct WorkspaceLifecycleService<C>
where
    C: Clock + Send + Sync,
{
    ports: WorkspacePorts,
    resolver: DynResolver,
    relay: OutboxRelay<C>,
    settings: LifecycleSettings,
    clock: Arc<C>,
}

impl<C> Clone for WorkspaceLifecycleService<C>
where
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            ports: self.ports.clone(),
            resolver: self.resolver.clone(),
            relay: self.relay.clone(),
            settings: self.settings,
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C> WorkspaceLifecycleService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a lifecycle service.
    #[must_use]
    pub fn new(ports: WorkspacePorts, settings: LifecycleSettings, clock: Arc<C>) -> Self {
        let resolver = WorkspaceConfigResolver::new(
            Arc::clone(&ports.vcs),
            Arc::clone(&ports.templates),
        );
        let relay = OutboxRelay::new(
            Arc::clone(&ports.outbox),
            Arc::clone(&ports.bus),
            Arc::clone(&clock),
            settings.outbox_batch_size,
        )
        .with_retention(settings.outbox_retention);
        Self {
            ports,
            resolver,
            relay,
            settings,
            clock,
        }
    }

    /// Returns the relay used after each commit.
    #[must_use]
    pub const fn relay(&self) -> &OutboxRelay<C> {
        &self.relay
    }

    pub(crate) const fn ports(&self) -> &WorkspacePorts {
        &self.ports
    }

    /// Opens a workspace, reusing a live one for the same source tuple.
    ///
    /// A reused `stopped` row is restarted. When a concurrent create wins
    /// the insert, the winner's row is reused.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceLifecycleError`] when the code source is missing
    /// or not owned by the caller, no editor settings are available, the
    /// config cannot be resolved, or persistence fails.
    pub async fn create(
        &self,
        caller: &Caller,
        request: CreateWorkspaceRequest,
    ) -> WorkspaceLifecycleResult<WorkspaceHandle> {
        let key = request.source_key(caller);
        if let Some(existing) = self.ports.workspaces.find_live_by_source_key(&key).await? {
            return self.reuse(existing).await;
        }

        let prepared = self.prepare(caller, &request, false).await?;
        match self
            .ports
            .workspaces
            .insert(&prepared.workspace, Some(&prepared.intent))
            .await
        {
            Ok(()) => {}
            Err(WorkspaceRepositoryError::DuplicateActiveWorkspace(_)) => {
                let winner = self
                    .ports
                    .workspaces
                    .find_live_by_source_key(&key)
                    .await?
                    .ok_or_else(|| {
                        WorkspaceRepositoryError::DuplicateActiveWorkspace(key.clone())
                    })?;
                tracing::info!(
                    workspace_id = %winner.id(),
                    owner_id = %caller.id(),
                    "concurrent create lost the insert; reusing live workspace"
                );
                return self.reuse(winner).await;
            }
            Err(err) => return Err(err.into()),
        }

        self.after_commit(&prepared.workspace, true).await;
        self.touch(request.code_source).await;
        tracing::info!(
            workspace_id = %prepared.workspace.id(),
            owner_id = %caller.id(),
            code_source = %request.code_source.kind,
            "workspace created"
        );
        Ok(WorkspaceHandle {
            workspace: prepared.workspace,
            editor_url: prepared.editor_url,
            outcome: CreateOutcome::Created,
            over_allocation: prepared.over_allocation,
            user_message: WORKSPACE_CREATED_MESSAGE.to_owned(),
        })
    }

    /// Opens a workspace on a byte scratch.
    ///
    /// # Errors
    ///
    /// See [`Self::create`].
    pub async fn create_byte_workspace(
        &self,
        caller: &Caller,
        byte_id: CodeSourceId,
        access_url: impl Into<String>,
    ) -> WorkspaceLifecycleResult<WorkspaceHandle> {
        self.create(caller, CreateWorkspaceRequest::byte(byte_id, access_url))
            .await
    }

    /// Restarts a workspace owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceLifecycleError::NotFound`] when the caller owns no
    /// such workspace, or a domain error when it cannot be restarted from
    /// its current state.
    pub async fn start(
        &self,
        caller: &Caller,
        workspace_id: WorkspaceId,
    ) -> WorkspaceLifecycleResult<TransitionOutcome> {
        let mut workspace = self.load_owned(caller, workspace_id).await?;
        let expected = workspace.version();
        workspace.restart(&*self.clock)?;
        workspace.extend_expiration_to(self.clock.utc() + self.settings.reuse_expiration);
        let intent = LifecycleIntent::Start(StartWorkspaceMessage { id: workspace_id });
        self.commit(&workspace, expected, Some(&intent)).await?;
        self.touch(workspace.code_source()).await;
        tracing::info!(%workspace_id, owner_id = %caller.id(), "workspace starting");
        Ok(TransitionOutcome {
            workspace,
            user_message: STARTING_MESSAGE.to_owned(),
        })
    }

    /// Stops a workspace owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceLifecycleError::NotFound`] when the caller owns no
    /// such workspace, or a domain error when it cannot be stopped.
    pub async fn stop(
        &self,
        caller: &Caller,
        workspace_id: WorkspaceId,
    ) -> WorkspaceLifecycleResult<TransitionOutcome> {
        let mut workspace = self.load_owned(caller, workspace_id).await?;
        let expected = workspace.version();
        workspace.begin_stop(&*self.clock)?;
        let intent = LifecycleIntent::Stop(StopWorkspaceMessage {
            id: workspace_id,
            owner_id: workspace.owner_id(),
            workspace_failed: false,
        });
        self.commit(&workspace, expected, Some(&intent)).await?;
        tracing::info!(%workspace_id, owner_id = %caller.id(), "workspace stopping");
        Ok(TransitionOutcome {
            workspace,
            user_message: STOPPING_MESSAGE.to_owned(),
        })
    }

    /// Destroys a workspace owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceLifecycleError::NotFound`] when the caller owns no
    /// such workspace, or a domain error when it cannot be destroyed.
    pub async fn destroy(
        &self,
        caller: &Caller,
        workspace_id: WorkspaceId,
    ) -> WorkspaceLifecycleResult<TransitionOutcome> {
        let workspace = self.load_owned(caller, workspace_id).await?;
        let destroyed = self.destroy_row(workspace).await?;
        Ok(TransitionOutcome {
            workspace: destroyed,
            user_message: DESTROYING_MESSAGE.to_owned(),
        })
    }

    /// Destroys a workspace whose expiration has passed.
    ///
    /// The row is reloaded first; if it was extended or already torn down in
    /// the meantime, nothing happens and `None` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceLifecycleError`] when persistence fails.
    pub async fn reap(
        &self,
        workspace_id: WorkspaceId,
    ) -> WorkspaceLifecycleResult<Option<Workspace>> {
        let Some(workspace) = self.ports.workspaces.find_by_id(workspace_id).await? else {
            return Ok(None);
        };
        if !workspace.state().is_reapable() || workspace.expiration() >= self.clock.utc() {
            return Ok(None);
        }
        self.destroy_row(workspace).await.map(Some)
    }

    /// Extends the expiration on behalf of the in-container agent.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceLifecycleError::AgentNotFound`] when the secret
    /// does not match, or a domain error outside `starting` and `active`.
    pub async fn extend_expiration(
        &self,
        workspace_id: WorkspaceId,
        secret: AgentSecret,
    ) -> WorkspaceLifecycleResult<ExpirationOutcome> {
        let expiration = self
            .extend_for_agent(workspace_id, secret, self.settings.agent_extension)
            .await?;
        Ok(ExpirationOutcome {
            workspace_id,
            expiration,
            user_message: EXPIRATION_MESSAGE.to_owned(),
        })
    }

    /// Adds up to the AFK ceiling to the expiration on behalf of the agent.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceLifecycleError::AfkOutOfRange`] when `minutes` is
    /// not positive or exceeds the ceiling, plus the errors of
    /// [`Self::extend_expiration`].
    pub async fn afk(
        &self,
        workspace_id: WorkspaceId,
        secret: AgentSecret,
        minutes: i64,
    ) -> WorkspaceLifecycleResult<ExpirationOutcome> {
        let max = self.settings.afk_ceiling.num_minutes();
        if !(1..=max).contains(&minutes) {
            return Err(WorkspaceLifecycleError::AfkOutOfRange {
                requested: minutes,
                max,
            });
        }
        let expiration = self
            .extend_for_agent(workspace_id, secret, Duration::minutes(minutes))
            .await?;
        Ok(ExpirationOutcome {
            workspace_id,
            expiration,
            user_message: AFK_MESSAGE.to_owned(),
        })
    }

    /// Records a provisioning step reported by a follower.
    ///
    /// Replaying the current step is a no-op. Completing the final step
    /// activates the workspace.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceLifecycleError::NotFound`] for unknown rows, or a
    /// domain error when the workspace no longer accepts agent updates or
    /// the step is out of order.
    pub async fn init_step_completed(
        &self,
        workspace_id: WorkspaceId,
        step: InitState,
    ) -> WorkspaceLifecycleResult<Workspace> {
        let mut workspace = self.load(workspace_id).await?;
        let expected = workspace.version();
        if !workspace.complete_init_step(step, &*self.clock)? {
            return Ok(workspace);
        }
        self.commit(&workspace, expected, None).await?;
        tracing::info!(%workspace_id, step = %step, state = %workspace.state(), "init step completed");
        Ok(workspace)
    }

    /// Marks provisioning as failed and asks the follower to tear the
    /// container down.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceLifecycleError::NotFound`] for unknown rows, or a
    /// domain error when the workspace can no longer fail.
    pub async fn init_failure(
        &self,
        workspace_id: WorkspaceId,
        step: InitState,
        failure: InitFailureRecord,
    ) -> WorkspaceLifecycleResult<Workspace> {
        let mut workspace = self.load(workspace_id).await?;
        if workspace.state() == WorkspaceState::Failed {
            return Ok(workspace);
        }
        let expected = workspace.version();
        workspace.fail_init(step, failure, &*self.clock)?;
        let intent = LifecycleIntent::Stop(StopWorkspaceMessage {
            id: workspace_id,
            owner_id: workspace.owner_id(),
            workspace_failed: true,
        });
        self.commit(&workspace, expected, Some(&intent)).await?;
        tracing::warn!(%workspace_id, step = %step, "workspace initialisation failed");
        Ok(workspace)
    }

    /// Applies a state or port update reported by a follower.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceLifecycleError::NotFound`] for unknown rows, or a
    /// domain error for illegal transitions.
    pub async fn report_follower_state(
        &self,
        workspace_id: WorkspaceId,
        state: WorkspaceState,
        ports: Option<Vec<PortDescriptor>>,
    ) -> WorkspaceLifecycleResult<Workspace> {
        let mut workspace = self.load(workspace_id).await?;
        let unchanged_ports = ports
            .as_deref()
            .is_none_or(|reported| reported == workspace.ports());
        if workspace.state() == state && unchanged_ports {
            return Ok(workspace);
        }
        let expected = workspace.version();
        workspace.apply_follower_report(state, ports, &*self.clock)?;
        self.commit(&workspace, expected, None).await?;
        tracing::info!(%workspace_id, state = %state, "follower state recorded");
        Ok(workspace)
    }

    /// Issues the per-workspace secret the in-container agent presents.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceLifecycleError::NotFound`] for unknown rows, or a
    /// domain error outside `starting` and `active`.
    pub async fn register_agent(
        &self,
        workspace_id: WorkspaceId,
    ) -> WorkspaceLifecycleResult<WorkspaceAgent> {
        let workspace = self.load(workspace_id).await?;
        workspace.ensure_accepts_agent()?;
        let agent = WorkspaceAgent {
            workspace_id,
            secret: AgentSecret::generate(),
            created_at: self.clock.utc(),
        };
        self.ports.workspaces.insert_agent(&agent).await?;
        tracing::debug!(%workspace_id, "workspace agent registered");
        Ok(agent)
    }

    /// Returns the status view of a workspace owned by the caller.
    ///
    /// The working directory is read from the current config at the
    /// workspace's commit.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceLifecycleError::NotFound`] when the caller owns no
    /// such workspace, or a config error when the config cannot be read.
    pub async fn get_status(
        &self,
        caller: &Caller,
        workspace_id: WorkspaceId,
    ) -> WorkspaceLifecycleResult<WorkspaceStatus> {
        let workspace = self.load_owned(caller, workspace_id).await?;
        let url = self.editor_url_for(&workspace).await?;
        let code_source = workspace.code_source();
        let link = self
            .ports
            .code_sources
            .find_link(code_source)
            .await?
            .ok_or_else(|| WorkspaceLifecycleError::CodeSourceNotFound(code_source))?;
        Ok(WorkspaceStatus {
            init_state: workspace.init_state().frontend_value(),
            editor_url: url,
            code_source: CodeSourceSummary {
                id: code_source.id,
                kind: code_source.kind,
                kind_label: code_source.kind.label().to_owned(),
                name: link.name,
            },
            workspace,
        })
    }

    /// Builds a new row and its create intent without persisting either.
    pub(crate) async fn prepare(
        &self,
        caller: &Caller,
        request: &CreateWorkspaceRequest,
        is_ephemeral: bool,
    ) -> WorkspaceLifecycleResult<PreparedWorkspace> {
        let link = self
            .ports
            .code_sources
            .find_link(request.code_source)
            .await?
            .filter(|found| found.owner_id == caller.id())
            .ok_or_else(|| WorkspaceLifecycleError::CodeSourceNotFound(request.code_source))?;

        let owner_defaults = if link.workspace_settings.is_some() {
            None
        } else {
            self.ports
                .users
                .find_user(caller.id())
                .await?
                .ok_or_else(|| WorkspaceLifecycleError::UserNotFound(caller.id()))?
                .workspace_settings
        };
        let workspace_settings = link
            .workspace_settings
            .or(owner_defaults)
            .ok_or(WorkspaceLifecycleError::SettingsMissing)?;

        let resolved = self
            .resolver
            .resolve(&ResolveRequest {
                code_source: request.code_source.kind,
                repo_id: request.repo_id,
                commit: request.commit.clone(),
                tier: caller.tier(),
                template: link.template,
            })
            .await?;
        if let Some(message) = resolved.message.as_deref() {
            tracing::info!(owner_id = %caller.id(), %message, "workspace resources clamped");
        }

        let resources = resolved.config.resources();
        let container = resolved.config.base_container().to_owned();
        let workspace = Workspace::new(
            NewWorkspaceData {
                id: WorkspaceId::new(self.ports.ids.next_id()),
                owner_id: caller.id(),
                repo_id: request.repo_id,
                commit: request.commit.clone(),
                code_source: request.code_source,
                workspace_settings,
                over_allocated: resolved.over_allocated,
                resources,
                container: container.clone(),
                is_ephemeral,
                expiration: self.clock.utc() + self.settings.create_expiration,
            },
            &*self.clock,
        );
        let intent = LifecycleIntent::Create(CreateWorkspaceMessage {
            workspace_id: workspace.id(),
            owner_id: caller.id(),
            owner_email: caller.email().to_owned(),
            owner_name: caller.user_name().to_owned(),
            cpu: resources.cpu,
            mem: resources.mem,
            disk: resources.disk,
            container,
            access_url: request.access_url.clone(),
        });
        let url = url_for(&workspace, resolved.config.working_directory());
        Ok(PreparedWorkspace {
            workspace,
            intent,
            editor_url: url,
            over_allocation: resolved.message,
        })
    }

    /// Relays the intents of a just-committed mutation and publishes status.
    pub(crate) async fn after_commit(&self, workspace: &Workspace, relay: bool) {
        if relay
            && let Err(err) = self.relay.dispatch_pending().await
        {
            tracing::warn!(
                workspace_id = %workspace.id(),
                error = %err,
                "lifecycle intent left in outbox for redelivery"
            );
        }
        self.ports.status.publish(workspace);
    }

    /// Bumps the code source's `updated_at`; failures are only logged.
    pub(crate) async fn touch(&self, code_source: CodeSourceRef) {
        if let Err(err) = self
            .ports
            .code_sources
            .touch(code_source, self.clock.utc())
            .await
        {
            tracing::warn!(
                code_source_id = %code_source.id,
                code_source = %code_source.kind,
                error = %err,
                "failed to bump code source updated_at"
            );
        }
    }

    async fn reuse(&self, existing: Workspace) -> WorkspaceLifecycleResult<WorkspaceHandle> {
        let url = self.editor_url_for(&existing).await?;
        let expected = existing.version();
        let mut workspace = existing;
        workspace.extend_expiration_to(self.clock.utc() + self.settings.reuse_expiration);

        let (outcome, intent) = if workspace.state() == WorkspaceState::Stopped {
            workspace.restart(&*self.clock)?;
            let start = LifecycleIntent::Start(StartWorkspaceMessage {
                id: workspace.id(),
            });
            (CreateOutcome::Restarted, Some(start))
        } else {
            (CreateOutcome::Reused, None)
        };
        self.commit(&workspace, expected, intent.as_ref()).await?;
        self.touch(workspace.code_source()).await;
        tracing::info!(
            workspace_id = %workspace.id(),
            owner_id = %workspace.owner_id(),
            outcome = ?outcome,
            "live workspace reused"
        );
        Ok(WorkspaceHandle {
            workspace,
            editor_url: url,
            outcome,
            over_allocation: None,
            user_message: WORKSPACE_CREATED_MESSAGE.to_owned(),
        })
    }

    async fn destroy_row(&self, mut workspace: Workspace) -> WorkspaceLifecycleResult<Workspace> {
        let expected = workspace.version();
        workspace.begin_destroy(&*self.clock)?;
        let intent = LifecycleIntent::Destroy(DestroyWorkspaceMessage {
            id: workspace.id(),
            owner_id: workspace.owner_id(),
        });
        self.commit(&workspace, expected, Some(&intent)).await?;
        tracing::info!(
            workspace_id = %workspace.id(),
            owner_id = %workspace.owner_id(),
            "workspace destroying"
        );
        Ok(workspace)
    }

    async fn extend_for_agent(
        &self,
        workspace_id: WorkspaceId,
        secret: AgentSecret,
        extension: Duration,
    ) -> WorkspaceLifecycleResult<DateTime<Utc>> {
        let mut workspace = self
            .ports
            .workspaces
            .find_by_agent(workspace_id, secret)
            .await?
            .ok_or(WorkspaceLifecycleError::AgentNotFound(workspace_id))?;
        workspace.ensure_accepts_agent()?;
        let expected = workspace.version();
        workspace.extend_expiration_to(self.clock.utc() + extension);
        self.commit(&workspace, expected, None).await?;
        tracing::debug!(
            %workspace_id,
            expiration = %workspace.expiration(),
            "workspace expiration extended"
        );
        Ok(workspace.expiration())
    }

    async fn commit(
        &self,
        workspace: &Workspace,
        expected_version: i64,
        intent: Option<&LifecycleIntent>,
    ) -> WorkspaceLifecycleResult<()> {
        self.ports
            .workspaces
            .update(workspace, expected_version, intent)
            .await?;
        self.after_commit(workspace, intent.is_some()).await;
        Ok(())
    }

    async fn load(&self, workspace_id: WorkspaceId) -> WorkspaceLifecycleResult<Workspace> {
        self.ports
            .workspaces
            .find_by_id(workspace_id)
            .await?
            .ok_or(WorkspaceLifecycleError::NotFound(workspace_id))
    }

    async fn load_owned(
        &self,
        caller: &Caller,
        workspace_id: WorkspaceId,
    ) -> WorkspaceLifecycleResult<Workspace> {
        self.ports
            .workspaces
            .find_by_id(workspace_id)
            .await?
            .filter(|workspace| workspace.owner_id() == caller.id())
            .ok_or(WorkspaceLifecycleError::NotFound(workspace_id))
    }

    async fn editor_url_for(&self, workspace: &Workspace) -> WorkspaceLifecycleResult<String> {
        let working_directory = self
            .resolver
            .working_directory(
                workspace.code_source().kind,
                workspace.repo_id(),
                workspace.commit(),
            )
            .await?;
        Ok(url_for(workspace, &working_directory))
    }
}

fn url_for(workspace: &Workspace, working_directory: &str) -> String {
    if workspace.code_source().kind == CodeSourceType::Byte {
        return byte_agent_url(workspace.owner_id(), workspace.id());
    }
    editor_url(
        workspace.owner_id(),
        workspace.id(),
        workspace.commit(),
        working_directory,
    )
}
