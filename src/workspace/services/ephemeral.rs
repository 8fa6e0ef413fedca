//! Single-shot trial workspaces bound to a network identity.

use super::{
    AttemptForkError, AttemptForkService, CreateOutcome, CreateWorkspaceRequest,
    StartAttemptOutcome, StartAttemptRequest, WorkspaceHandle, WorkspaceLifecycleError,
    WorkspaceLifecycleService,
};
use crate::error::ErrorKind;
use crate::vcs::ports::{RepoPath, VcsError};
use crate::workspace::{
    domain::{
        Attempt, AttemptId, Caller, CodeSourceId, CodeSourceRef, CodeSourceType,
        EphemeralBinding, NetworkId, PostId, UserId, WorkspaceId,
    },
    ports::{CodeSourceRepositoryError, UserDirectoryError, WorkspaceRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Message returned when a network identity already claimed the challenge.
pub const ALREADY_USED_MESSAGE: &str = "ephemeral system has been used on this network before";
const CREATED_MESSAGE: &str = "Successfully created ephemeral";

/// Request to claim a trial workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemeralRequest {
    /// Network identity of the caller.
    pub network_id: NetworkId,
    /// Challenge being tried.
    pub challenge_id: PostId,
    /// Commit or branch to open in the forked attempt.
    pub commit: String,
    /// URL the follower should expose the workspace on.
    pub access_url: String,
}

impl EphemeralRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(
        network_id: NetworkId,
        challenge_id: PostId,
        commit: impl Into<String>,
        access_url: impl Into<String>,
    ) -> Self {
        Self {
            network_id,
            challenge_id,
            commit: commit.into(),
            access_url: access_url.into(),
        }
    }
}

/// How an ephemeral claim ended.
#[derive(Debug, Clone, PartialEq)]
pub enum EphemeralOutcome {
    /// A user, attempt, workspace and binding were created.
    Created {
        /// The minted ephemeral user.
        user: Caller,
        /// The forked attempt.
        attempt: Attempt,
        /// The new workspace.
        workspace: Box<WorkspaceHandle>,
    },
    /// The network identity already claimed the challenge; nothing was
    /// created.
    AlreadyUsed,
}

/// Result of an ephemeral claim.
#[derive(Debug, Clone, PartialEq)]
pub struct EphemeralClaim {
    /// What happened.
    pub outcome: EphemeralOutcome,
    /// Short message for the UI.
    pub user_message: String,
}

impl EphemeralClaim {
    fn already_used() -> Self {
        Self {
            outcome: EphemeralOutcome::AlreadyUsed,
            user_message: ALREADY_USED_MESSAGE.to_owned(),
        }
    }
}

/// Rows removed by [`EphemeralService::purge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Hard-deleted workspaces.
    pub workspaces: Vec<WorkspaceId>,
    /// Deleted ephemeral users.
    pub users: Vec<UserId>,
}

/// Errors raised by the ephemeral flow.
#[derive(Debug, Error)]
pub enum EphemeralError {
    /// The fresh user unexpectedly already had an attempt on the challenge.
    #[error("ephemeral user already has attempt {0}")]
    ExistingAttempt(AttemptId),

    /// Forking the challenge failed.
    #[error(transparent)]
    Attempt(#[from] AttemptForkError),

    /// Building the workspace failed.
    #[error(transparent)]
    Lifecycle(#[from] WorkspaceLifecycleError),

    /// Workspace persistence failed.
    #[error(transparent)]
    Repository(#[from] WorkspaceRepositoryError),

    /// Code source persistence failed.
    #[error(transparent)]
    CodeSources(#[from] CodeSourceRepositoryError),

    /// The user directory failed.
    #[error(transparent)]
    Users(#[from] UserDirectoryError),

    /// The VCS server failed.
    #[error(transparent)]
    Vcs(#[from] VcsError),
}

/// Result type for the ephemeral flow.
pub type EphemeralResult<T> = Result<T, EphemeralError>;

impl EphemeralError {
    /// Classifies the failure for callers.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ExistingAttempt(_) => ErrorKind::Conflict,
            Self::Attempt(err) => err.kind(),
            Self::Lifecycle(err) => err.kind(),
            Self::Repository(_) | Self::CodeSources(_) | Self::Users(_) | Self::Vcs(_) => {
                ErrorKind::ExternalUnavailable
            }
        }
    }
}

/// Artefacts created so far by a claim, removed again if it fails.
#[derive(Debug, Default)]
struct Compensation {
    user_id: Option<UserId>,
    attempt: Option<(Attempt, RepoPath)>,
}

/// Creates and purges ephemeral workspaces.
pub struct EphemeralService<C>
where
    C: Clock + Send + Sync,
{
    lifecycle: WorkspaceLifecycleService<C>,
    attempts: AttemptForkService<C>,
    clock: Arc<C>,
}

impl<C> EphemeralService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an ephemeral service.
    #[must_use]
    pub const fn new(
        lifecycle: WorkspaceLifecycleService<C>,
        attempts: AttemptForkService<C>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            lifecycle,
            attempts,
            clock,
        }
    }

    /// Claims a trial workspace for `request.network_id` on a challenge.
    ///
    /// A network identity may claim each challenge once, ever. Repeated
    /// claims return [`EphemeralOutcome::AlreadyUsed`] without creating
    /// anything. The workspace row and its binding commit together; if any
    /// step fails, the ephemeral user, attempt and fork are removed again and
    /// the post's attempt counter is restored. The template use is counted
    /// only after the binding commits.
    ///
    /// # Errors
    ///
    /// Returns [`EphemeralError`] when a collaborator fails.
    pub async fn create_and_bind(&self, request: EphemeralRequest) -> EphemeralResult<EphemeralClaim> {
        let ports = self.lifecycle.ports();
        if ports
            .workspaces
            .find_ephemeral_binding(request.network_id, request.challenge_id)
            .await?
            .is_some()
        {
            tracing::info!(
                network_id = %request.network_id,
                challenge_id = %request.challenge_id,
                "ephemeral claim refused; network already used"
            );
            return Ok(EphemeralClaim::already_used());
        }

        let mut compensation = Compensation::default();
        match self.claim(&request, &mut compensation).await {
            Ok(claim) => Ok(claim),
            Err(err) => {
                tracing::warn!(
                    network_id = %request.network_id,
                    challenge_id = %request.challenge_id,
                    error = %err,
                    "ephemeral claim failed; removing partial artefacts"
                );
                self.compensate(compensation).await;
                Err(err)
            }
        }
    }

    /// Removes ephemeral workspaces together with their attempts, forks and
    /// users. Non-ephemeral and unknown ids are skipped. Bindings are kept.
    ///
    /// # Errors
    ///
    /// Returns [`EphemeralError`] when a collaborator fails.
    pub async fn purge(&self, workspace_ids: &[WorkspaceId]) -> EphemeralResult<PurgeReport> {
        let ports = self.lifecycle.ports();
        let mut report = PurgeReport::default();
        for workspace_id in workspace_ids {
            let Some(workspace) = ports
                .workspaces
                .find_by_id(*workspace_id)
                .await?
                .filter(|found| found.is_ephemeral())
            else {
                tracing::debug!(%workspace_id, "skipping non-ephemeral workspace in purge");
                continue;
            };

            let code_source = workspace.code_source();
            if code_source.kind == CodeSourceType::Attempt {
                let attempt_id = AttemptId::new(code_source.id.into_inner());
                let repo = RepoPath::owned_by(workspace.owner_id(), attempt_id);
                match ports.vcs.delete_repo(&repo).await {
                    Ok(()) | Err(VcsError::RepoNotFound(_)) => {}
                    Err(err) => return Err(err.into()),
                }
                ports.code_sources.delete_attempt(attempt_id).await?;
            }
            ports.workspaces.hard_delete(*workspace_id).await?;
            report.workspaces.push(*workspace_id);
            if !report.users.contains(&workspace.owner_id()) {
                report.users.push(workspace.owner_id());
            }
        }

        if !report.users.is_empty() {
            ports.users.delete_users(&report.users).await?;
        }
        tracing::info!(
            workspaces = report.workspaces.len(),
            users = report.users.len(),
            "ephemeral workspaces purged"
        );
        Ok(report)
    }

    async fn claim(
        &self,
        request: &EphemeralRequest,
        compensation: &mut Compensation,
    ) -> EphemeralResult<EphemeralClaim> {
        let ports = self.lifecycle.ports();
        let user_id = UserId::new(ports.ids.next_id());
        let user = ports.users.create_ephemeral_user(user_id).await?;
        compensation.user_id = Some(user_id);

        let (started, template) = self
            .attempts
            .fork_attempt(&user, StartAttemptRequest::new(request.challenge_id))
            .await?;
        let (attempt, repo) = match started.outcome {
            StartAttemptOutcome::Started { attempt, repo } => (attempt, repo),
            StartAttemptOutcome::AlreadyStarted(existing)
            | StartAttemptOutcome::ParentNotPublished(existing) => {
                return Err(EphemeralError::ExistingAttempt(existing));
            }
        };
        compensation.attempt = Some((attempt.clone(), repo.path.clone()));

        let code_source = CodeSourceRef::new(
            CodeSourceId::new(attempt.id.into_inner()),
            CodeSourceType::Attempt,
        );
        let workspace_request = CreateWorkspaceRequest::new(
            code_source,
            repo.id,
            request.commit.clone(),
            request.access_url.clone(),
        );
        let prepared = self
            .lifecycle
            .prepare(&user, &workspace_request, true)
            .await?;
        let binding = EphemeralBinding {
            ip: request.network_id,
            challenge_id: request.challenge_id,
            workspace_id: prepared.workspace.id(),
            user_id,
            date: self.clock.utc(),
        };

        match ports
            .workspaces
            .insert_ephemeral(&prepared.workspace, &binding, &prepared.intent)
            .await
        {
            Ok(()) => {}
            Err(WorkspaceRepositoryError::DuplicateBinding { .. }) => {
                tracing::info!(
                    network_id = %request.network_id,
                    challenge_id = %request.challenge_id,
                    "concurrent ephemeral claim won the binding"
                );
                self.compensate(std::mem::take(compensation)).await;
                return Ok(EphemeralClaim::already_used());
            }
            Err(err) => return Err(err.into()),
        }

        self.lifecycle.after_commit(&prepared.workspace, true).await;
        self.lifecycle.touch(code_source).await;
        if let Some(template_ref) = template {
            self.attempts.count_template_use(template_ref).await;
        }
        tracing::info!(
            workspace_id = %prepared.workspace.id(),
            user_id = %user_id,
            attempt_id = %attempt.id,
            network_id = %request.network_id,
            "ephemeral workspace created"
        );
        Ok(EphemeralClaim {
            outcome: EphemeralOutcome::Created {
                user,
                attempt,
                workspace: Box::new(WorkspaceHandle {
                    workspace: prepared.workspace,
                    editor_url: prepared.editor_url,
                    outcome: CreateOutcome::Created,
                    over_allocation: prepared.over_allocation,
                    user_message: CREATED_MESSAGE.to_owned(),
                }),
            },
            user_message: CREATED_MESSAGE.to_owned(),
        })
    }

    async fn compensate(&self, compensation: Compensation) {
        let ports = self.lifecycle.ports();
        if let Some((attempt, repo)) = compensation.attempt {
            let attempt_id = attempt.id;
            if let Err(err) = ports.vcs.delete_repo(&repo).await {
                tracing::warn!(%attempt_id, %repo, error = %err, "failed to delete ephemeral fork");
            }
            if let Err(err) = ports.code_sources.discard_attempt(&attempt).await {
                tracing::warn!(%attempt_id, error = %err, "failed to discard ephemeral attempt");
            }
        }
        if let Some(user_id) = compensation.user_id
            && let Err(err) = ports.users.delete_users(&[user_id]).await
        {
            tracing::warn!(%user_id, error = %err, "failed to delete ephemeral user");
        }
    }
}
