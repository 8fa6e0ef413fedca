//! Workspace persistence port.

use crate::workspace::domain::{
    AgentSecret, EphemeralBinding, LifecycleIntent, NetworkId, PostId, Workspace, WorkspaceAgent,
    WorkspaceId, WorkspaceSourceKey,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for workspace repository operations.
pub type WorkspaceRepositoryResult<T> = Result<T, WorkspaceRepositoryError>;

/// Workspace row persistence.
///
/// Every mutating call commits the row change and the optional lifecycle
/// intent in one transaction: either both become visible or neither does.
#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    /// Inserts a new workspace row.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceRepositoryError::DuplicateActiveWorkspace`] when a
    /// live row already holds the same source key.
    async fn insert(
        &self,
        workspace: &Workspace,
        intent: Option<&LifecycleIntent>,
    ) -> WorkspaceRepositoryResult<()>;

    /// Persists `workspace` if the stored version still equals
    /// `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceRepositoryError::NotFound`] when the row is gone and
    /// [`WorkspaceRepositoryError::VersionConflict`] on a stale write.
    async fn update(
        &self,
        workspace: &Workspace,
        expected_version: i64,
        intent: Option<&LifecycleIntent>,
    ) -> WorkspaceRepositoryResult<()>;

    /// Finds a workspace by id.
    async fn find_by_id(&self, id: WorkspaceId) -> WorkspaceRepositoryResult<Option<Workspace>>;

    /// Finds the live row for a source key.
    async fn find_live_by_source_key(
        &self,
        key: &WorkspaceSourceKey,
    ) -> WorkspaceRepositoryResult<Option<Workspace>>;

    /// Lists rows in a reapable state whose expiration is before `now`.
    async fn list_expired(&self, now: DateTime<Utc>) -> WorkspaceRepositoryResult<Vec<Workspace>>;

    /// Removes a row permanently. Only the ephemeral purge uses this.
    async fn hard_delete(&self, id: WorkspaceId) -> WorkspaceRepositoryResult<()>;

    /// Stores an agent credential.
    async fn insert_agent(&self, agent: &WorkspaceAgent) -> WorkspaceRepositoryResult<()>;

    /// Finds the workspace whose agent holds `secret`.
    async fn find_by_agent(
        &self,
        workspace_id: WorkspaceId,
        secret: AgentSecret,
    ) -> WorkspaceRepositoryResult<Option<Workspace>>;

    /// Finds the binding for a network identity and challenge.
    async fn find_ephemeral_binding(
        &self,
        ip: NetworkId,
        challenge_id: PostId,
    ) -> WorkspaceRepositoryResult<Option<EphemeralBinding>>;

    /// Inserts an ephemeral workspace together with its binding.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceRepositoryError::DuplicateBinding`] when the
    /// `(ip, challenge_id)` pair is already bound; nothing is written.
    async fn insert_ephemeral(
        &self,
        workspace: &Workspace,
        binding: &EphemeralBinding,
        intent: &LifecycleIntent,
    ) -> WorkspaceRepositoryResult<()>;
}

/// Errors returned by workspace repository adapters.
#[derive(Debug, Clone, Error)]
pub enum WorkspaceRepositoryError {
    /// A live row already holds the source key.
    #[error("a live workspace already exists for owner {} at {}", .0.owner_id, .0.commit)]
    DuplicateActiveWorkspace(WorkspaceSourceKey),

    /// The row changed since it was loaded.
    #[error("workspace {workspace_id} was modified concurrently (expected version {expected})")]
    VersionConflict {
        /// Workspace being written.
        workspace_id: WorkspaceId,
        /// Version the caller loaded.
        expected: i64,
    },

    /// The row does not exist.
    #[error("workspace {0} not found")]
    NotFound(WorkspaceId),

    /// The network identity already claimed the challenge.
    #[error("network {ip} already claimed challenge {challenge_id}")]
    DuplicateBinding {
        /// Network identity.
        ip: NetworkId,
        /// Challenge post.
        challenge_id: PostId,
    },

    /// Persistence layer failure.
    #[error("workspace persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl WorkspaceRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
