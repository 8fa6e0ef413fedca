//! Repository port for workspace config template revisions.

use crate::workspace::domain::UserId;
use crate::workspace_config::domain::{TemplateId, TemplateRef, WorkspaceTemplate};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for template repository operations.
pub type WorkspaceConfigRepositoryResult<T> = Result<T, WorkspaceConfigRepositoryError>;

/// Template revision persistence contract.
#[async_trait]
pub trait WorkspaceConfigRepository: Send + Sync {
    /// Stores a new revision.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceConfigRepositoryError::DuplicateRevision`] when the
    /// `(id, revision)` pair already exists.
    async fn insert(&self, template: &WorkspaceTemplate) -> WorkspaceConfigRepositoryResult<()>;

    /// Finds one revision.
    async fn find_revision(
        &self,
        template_ref: TemplateRef,
    ) -> WorkspaceConfigRepositoryResult<Option<WorkspaceTemplate>>;

    /// Finds the highest revision of `id` written by `author_id`.
    async fn find_latest_by_author(
        &self,
        id: TemplateId,
        author_id: UserId,
    ) -> WorkspaceConfigRepositoryResult<Option<WorkspaceTemplate>>;

    /// Returns every revision of `id` in ascending revision order.
    async fn list_revisions(
        &self,
        id: TemplateId,
    ) -> WorkspaceConfigRepositoryResult<Vec<WorkspaceTemplate>>;

    /// Adds one to the `uses` counter of a revision.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceConfigRepositoryError::NotFound`] when the revision
    /// does not exist.
    async fn increment_uses(&self, template_ref: TemplateRef)
    -> WorkspaceConfigRepositoryResult<()>;

    /// Adds one to the `completions` counter of a revision.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceConfigRepositoryError::NotFound`] when the revision
    /// does not exist.
    async fn increment_completions(
        &self,
        template_ref: TemplateRef,
    ) -> WorkspaceConfigRepositoryResult<()>;
}

/// Errors returned by template repository implementations.
#[derive(Debug, Clone, Error)]
pub enum WorkspaceConfigRepositoryError {
    /// The revision already exists.
    #[error("duplicate template revision: {0}")]
    DuplicateRevision(TemplateRef),

    /// The revision does not exist.
    #[error("template revision not found: {0}")]
    NotFound(TemplateRef),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl WorkspaceConfigRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
