//! Read-through port for the rows a workspace edits.

use crate::workspace::domain::{
    Attempt, AttemptId, AttemptRecord, CodeSourceRef, PostId, PostRecord, RepoId, UserId,
};
use crate::workspace_config::domain::TemplateRef;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for code source operations.
pub type CodeSourceRepositoryResult<T> = Result<T, CodeSourceRepositoryError>;

/// Fields of a post, attempt or byte row needed to open a workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeSourceLink {
    /// The row.
    pub code_source: CodeSourceRef,
    /// Row owner.
    pub owner_id: UserId,
    /// Backing repository; `-1` for bytes.
    pub repo_id: RepoId,
    /// Display name.
    pub name: String,
    /// Editor settings stored on the row, if any.
    pub workspace_settings: Option<serde_json::Value>,
    /// Template the row (or its post) was created from.
    pub template: Option<TemplateRef>,
}

/// Posts, attempts and bytes.
///
/// The core only reads these rows, except for bumping `updated_at` and
/// recording new attempts.
#[async_trait]
pub trait CodeSourceRepository: Send + Sync {
    /// Loads the link for a code source.
    async fn find_link(
        &self,
        code_source: CodeSourceRef,
    ) -> CodeSourceRepositoryResult<Option<CodeSourceLink>>;

    /// Sets the row's `updated_at` to `at`.
    async fn touch(
        &self,
        code_source: CodeSourceRef,
        at: DateTime<Utc>,
    ) -> CodeSourceRepositoryResult<()>;

    /// Finds a challenge post.
    async fn find_post(&self, id: PostId) -> CodeSourceRepositoryResult<Option<PostRecord>>;

    /// Finds an attempt.
    async fn find_attempt(&self, id: AttemptId)
    -> CodeSourceRepositoryResult<Option<AttemptRecord>>;

    /// Finds any attempt, published or not, `author_id` made on `post_id`.
    async fn find_existing_attempt(
        &self,
        author_id: UserId,
        post_id: PostId,
    ) -> CodeSourceRepositoryResult<Option<AttemptRecord>>;

    /// Records a new attempt in one transaction: inserts the row, increments
    /// the post's attempt counter, accepts matching recommendations and
    /// touches the post.
    async fn record_attempt(&self, attempt: &Attempt) -> CodeSourceRepositoryResult<()>;

    /// Reverses [`CodeSourceRepository::record_attempt`] in one transaction:
    /// deletes the row, decrements the post's attempt counter and withdraws
    /// the author's recommendation acceptance. The post's `updated_at` is
    /// left as is. Unknown attempts are a no-op.
    async fn discard_attempt(&self, attempt: &Attempt) -> CodeSourceRepositoryResult<()>;

    /// Deletes an attempt row.
    async fn delete_attempt(&self, id: AttemptId) -> CodeSourceRepositoryResult<()>;
}

/// Errors returned by code source adapters.
#[derive(Debug, Clone, Error)]
pub enum CodeSourceRepositoryError {
    /// Persistence layer failure.
    #[error("code source persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl CodeSourceRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
