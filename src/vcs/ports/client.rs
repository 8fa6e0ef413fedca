//! VCS client port.

use crate::workspace::domain::{RepoId, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for VCS operations.
pub type VcsResult<T> = Result<T, VcsError>;

/// `owner/name` path of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoPath {
    /// Owning account, the decimal user id.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoPath {
    /// Creates a repository path.
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Path of a repository owned by `owner` and named after `name`.
    #[must_use]
    pub fn owned_by(owner: UserId, name: impl fmt::Display) -> Self {
        Self::new(owner.to_string(), name.to_string())
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.owner, self.name)
    }
}

/// Repository metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    /// Server-assigned identifier.
    pub id: RepoId,
    /// Repository path.
    pub path: RepoPath,
}

/// Collaborator permission level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Clone and fork.
    Read,
    /// Push.
    Write,
    /// Manage the repository.
    Admin,
}

/// Credentials used to act as a specific user.
#[derive(Clone, PartialEq, Eq)]
pub struct VcsCredentials {
    /// Login, the decimal user id.
    pub login: String,
    /// Service password issued with the user's session.
    pub password: String,
}

impl fmt::Debug for VcsCredentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("VcsCredentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Operations the orchestrator performs against the VCS server.
#[async_trait]
pub trait VcsClient: Send + Sync {
    /// Looks up a repository by identifier.
    async fn find_repo(&self, repo_id: RepoId) -> VcsResult<Option<RepoInfo>>;

    /// Reads a file at `reference`, returning `None` when it does not exist.
    async fn read_file(
        &self,
        repo: &RepoPath,
        reference: &str,
        file_path: &str,
    ) -> VcsResult<Option<Vec<u8>>>;

    /// Grants `user` the given access to a repository.
    async fn add_collaborator(
        &self,
        repo: &RepoPath,
        user: &str,
        access: AccessLevel,
    ) -> VcsResult<()>;

    /// Revokes any access `user` holds on a repository.
    async fn remove_collaborator(&self, repo: &RepoPath, user: &str) -> VcsResult<()>;

    /// Forks `source` into the authenticated user's namespace as `new_name`.
    async fn fork_as(
        &self,
        credentials: &VcsCredentials,
        source: &RepoPath,
        new_name: &str,
    ) -> VcsResult<RepoInfo>;

    /// Deletes a repository.
    async fn delete_repo(&self, repo: &RepoPath) -> VcsResult<()>;
}

/// Errors returned by VCS adapters.
#[derive(Debug, Clone, Error)]
pub enum VcsError {
    /// The repository does not exist.
    #[error("repository not found: {0}")]
    RepoNotFound(RepoPath),

    /// The server refused the operation.
    #[error("VCS server rejected {operation} on {repo}: {reason}")]
    Rejected {
        /// Operation that was attempted.
        operation: &'static str,
        /// Target repository.
        repo: RepoPath,
        /// Server-provided reason.
        reason: String,
    },

    /// The server could not be reached or failed.
    #[error("VCS server unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl VcsError {
    /// Wraps a transport or server failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
