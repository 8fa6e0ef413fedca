//! External user directory port.

use crate::resource_policy::UserTier;
use crate::workspace::domain::{Caller, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for user directory operations.
pub type UserDirectoryResult<T> = Result<T, UserDirectoryError>;

/// User fields the core reads.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    /// User identifier.
    pub id: UserId,
    /// User name.
    pub user_name: String,
    /// Email address.
    pub email: String,
    /// Subscription tier.
    pub tier: UserTier,
    /// Default editor settings for new workspaces.
    pub workspace_settings: Option<serde_json::Value>,
    /// Whether the account was minted for an ephemeral session.
    pub is_ephemeral: bool,
}

/// User accounts, including their VCS identities.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds a user.
    async fn find_user(&self, id: UserId) -> UserDirectoryResult<Option<UserRecord>>;

    /// Creates an ephemeral account and its VCS identity.
    ///
    /// The returned caller carries the VCS service password.
    async fn create_ephemeral_user(&self, id: UserId) -> UserDirectoryResult<Caller>;

    /// Deletes accounts and their VCS identities. Missing ids are ignored.
    async fn delete_users(&self, ids: &[UserId]) -> UserDirectoryResult<()>;
}

/// Errors returned by user directory adapters.
#[derive(Debug, Clone, Error)]
pub enum UserDirectoryError {
    /// The directory failed.
    #[error("user directory unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl UserDirectoryError {
    /// Wraps a directory failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
