//! Errors raised by the workspace lifecycle service.

use crate::error::ErrorKind;
use crate::workspace::{
    domain::{CodeSourceRef, UserId, WorkspaceDomainError, WorkspaceId},
    ports::{CodeSourceRepositoryError, UserDirectoryError, WorkspaceRepositoryError},
};
use crate::workspace_config::services::ConfigResolutionError;
use thiserror::Error;

/// Service-level errors for workspace lifecycle operations.
#[derive(Debug, Error)]
pub enum WorkspaceLifecycleError {
    /// The workspace is absent or not owned by the caller.
    #[error("workspace {0} not found")]
    NotFound(WorkspaceId),

    /// The agent secret does not belong to the workspace.
    #[error("no agent registered for workspace {0} with the presented secret")]
    AgentNotFound(WorkspaceId),

    /// The code source row is absent or not owned by the caller.
    #[error("code source {} ({}) not found", .0.id, .0.kind)]
    CodeSourceNotFound(CodeSourceRef),

    /// The caller's account is unknown.
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// Neither the code source nor the owner carries editor settings.
    #[error("user workspace settings are not set")]
    SettingsMissing,

    /// The AFK extension is not positive or exceeds the ceiling.
    #[error("afk extension of {requested} minutes is outside 1..={max}")]
    AfkOutOfRange {
        /// Requested minutes.
        requested: i64,
        /// Ceiling in minutes.
        max: i64,
    },

    /// The state machine refused the operation.
    #[error(transparent)]
    Domain(#[from] WorkspaceDomainError),

    /// The workspace config could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigResolutionError),

    /// Workspace persistence failed.
    #[error(transparent)]
    Repository(#[from] WorkspaceRepositoryError),

    /// Code source persistence failed.
    #[error(transparent)]
    CodeSources(#[from] CodeSourceRepositoryError),

    /// The user directory failed.
    #[error(transparent)]
    Users(#[from] UserDirectoryError),
}

/// Result type for workspace lifecycle operations.
pub type WorkspaceLifecycleResult<T> = Result<T, WorkspaceLifecycleError>;

impl WorkspaceLifecycleError {
    /// Classifies the failure for callers.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_)
            | Self::AgentNotFound(_)
            | Self::CodeSourceNotFound(_)
            | Self::UserNotFound(_)
            | Self::Repository(WorkspaceRepositoryError::NotFound(_)) => ErrorKind::NotFound,
            Self::SettingsMissing | Self::AfkOutOfRange { .. } => ErrorKind::InvalidRequest,
            Self::Domain(WorkspaceDomainError::AgentNotPermitted { .. }) => ErrorKind::Forbidden,
            Self::Domain(_) => ErrorKind::InvalidRequest,
            Self::Config(err) => err.kind(),
            Self::Repository(
                WorkspaceRepositoryError::DuplicateActiveWorkspace(_)
                | WorkspaceRepositoryError::VersionConflict { .. }
                | WorkspaceRepositoryError::DuplicateBinding { .. },
            ) => ErrorKind::Conflict,
            Self::Repository(WorkspaceRepositoryError::Persistence(_))
            | Self::CodeSources(_)
            | Self::Users(_) => ErrorKind::ExternalUnavailable,
        }
    }

    /// Returns the short message shown to the UI.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::CodeSourceNotFound(_) => "Unable to locate code source.".to_owned(),
            Self::SettingsMissing => "user workspace settings are not set".to_owned(),
            Self::AfkOutOfRange { requested, max } if requested > max => {
                format!("cannot add more than {max} minutes to afk timer")
            }
            Self::AfkOutOfRange { .. } => "afk extension must be at least one minute".to_owned(),
            other => match other.kind() {
                ErrorKind::NotFound => "workspace not found".to_owned(),
                ErrorKind::ConfigNotFound => "workspace config not found".to_owned(),
                ErrorKind::ConfigMalformed | ErrorKind::ConfigInvalid => {
                    "workspace config is invalid".to_owned()
                }
                ErrorKind::Conflict => {
                    "workspace was modified concurrently; please retry".to_owned()
                }
                ErrorKind::Forbidden => "workspace is not accepting agent updates".to_owned(),
                ErrorKind::ExternalUnavailable => {
                    "a backing service is unavailable; please retry".to_owned()
                }
                ErrorKind::InvalidRequest | ErrorKind::QuotaExceeded => {
                    "invalid workspace request".to_owned()
                }
            },
        }
    }
}
