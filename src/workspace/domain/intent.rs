//! Lifecycle intents published to the follower pool.
//!
//! Each intent travels on a fixed bus subject with a fixed field set. Intents
//! are written to the outbox inside the transaction that performs the row
//! mutation and are only published after that transaction commits.

use super::{UserId, WorkspaceId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Subject for [`CreateWorkspaceMessage`].
pub const SUBJECT_CREATE: &str = "workspace.create";
/// Subject for [`StartWorkspaceMessage`].
pub const SUBJECT_START: &str = "workspace.start";
/// Subject for [`StopWorkspaceMessage`].
pub const SUBJECT_STOP: &str = "workspace.stop";
/// Subject for [`DestroyWorkspaceMessage`].
pub const SUBJECT_DESTROY: &str = "workspace.destroy";

/// Asks a follower to provision a new workspace container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWorkspaceMessage {
    /// Workspace to provision.
    pub workspace_id: WorkspaceId,
    /// Owner of the workspace.
    pub owner_id: UserId,
    /// Owner email, used for git identity.
    pub owner_email: String,
    /// Owner user name, used for git identity.
    pub owner_name: String,
    /// Granted CPU cores.
    pub cpu: u32,
    /// Granted memory in GiB.
    pub mem: u32,
    /// Granted disk in GiB.
    pub disk: u32,
    /// Base container image.
    pub container: String,
    /// Short-lived VCS access token for cloning.
    pub access_url: String,
}

/// Asks a follower to start an existing workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartWorkspaceMessage {
    /// Workspace to start.
    pub id: WorkspaceId,
}

/// Asks a follower to stop a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopWorkspaceMessage {
    /// Workspace to stop.
    pub id: WorkspaceId,
    /// Owner of the workspace.
    pub owner_id: UserId,
    /// Set when the stop follows a provisioning failure.
    #[serde(default)]
    pub workspace_failed: bool,
}

/// Asks a follower to destroy a workspace and its volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyWorkspaceMessage {
    /// Workspace to destroy.
    pub id: WorkspaceId,
    /// Owner of the workspace.
    pub owner_id: UserId,
}

/// Any lifecycle message the core publishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleIntent {
    /// `workspace.create`
    Create(CreateWorkspaceMessage),
    /// `workspace.start`
    Start(StartWorkspaceMessage),
    /// `workspace.stop`
    Stop(StopWorkspaceMessage),
    /// `workspace.destroy`
    Destroy(DestroyWorkspaceMessage),
}

/// Error raised while encoding or decoding an intent payload.
#[derive(Debug, Error)]
pub enum IntentCodecError {
    /// The subject is not one of the lifecycle subjects.
    #[error("unknown lifecycle subject: {0}")]
    UnknownSubject(String),
    /// The payload does not match the subject's field set.
    #[error("invalid payload for {subject}: {source}")]
    InvalidPayload {
        /// Subject being decoded.
        subject: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

impl LifecycleIntent {
    /// Returns the bus subject.
    #[must_use]
    pub const fn subject(&self) -> &'static str {
        match self {
            Self::Create(_) => SUBJECT_CREATE,
            Self::Start(_) => SUBJECT_START,
            Self::Stop(_) => SUBJECT_STOP,
            Self::Destroy(_) => SUBJECT_DESTROY,
        }
    }

    /// Returns the workspace the intent targets.
    #[must_use]
    pub const fn workspace_id(&self) -> WorkspaceId {
        match self {
            Self::Create(message) => message.workspace_id,
            Self::Start(message) => message.id,
            Self::Stop(message) => message.id,
            Self::Destroy(message) => message.id,
        }
    }

    /// Encodes the message body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`IntentCodecError::InvalidPayload`] when serialisation fails.
    pub fn to_payload(&self) -> Result<serde_json::Value, IntentCodecError> {
        let encoded = match self {
            Self::Create(message) => serde_json::to_value(message),
            Self::Start(message) => serde_json::to_value(message),
            Self::Stop(message) => serde_json::to_value(message),
            Self::Destroy(message) => serde_json::to_value(message),
        };
        encoded.map_err(|source| IntentCodecError::InvalidPayload {
            subject: self.subject().to_owned(),
            source,
        })
    }

    /// Decodes an intent from its subject and JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`IntentCodecError`] when the subject is unknown or the body
    /// does not match it.
    pub fn from_payload(subject: &str, payload: serde_json::Value) -> Result<Self, IntentCodecError> {
        let invalid = |source| IntentCodecError::InvalidPayload {
            subject: subject.to_owned(),
            source,
        };
        match subject {
            SUBJECT_CREATE => serde_json::from_value(payload)
                .map(Self::Create)
                .map_err(invalid),
            SUBJECT_START => serde_json::from_value(payload)
                .map(Self::Start)
                .map_err(invalid),
            SUBJECT_STOP => serde_json::from_value(payload)
                .map(Self::Stop)
                .map_err(invalid),
            SUBJECT_DESTROY => serde_json::from_value(payload)
                .map(Self::Destroy)
                .map_err(invalid),
            other => Err(IntentCodecError::UnknownSubject(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stop_payload_carries_failure_flag() {
        let intent = LifecycleIntent::Stop(StopWorkspaceMessage {
            id: WorkspaceId::new(3),
            owner_id: UserId::new(100),
            workspace_failed: true,
        });

        assert_eq!(intent.subject(), "workspace.stop");
        assert_eq!(
            intent.to_payload().expect("payload should encode"),
            json!({"id": 3, "owner_id": 100, "workspace_failed": true})
        );
    }

    #[test]
    fn decoding_rejects_unknown_subjects() {
        let result = LifecycleIntent::from_payload("workspace.explode", json!({}));
        assert!(matches!(result, Err(IntentCodecError::UnknownSubject(_))));
    }

    #[test]
    fn decoding_restores_start_intent() {
        let decoded = LifecycleIntent::from_payload("workspace.start", json!({"id": 11}))
            .expect("start payload should decode");
        assert_eq!(
            decoded,
            LifecycleIntent::Start(StartWorkspaceMessage {
                id: WorkspaceId::new(11)
            })
        );
    }
}
