//! Network-identity claims for single-shot challenge sessions.

use super::{PostId, UserId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque integer form of a caller's network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(i64);

impl NetworkId {
    /// Wraps a raw network identity.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn into_inner(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Permanent record that a network identity used a challenge.
///
/// At most one binding exists per `(ip, challenge_id)`, forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EphemeralBinding {
    /// Network identity that claimed the challenge.
    pub ip: NetworkId,
    /// Challenge post.
    pub challenge_id: PostId,
    /// Workspace created for the claim.
    pub workspace_id: WorkspaceId,
    /// Ephemeral user minted for the claim.
    pub user_id: UserId,
    /// Claim timestamp.
    pub date: DateTime<Utc>,
}
