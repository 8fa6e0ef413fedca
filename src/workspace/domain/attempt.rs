//! Challenge posts and the attempts forked from them.

use super::{RepoId, UserId};
use crate::{resource_policy::UserTier, workspace_config::domain::TemplateRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a challenge post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(i64);

impl PostId {
    /// Wraps a raw post identifier.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn into_inner(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Identifier of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(i64);

impl AttemptId {
    /// Wraps a raw attempt identifier.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn into_inner(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Who may start attempts on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostVisibility {
    /// Anyone.
    Public,
    /// Only premium accounts.
    Premium,
    /// Only buyers; attempts cannot be started directly.
    Exclusive,
    /// Hidden from listings but otherwise public.
    Private,
}

impl PostVisibility {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Premium => "premium",
            Self::Exclusive => "exclusive",
            Self::Private => "private",
        }
    }

    /// Parses the storage representation, returning `None` for unknown
    /// values.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "public" => Some(Self::Public),
            "premium" => Some(Self::Premium),
            "exclusive" => Some(Self::Exclusive),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// Challenge post fields the core reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    /// Post identifier.
    pub id: PostId,
    /// Title, copied onto attempts.
    pub title: String,
    /// Description, copied onto attempts.
    pub description: String,
    /// Author; also the owner of the post repository.
    pub author_id: UserId,
    /// Access gate.
    pub visibility: PostVisibility,
    /// Workspace config template the post was published with.
    pub template: Option<TemplateRef>,
}

/// Attempt fields the core reads when forking from a parent attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Attempt identifier.
    pub id: AttemptId,
    /// Post the attempt belongs to.
    pub post_id: PostId,
    /// Attempt author and repository owner.
    pub author_id: UserId,
    /// Whether the attempt has been published.
    pub closed: bool,
}

/// Newly started attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    /// Attempt identifier; also the fork repository name.
    pub id: AttemptId,
    /// Post being attempted.
    pub post_id: PostId,
    /// Learner who started the attempt.
    pub author_id: UserId,
    /// Learner user name.
    pub author_name: String,
    /// Learner tier at the time of the attempt.
    pub author_tier: UserTier,
    /// Title copied from the post.
    pub title: String,
    /// Description copied from the post.
    pub description: String,
    /// Forked repository.
    pub repo_id: RepoId,
    /// Published attempt this one was forked from, if any.
    pub parent_attempt: Option<AttemptId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
