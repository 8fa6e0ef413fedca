//! The artefact a workspace edits.

use super::{CodeSourceId, ParseCodeSourceTypeError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of code source backing a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeSourceType {
    /// A published challenge post.
    Post,
    /// A learner's attempt forked from a post.
    Attempt,
    /// A transient byte scratch without a repository.
    Byte,
}

impl CodeSourceType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Attempt => "attempt",
            Self::Byte => "byte",
        }
    }

    /// Returns the display label used by the UI.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Post => "Project",
            Self::Attempt => "Attempt",
            Self::Byte => "Byte",
        }
    }
}

impl fmt::Display for CodeSourceType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for CodeSourceType {
    type Error = ParseCodeSourceTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "post" => Ok(Self::Post),
            "attempt" => Ok(Self::Attempt),
            "byte" => Ok(Self::Byte),
            _ => Err(ParseCodeSourceTypeError(value.to_owned())),
        }
    }
}

/// Typed reference to a code source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeSourceRef {
    /// Row identifier.
    pub id: CodeSourceId,
    /// Kind of row.
    pub kind: CodeSourceType,
}

impl CodeSourceRef {
    /// Creates a code source reference.
    #[must_use]
    pub const fn new(id: CodeSourceId, kind: CodeSourceType) -> Self {
        Self { id, kind }
    }
}

/// Summary of a code source returned alongside workspace status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSourceSummary {
    /// Row identifier.
    pub id: CodeSourceId,
    /// Kind of row.
    pub kind: CodeSourceType,
    /// UI label for the kind.
    pub kind_label: String,
    /// Display name (the post title).
    pub name: String,
}
