//! Caller-facing classification shared by every service error.

use std::fmt;

/// Coarse failure category surfaced to callers alongside the typed error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The workspace, post, attempt or config row is absent or not owned by
    /// the caller.
    NotFound,
    /// The repository carries no workspace config at the pinned commit.
    ConfigNotFound,
    /// The workspace config is not valid YAML.
    ConfigMalformed,
    /// The workspace config parsed but failed validation.
    ConfigInvalid,
    /// A uniqueness or optimistic-concurrency check failed.
    Conflict,
    /// Visibility or tier gating refused the operation.
    Forbidden,
    /// A VCS, bus, object store or registry call failed; retrying may help.
    ExternalUnavailable,
    /// The request itself is malformed.
    InvalidRequest,
    /// Reserved; the resource policy clamps instead of refusing.
    QuotaExceeded,
}

impl ErrorKind {
    /// Returns the canonical snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::ConfigNotFound => "config_not_found",
            Self::ConfigMalformed => "config_malformed",
            Self::ConfigInvalid => "config_invalid",
            Self::Conflict => "conflict",
            Self::Forbidden => "forbidden",
            Self::ExternalUnavailable => "external_unavailable",
            Self::InvalidRequest => "invalid_request",
            Self::QuotaExceeded => "quota_exceeded",
        }
    }

    /// Returns whether the caller may retry the same request.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::ExternalUnavailable | Self::Conflict)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
