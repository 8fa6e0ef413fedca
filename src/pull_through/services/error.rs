//! Errors raised by the pull-through services.

use crate::error::ErrorKind;
use crate::pull_through::{domain::PullThroughDomainError, ports::UpstreamError};
use thiserror::Error;

/// Errors returned by the editor binary and extension caches.
#[derive(Debug, Clone, Error)]
pub enum PullThroughError {
    /// The request coordinates were invalid.
    #[error(transparent)]
    Domain(#[from] PullThroughDomainError),

    /// The upstream omitted `Content-Length` or sent an unparsable one.
    #[error("upstream {url} did not report a content length")]
    MissingContentLength {
        /// Requested URL.
        url: String,
    },

    /// No candidate version declares compatibility with the host editor.
    #[error("no version of {extension} is compatible with editor {host_version}")]
    NoCompatibleExtension {
        /// Extension identifier, `publisher.name`.
        extension: String,
        /// Host editor version negotiated against.
        host_version: String,
    },

    /// The upstream request failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl PullThroughError {
    /// Classifies the failure for callers.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(_) => ErrorKind::InvalidRequest,
            Self::NoCompatibleExtension { .. } => ErrorKind::NotFound,
            Self::MissingContentLength { .. } | Self::Upstream(_) => ErrorKind::ExternalUnavailable,
        }
    }
}

/// Result type for pull-through operations.
pub type PullThroughResult<T> = Result<T, PullThroughError>;
