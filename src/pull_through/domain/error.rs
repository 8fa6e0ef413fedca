//! Validation errors for pull-through cache inputs.

use thiserror::Error;

/// Errors returned while validating pull-through requests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PullThroughDomainError {
    /// A version string is not semver.
    #[error("invalid semantic version: {0}")]
    InvalidVersion(String),

    /// The packaging format is not one of `tar`, `deb` or `rpm`.
    #[error("invalid install type: {0}")]
    InvalidInstallType(String),

    /// An extension id is not of the form `publisher.name`.
    #[error("invalid extension id: {0}")]
    InvalidExtensionId(String),

    /// A key component is empty or contains a path separator.
    #[error("invalid {field}: {value:?}")]
    InvalidComponent {
        /// Name of the offending input.
        field: &'static str,
        /// Rejected value.
        value: String,
    },
}
