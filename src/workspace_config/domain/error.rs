//! Error types for workspace config parsing and template validation.

use thiserror::Error;

/// Reasons a `.gigo/workspace.yaml` document was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigParseError {
    /// The document is not valid YAML or has the wrong shape.
    #[error("workspace config is malformed: {0}")]
    Malformed(String),

    /// The document parsed but a required value is missing or out of range.
    #[error("workspace config is invalid: {0}")]
    Invalid(String),
}

/// Errors returned while building template revisions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateDomainError {
    /// Templates must carry a title.
    #[error("template title must not be empty")]
    EmptyTitle,
}
