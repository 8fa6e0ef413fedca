//! Port contracts for template persistence.

mod repository;

pub use repository::{
    WorkspaceConfigRepository, WorkspaceConfigRepositoryError, WorkspaceConfigRepositoryResult,
};
