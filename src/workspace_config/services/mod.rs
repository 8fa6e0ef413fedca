//! Orchestration services for config resolution and template revisions.

mod resolver;
mod templates;

pub use resolver::{
    ConfigResolutionError, ConfigResolutionResult, ResolveRequest, ResolvedWorkspaceConfig,
    WorkspaceConfigResolver,
};
pub use templates::{
    CreateTemplateRequest, WorkspaceConfigService, WorkspaceConfigServiceError,
    WorkspaceConfigServiceResult,
};
