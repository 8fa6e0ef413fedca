//! Domain model for resolved workspace configs and template revisions.

mod error;
mod ids;
mod resolved;
mod template;

pub use error::{ConfigParseError, TemplateDomainError};
pub use ids::{TemplateId, TemplateRef};
pub use resolved::{
    BYTE_BASE_CONTAINER, BYTE_WORKING_DIRECTORY, ResolvedConfig, SUPPORTED_CONFIG_VERSION,
    TEMPLATE_RESOURCE_CEILING, WORKSPACE_CONFIG_PATH,
};
pub use template::{NewTemplateData, PersistedTemplateData, TemplateEdit, WorkspaceTemplate};
