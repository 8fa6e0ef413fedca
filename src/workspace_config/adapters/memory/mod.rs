//! In-memory adapters for template persistence.

mod template;

pub use template::InMemoryWorkspaceConfigRepository;
