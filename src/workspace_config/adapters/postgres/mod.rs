//! `PostgreSQL` adapters for template persistence.

mod models;
mod repository;
mod schema;

pub use repository::{PostgresWorkspaceConfigRepository, TemplatePgPool};
