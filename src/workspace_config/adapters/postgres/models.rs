//! Diesel row models for template persistence.

use super::schema::workspace_configs;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for template revisions.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = workspace_configs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TemplateRow {
    /// Template identifier.
    pub id: i64,
    /// Revision number.
    pub revision: i64,
    /// Author identifier.
    pub author_id: i64,
    /// Display title.
    pub title: String,
    /// Description.
    pub description: String,
    /// YAML content.
    pub content: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Languages.
    pub languages: Vec<String>,
    /// Attempt counter.
    pub uses: i64,
    /// Completion counter.
    pub completions: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for template revisions.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = workspace_configs)]
pub struct NewTemplateRow {
    /// Template identifier.
    pub id: i64,
    /// Revision number.
    pub revision: i64,
    /// Author identifier.
    pub author_id: i64,
    /// Display title.
    pub title: String,
    /// Description.
    pub description: String,
    /// YAML content.
    pub content: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Languages.
    pub languages: Vec<String>,
    /// Attempt counter.
    pub uses: i64,
    /// Completion counter.
    pub completions: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
