//! Diesel row models for workspace persistence.

use super::schema::{
    attempts, bytes, ephemeral_shared_workspaces, posts, workspace_agents, workspace_outbox,
    workspaces,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

/// Workspace row, used for both reads and writes.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = workspaces)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct WorkspaceRow {
    pub id: i64,
    pub owner_id: i64,
    pub repo_id: i64,
    pub commit_ref: String,
    pub code_source_id: i64,
    pub code_source_type: String,
    pub state: String,
    pub init_state: i32,
    pub init_failure: Option<serde_json::Value>,
    pub expiration: DateTime<Utc>,
    pub last_state_update: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub workspace_settings: serde_json::Value,
    pub over_allocated: Option<serde_json::Value>,
    pub cpu: i64,
    pub mem: i64,
    pub disk: i64,
    pub container: String,
    pub ports: serde_json::Value,
    pub is_ephemeral: bool,
    pub version: i64,
}

/// Outbox query row.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = workspace_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxRow {
    pub id: i64,
    pub workspace_id: i64,
    pub subject: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Outbox insert model; the id comes from the sequence.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = workspace_outbox)]
pub struct NewOutboxRow {
    pub workspace_id: i64,
    pub subject: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Agent secret row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = workspace_agents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AgentRow {
    pub workspace_id: i64,
    pub secret: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Ephemeral binding row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = ephemeral_shared_workspaces)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BindingRow {
    pub ip: i64,
    pub challenge_id: i64,
    pub workspace_id: i64,
    pub user_id: i64,
    pub date: DateTime<Utc>,
}

/// Post columns the core reads.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub author_id: i64,
    pub visibility: String,
    pub repo_id: i64,
    pub workspace_settings: Option<serde_json::Value>,
    pub template_id: Option<i64>,
    pub template_revision: Option<i64>,
}

/// Attempt columns the core reads.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = attempts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AttemptRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub title: String,
    pub repo_id: i64,
    pub closed: bool,
    pub workspace_settings: Option<serde_json::Value>,
}

/// Attempt insert model.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = attempts)]
pub struct NewAttemptRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub author_tier: String,
    pub title: String,
    pub description: String,
    pub repo_id: i64,
    pub parent_attempt: Option<i64>,
    pub closed: bool,
    pub workspace_settings: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Byte columns the core reads.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bytes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ByteRow {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
}
