//! Shared test helpers for `PostgreSQL` integration tests.

use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use gigo_workspaces::workspace::adapters::postgres::WorkspacePgPool;
use uuid::Uuid;

/// Environment variable naming a database the tests may create schemas in.
pub const TEST_DATABASE_URL: &str = "GIGO_TEST_DATABASE_URL";

/// SQL creating the workspace, code source and outbox tables.
pub const CREATE_WORKSPACE_TABLES_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_workspace_tables/up.sql");

/// SQL creating the template revision table.
pub const CREATE_WORKSPACE_CONFIGS_SQL: &str =
    include_str!("../../migrations/2026-10-01-000001_create_workspace_configs/up.sql");

#[derive(Debug)]
struct SearchPath(String);

impl CustomizeConnection<PgConnection, diesel::r2d2::Error> for SearchPath {
    fn on_acquire(&self, connection: &mut PgConnection) -> Result<(), diesel::r2d2::Error> {
        connection
            .batch_execute(&format!("SET search_path TO {}", self.0))
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Migrated schema private to one test, dropped on drop.
pub struct TestSchema {
    url: String,
    schema: String,
    pool: WorkspacePgPool,
}

impl TestSchema {
    /// Creates and migrates a fresh schema, or returns `None` when no test
    /// database is configured.
    ///
    /// # Errors
    ///
    /// Returns an error when the database is unreachable or a migration
    /// fails.
    pub fn provision() -> eyre::Result<Option<Self>> {
        let Ok(url) = std::env::var(TEST_DATABASE_URL) else {
            return Ok(None);
        };
        let schema = format!("gigo_test_{}", Uuid::new_v4().simple());
        PgConnection::establish(&url)?.batch_execute(&format!("CREATE SCHEMA {schema}"))?;

        let pool = Pool::builder()
            .max_size(4)
            .connection_customizer(Box::new(SearchPath(schema.clone())))
            .build(ConnectionManager::<PgConnection>::new(url.clone()))?;
        let mut connection = pool.get()?;
        connection.batch_execute(CREATE_WORKSPACE_TABLES_SQL)?;
        connection.batch_execute(CREATE_WORKSPACE_CONFIGS_SQL)?;
        Ok(Some(Self { url, schema, pool }))
    }

    /// Pool whose connections resolve tables in this schema.
    pub fn pool(&self) -> WorkspacePgPool {
        self.pool.clone()
    }

    /// Runs raw SQL against the schema.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement fails.
    pub fn execute(&self, sql: &str) -> eyre::Result<()> {
        self.pool.get()?.batch_execute(sql)?;
        Ok(())
    }
}

impl Drop for TestSchema {
    fn drop(&mut self) {
        let dropped = PgConnection::establish(&self.url).map_err(eyre::Report::from).and_then(
            |mut connection| {
                connection
                    .batch_execute(&format!("DROP SCHEMA {} CASCADE", self.schema))
                    .map_err(eyre::Report::from)
            },
        );
        if let Err(err) = dropped {
            tracing::warn!(schema = %self.schema, error = %err, "failed to drop test schema");
        }
    }
}

/// Seeds a post row directly.
///
/// # Errors
///
/// Returns an error when the insert fails.
pub fn seed_post(schema: &TestSchema, id: i64, author: i64, repo: i64) -> eyre::Result<()> {
    schema.execute(&format!(
        "INSERT INTO posts (id, title, description, author_id, visibility, repo_id, \
         workspace_settings) VALUES ({id}, 'Challenge {id}', 'Solve it', {author}, 'public', \
         {repo}, '{{\"theme\": \"light\"}}'::jsonb)"
    ))
}
