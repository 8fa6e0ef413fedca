//! `PostgreSQL` repository implementation for template revisions.

use super::{
    models::{NewTemplateRow, TemplateRow},
    schema::workspace_configs,
};
use crate::workspace::domain::UserId;
use crate::workspace_config::{
    domain::{PersistedTemplateData, TemplateId, TemplateRef, WorkspaceTemplate},
    ports::{
        WorkspaceConfigRepository, WorkspaceConfigRepositoryError,
        WorkspaceConfigRepositoryResult,
    },
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by template adapters.
pub type TemplatePgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed template repository.
#[derive(Debug, Clone)]
pub struct PostgresWorkspaceConfigRepository {
    pool: TemplatePgPool,
}

impl PostgresWorkspaceConfigRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TemplatePgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> WorkspaceConfigRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> WorkspaceConfigRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool
                .get()
                .map_err(WorkspaceConfigRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(WorkspaceConfigRepositoryError::persistence)?
    }
}

#[async_trait]
impl WorkspaceConfigRepository for PostgresWorkspaceConfigRepository {
    async fn insert(&self, template: &WorkspaceTemplate) -> WorkspaceConfigRepositoryResult<()> {
        let template_ref = template.template_ref();
        let row = to_new_row(template);
        self.run_blocking(move |connection| {
            diesel::insert_into(workspace_configs::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        WorkspaceConfigRepositoryError::DuplicateRevision(template_ref)
                    }
                    _ => WorkspaceConfigRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_revision(
        &self,
        template_ref: TemplateRef,
    ) -> WorkspaceConfigRepositoryResult<Option<WorkspaceTemplate>> {
        self.run_blocking(move |connection| {
            let row = workspace_configs::table
                .filter(workspace_configs::id.eq(template_ref.id.into_inner()))
                .filter(workspace_configs::revision.eq(template_ref.revision))
                .select(TemplateRow::as_select())
                .first::<TemplateRow>(connection)
                .optional()
                .map_err(WorkspaceConfigRepositoryError::persistence)?;
            Ok(row.map(row_to_template))
        })
        .await
    }

    async fn find_latest_by_author(
        &self,
        id: TemplateId,
        author_id: UserId,
    ) -> WorkspaceConfigRepositoryResult<Option<WorkspaceTemplate>> {
        self.run_blocking(move |connection| {
            let row = workspace_configs::table
                .filter(workspace_configs::id.eq(id.into_inner()))
                .filter(workspace_configs::author_id.eq(author_id.into_inner()))
                .order(workspace_configs::revision.desc())
                .select(TemplateRow::as_select())
                .first::<TemplateRow>(connection)
                .optional()
                .map_err(WorkspaceConfigRepositoryError::persistence)?;
            Ok(row.map(row_to_template))
        })
        .await
    }

    async fn list_revisions(
        &self,
        id: TemplateId,
    ) -> WorkspaceConfigRepositoryResult<Vec<WorkspaceTemplate>> {
        self.run_blocking(move |connection| {
            let rows = workspace_configs::table
                .filter(workspace_configs::id.eq(id.into_inner()))
                .order(workspace_configs::revision.asc())
                .select(TemplateRow::as_select())
                .load::<TemplateRow>(connection)
                .map_err(WorkspaceConfigRepositoryError::persistence)?;
            Ok(rows.into_iter().map(row_to_template).collect())
        })
        .await
    }

    async fn increment_uses(
        &self,
        template_ref: TemplateRef,
    ) -> WorkspaceConfigRepositoryResult<()> {
        self.run_blocking(move |connection| {
            let updated = diesel::update(revision_filter(template_ref))
                .set(workspace_configs::uses.eq(workspace_configs::uses + 1))
                .execute(connection)
                .map_err(WorkspaceConfigRepositoryError::persistence)?;
            ensure_updated(updated, template_ref)
        })
        .await
    }

    async fn increment_completions(
        &self,
        template_ref: TemplateRef,
    ) -> WorkspaceConfigRepositoryResult<()> {
        self.run_blocking(move |connection| {
            let updated = diesel::update(revision_filter(template_ref))
                .set(workspace_configs::completions.eq(workspace_configs::completions + 1))
                .execute(connection)
                .map_err(WorkspaceConfigRepositoryError::persistence)?;
            ensure_updated(updated, template_ref)
        })
        .await
    }
}

type RevisionFilter = diesel::dsl::Filter<
    diesel::dsl::Filter<
        workspace_configs::table,
        diesel::dsl::Eq<workspace_configs::id, i64>,
    >,
    diesel::dsl::Eq<workspace_configs::revision, i64>,
>;

fn revision_filter(template_ref: TemplateRef) -> RevisionFilter {
    workspace_configs::table
        .filter(workspace_configs::id.eq(template_ref.id.into_inner()))
        .filter(workspace_configs::revision.eq(template_ref.revision))
}

const fn ensure_updated(
    updated: usize,
    template_ref: TemplateRef,
) -> WorkspaceConfigRepositoryResult<()> {
    if updated == 0 {
        return Err(WorkspaceConfigRepositoryError::NotFound(template_ref));
    }
    Ok(())
}

fn to_new_row(template: &WorkspaceTemplate) -> NewTemplateRow {
    NewTemplateRow {
        id: template.id().into_inner(),
        revision: template.revision(),
        author_id: template.author_id().into_inner(),
        title: template.title().to_owned(),
        description: template.description().to_owned(),
        content: template.content().to_owned(),
        tags: template.tags().to_vec(),
        languages: template.languages().to_vec(),
        uses: template.uses(),
        completions: template.completions(),
        created_at: template.created_at(),
    }
}

fn row_to_template(row: TemplateRow) -> WorkspaceTemplate {
    WorkspaceTemplate::from_persisted(PersistedTemplateData {
        id: TemplateId::new(row.id),
        revision: row.revision,
        author_id: UserId::new(row.author_id),
        title: row.title,
        description: row.description,
        content: row.content,
        tags: row.tags,
        languages: row.languages,
        uses: row.uses,
        completions: row.completions,
        created_at: row.created_at,
    })
}
