//! `PostgreSQL` adapter over posts, attempts and bytes.

use super::{
    PersistenceError, WorkspacePgPool,
    models::{AttemptRow, ByteRow, NewAttemptRow, PostRow},
    run_blocking,
    schema::{attempts, bytes, posts, recommended_posts},
};
use crate::workspace::{
    domain::{
        Attempt, AttemptId, AttemptRecord, CodeSourceRef, CodeSourceType, PostId, PostRecord,
        PostVisibility, RepoId, UserId,
    },
    ports::{
        CodeSourceLink, CodeSourceRepository, CodeSourceRepositoryError,
        CodeSourceRepositoryResult,
    },
};
use crate::workspace_config::domain::{TemplateId, TemplateRef};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;

impl From<DieselError> for CodeSourceRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

impl PersistenceError for CodeSourceRepositoryError {
    fn wrap(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::persistence(err)
    }
}

/// `PostgreSQL`-backed code source rows.
#[derive(Debug, Clone)]
pub struct PostgresCodeSourceRepository {
    pool: WorkspacePgPool,
}

impl PostgresCodeSourceRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: WorkspacePgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CodeSourceRepository for PostgresCodeSourceRepository {
    async fn find_link(
        &self,
        code_source: CodeSourceRef,
    ) -> CodeSourceRepositoryResult<Option<CodeSourceLink>> {
        let raw = code_source.id.into_inner();
        run_blocking(&self.pool, move |connection| match code_source.kind {
            CodeSourceType::Post => {
                let row = posts::table
                    .filter(posts::id.eq(raw))
                    .select(PostRow::as_select())
                    .first::<PostRow>(connection)
                    .optional()?;
                Ok(row.map(|post| CodeSourceLink {
                    code_source,
                    owner_id: UserId::new(post.author_id),
                    repo_id: RepoId::new(post.repo_id),
                    template: template_of(&post),
                    name: post.title,
                    workspace_settings: post.workspace_settings,
                }))
            }
            CodeSourceType::Attempt => {
                let row = attempts::table
                    .inner_join(posts::table.on(posts::id.eq(attempts::post_id)))
                    .filter(attempts::id.eq(raw))
                    .select((AttemptRow::as_select(), PostRow::as_select()))
                    .first::<(AttemptRow, PostRow)>(connection)
                    .optional()?;
                Ok(row.map(|(attempt, post)| CodeSourceLink {
                    code_source,
                    owner_id: UserId::new(attempt.author_id),
                    repo_id: RepoId::new(attempt.repo_id),
                    name: attempt.title,
                    workspace_settings: attempt.workspace_settings,
                    template: template_of(&post),
                }))
            }
            CodeSourceType::Byte => {
                let row = bytes::table
                    .filter(bytes::id.eq(raw))
                    .select(ByteRow::as_select())
                    .first::<ByteRow>(connection)
                    .optional()?;
                Ok(row.map(|byte| CodeSourceLink {
                    code_source,
                    owner_id: UserId::new(byte.owner_id),
                    repo_id: RepoId::new(-1),
                    name: byte.name,
                    workspace_settings: None,
                    template: None,
                }))
            }
        })
        .await
    }

    async fn touch(
        &self,
        code_source: CodeSourceRef,
        at: DateTime<Utc>,
    ) -> CodeSourceRepositoryResult<()> {
        let raw = code_source.id.into_inner();
        run_blocking(&self.pool, move |connection| {
            match code_source.kind {
                CodeSourceType::Post => diesel::update(posts::table.filter(posts::id.eq(raw)))
                    .set(posts::updated_at.eq(at))
                    .execute(connection)?,
                CodeSourceType::Attempt => {
                    diesel::update(attempts::table.filter(attempts::id.eq(raw)))
                        .set(attempts::updated_at.eq(at))
                        .execute(connection)?
                }
                CodeSourceType::Byte => diesel::update(bytes::table.filter(bytes::id.eq(raw)))
                    .set(bytes::updated_at.eq(at))
                    .execute(connection)?,
            };
            Ok(())
        })
        .await
    }

    async fn find_post(&self, id: PostId) -> CodeSourceRepositoryResult<Option<PostRecord>> {
        run_blocking(&self.pool, move |connection| {
            let row = posts::table
                .filter(posts::id.eq(id.into_inner()))
                .select(PostRow::as_select())
                .first::<PostRow>(connection)
                .optional()?;
            row.map(row_to_post).transpose()
        })
        .await
    }

    async fn find_attempt(
        &self,
        id: AttemptId,
    ) -> CodeSourceRepositoryResult<Option<AttemptRecord>> {
        run_blocking(&self.pool, move |connection| {
            let row = attempts::table
                .filter(attempts::id.eq(id.into_inner()))
                .select(AttemptRow::as_select())
                .first::<AttemptRow>(connection)
                .optional()?;
            Ok(row.map(row_to_attempt))
        })
        .await
    }

    async fn find_existing_attempt(
        &self,
        author_id: UserId,
        post_id: PostId,
    ) -> CodeSourceRepositoryResult<Option<AttemptRecord>> {
        run_blocking(&self.pool, move |connection| {
            let row = attempts::table
                .filter(attempts::author_id.eq(author_id.into_inner()))
                .filter(attempts::post_id.eq(post_id.into_inner()))
                .order(attempts::id.asc())
                .select(AttemptRow::as_select())
                .first::<AttemptRow>(connection)
                .optional()?;
            Ok(row.map(row_to_attempt))
        })
        .await
    }

    async fn record_attempt(&self, attempt: &Attempt) -> CodeSourceRepositoryResult<()> {
        let post_id = attempt.post_id.into_inner();
        let author_id = attempt.author_id.into_inner();
        let created_at = attempt.created_at;
        let mut row = NewAttemptRow {
            id: attempt.id.into_inner(),
            post_id,
            author_id,
            author_name: attempt.author_name.clone(),
            author_tier: attempt.author_tier.as_str().to_owned(),
            title: attempt.title.clone(),
            description: attempt.description.clone(),
            repo_id: attempt.repo_id.into_inner(),
            parent_attempt: attempt.parent_attempt.map(AttemptId::into_inner),
            closed: false,
            workspace_settings: None,
            created_at,
            updated_at: Some(created_at),
        };
        run_blocking(&self.pool, move |connection| {
            connection.transaction::<_, CodeSourceRepositoryError, _>(|tx| {
                let workspace_settings = diesel::update(posts::table.filter(posts::id.eq(post_id)))
                    .set((
                        posts::attempts.eq(posts::attempts + 1),
                        posts::updated_at.eq(created_at),
                    ))
                    .returning(posts::workspace_settings)
                    .get_result::<Option<serde_json::Value>>(tx)
                    .optional()?
                    .ok_or_else(|| {
                        CodeSourceRepositoryError::persistence(std::io::Error::other(format!(
                            "post {post_id} missing"
                        )))
                    })?;
                row.workspace_settings = workspace_settings;
                diesel::insert_into(attempts::table)
                    .values(&row)
                    .execute(tx)?;
                diesel::update(
                    recommended_posts::table
                        .filter(recommended_posts::user_id.eq(author_id))
                        .filter(recommended_posts::post_id.eq(post_id)),
                )
                .set(recommended_posts::accepted.eq(true))
                .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn discard_attempt(&self, attempt: &Attempt) -> CodeSourceRepositoryResult<()> {
        let attempt_id = attempt.id.into_inner();
        let post_id = attempt.post_id.into_inner();
        let author_id = attempt.author_id.into_inner();
        run_blocking(&self.pool, move |connection| {
            connection.transaction::<_, CodeSourceRepositoryError, _>(|tx| {
                let deleted = diesel::delete(attempts::table.filter(attempts::id.eq(attempt_id)))
                    .execute(tx)?;
                if deleted == 0 {
                    return Ok(());
                }
                diesel::update(
                    posts::table
                        .filter(posts::id.eq(post_id))
                        .filter(posts::attempts.gt(0)),
                )
                .set(posts::attempts.eq(posts::attempts - 1))
                .execute(tx)?;
                diesel::update(
                    recommended_posts::table
                        .filter(recommended_posts::user_id.eq(author_id))
                        .filter(recommended_posts::post_id.eq(post_id)),
                )
                .set(recommended_posts::accepted.eq(false))
                .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn delete_attempt(&self, id: AttemptId) -> CodeSourceRepositoryResult<()> {
        run_blocking(&self.pool, move |connection| {
            diesel::delete(attempts::table.filter(attempts::id.eq(id.into_inner())))
                .execute(connection)?;
            Ok(())
        })
        .await
    }
}

fn template_of(post: &PostRow) -> Option<TemplateRef> {
    post.template_id
        .zip(post.template_revision)
        .map(|(id, revision)| TemplateRef::new(TemplateId::new(id), revision))
}

fn row_to_post(row: PostRow) -> CodeSourceRepositoryResult<PostRecord> {
    let visibility = PostVisibility::parse(&row.visibility).ok_or_else(|| {
        CodeSourceRepositoryError::persistence(std::io::Error::other(format!(
            "unknown post visibility: {}",
            row.visibility
        )))
    })?;
    Ok(PostRecord {
        id: PostId::new(row.id),
        template: template_of(&row),
        title: row.title,
        description: row.description,
        author_id: UserId::new(row.author_id),
        visibility,
    })
}

fn row_to_attempt(row: AttemptRow) -> AttemptRecord {
    AttemptRecord {
        id: AttemptId::new(row.id),
        post_id: PostId::new(row.post_id),
        author_id: UserId::new(row.author_id),
        closed: row.closed,
    }
}
