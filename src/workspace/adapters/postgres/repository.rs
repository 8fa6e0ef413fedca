//! `PostgreSQL` store for workspace rows and their lifecycle outbox.

use super::{
    PersistenceError, WorkspacePgPool,
    models::{AgentRow, BindingRow, NewOutboxRow, OutboxRow, WorkspaceRow},
    run_blocking,
    schema::{ephemeral_shared_workspaces, workspace_agents, workspace_outbox, workspaces},
};
use crate::resource_policy::ResourceSpec;
use crate::workspace::{
    domain::{
        AgentSecret, CodeSourceId, CodeSourceRef, CodeSourceType, EphemeralBinding, InitState,
        LifecycleIntent, NetworkId, PersistedWorkspaceData, PostId, RepoId, UserId, Workspace,
        WorkspaceAgent, WorkspaceId, WorkspaceSourceKey, WorkspaceState,
    },
    ports::{
        LifecycleOutbox, OutboxEntry, OutboxError, OutboxResult, WorkspaceRepository,
        WorkspaceRepositoryError, WorkspaceRepositoryResult,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

const LIVE_SOURCE_INDEX: &str = "idx_workspaces_live_source";
const NOT_LIVE: [&str; 3] = [
    WorkspaceState::Removing.as_str(),
    WorkspaceState::Deleted.as_str(),
    WorkspaceState::Failed.as_str(),
];
const REAPABLE: [&str; 4] = [
    WorkspaceState::Starting.as_str(),
    WorkspaceState::Active.as_str(),
    WorkspaceState::Stopping.as_str(),
    WorkspaceState::Stopped.as_str(),
];

impl From<DieselError> for WorkspaceRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

impl PersistenceError for WorkspaceRepositoryError {
    fn wrap(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::persistence(err)
    }
}

impl PersistenceError for OutboxError {
    fn wrap(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::persistence(err)
    }
}

/// `PostgreSQL`-backed workspace store.
///
/// Implements both [`WorkspaceRepository`] and [`LifecycleOutbox`] over one
/// pool so row mutations and outbox entries share a transaction.
#[derive(Debug, Clone)]
pub struct PostgresWorkspaceStore {
    pool: WorkspacePgPool,
}

impl PostgresWorkspaceStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: WorkspacePgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkspaceRepository for PostgresWorkspaceStore {
    async fn insert(
        &self,
        workspace: &Workspace,
        intent: Option<&LifecycleIntent>,
    ) -> WorkspaceRepositoryResult<()> {
        let row = to_row(workspace)?;
        let key = workspace.source_key();
        let outbox = intent
            .map(|pending| to_outbox_row(pending, workspace.last_state_update()))
            .transpose()?;
        run_blocking(&self.pool, move |connection| {
            connection.transaction::<_, WorkspaceRepositoryError, _>(|tx| {
                diesel::insert_into(workspaces::table)
                    .values(&row)
                    .execute(tx)
                    .map_err(|err| live_source_violation(err, &key))?;
                enqueue(tx, outbox.as_ref())
            })
        })
        .await
    }

    async fn update(
        &self,
        workspace: &Workspace,
        expected_version: i64,
        intent: Option<&LifecycleIntent>,
    ) -> WorkspaceRepositoryResult<()> {
        let row = to_row(workspace)?;
        let key = workspace.source_key();
        let workspace_id = workspace.id();
        let outbox = intent
            .map(|pending| to_outbox_row(pending, workspace.last_state_update()))
            .transpose()?;
        run_blocking(&self.pool, move |connection| {
            connection.transaction::<_, WorkspaceRepositoryError, _>(|tx| {
                let updated = diesel::update(
                    workspaces::table
                        .filter(workspaces::id.eq(workspace_id.into_inner()))
                        .filter(workspaces::version.eq(expected_version)),
                )
                .set(&row)
                .execute(tx)
                .map_err(|err| live_source_violation(err, &key))?;

                if updated == 0 {
                    let exists: i64 = workspaces::table
                        .filter(workspaces::id.eq(workspace_id.into_inner()))
                        .count()
                        .get_result(tx)?;
                    if exists == 0 {
                        return Err(WorkspaceRepositoryError::NotFound(workspace_id));
                    }
                    return Err(WorkspaceRepositoryError::VersionConflict {
                        workspace_id,
                        expected: expected_version,
                    });
                }
                enqueue(tx, outbox.as_ref())
            })
        })
        .await
    }

    async fn find_by_id(&self, id: WorkspaceId) -> WorkspaceRepositoryResult<Option<Workspace>> {
        run_blocking(&self.pool, move |connection| {
            let row = workspaces::table
                .filter(workspaces::id.eq(id.into_inner()))
                .select(WorkspaceRow::as_select())
                .first::<WorkspaceRow>(connection)
                .optional()?;
            row.map(row_to_workspace).transpose()
        })
        .await
    }

    async fn find_live_by_source_key(
        &self,
        key: &WorkspaceSourceKey,
    ) -> WorkspaceRepositoryResult<Option<Workspace>> {
        let lookup = key.clone();
        run_blocking(&self.pool, move |connection| {
            let row = workspaces::table
                .filter(workspaces::owner_id.eq(lookup.owner_id.into_inner()))
                .filter(workspaces::repo_id.eq(lookup.repo_id.into_inner()))
                .filter(workspaces::commit_ref.eq(lookup.commit.as_str()))
                .filter(workspaces::code_source_id.eq(lookup.code_source_id.into_inner()))
                .filter(workspaces::state.ne_all(NOT_LIVE))
                .select(WorkspaceRow::as_select())
                .first::<WorkspaceRow>(connection)
                .optional()?;
            row.map(row_to_workspace).transpose()
        })
        .await
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> WorkspaceRepositoryResult<Vec<Workspace>> {
        run_blocking(&self.pool, move |connection| {
            let rows = workspaces::table
                .filter(workspaces::state.eq_any(REAPABLE))
                .filter(workspaces::expiration.lt(now))
                .order(workspaces::expiration.asc())
                .select(WorkspaceRow::as_select())
                .load::<WorkspaceRow>(connection)?;
            rows.into_iter().map(row_to_workspace).collect()
        })
        .await
    }

    async fn hard_delete(&self, id: WorkspaceId) -> WorkspaceRepositoryResult<()> {
        run_blocking(&self.pool, move |connection| {
            connection.transaction::<_, WorkspaceRepositoryError, _>(|tx| {
                diesel::delete(
                    workspace_agents::table
                        .filter(workspace_agents::workspace_id.eq(id.into_inner())),
                )
                .execute(tx)?;
                diesel::delete(workspaces::table.filter(workspaces::id.eq(id.into_inner())))
                    .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn insert_agent(&self, agent: &WorkspaceAgent) -> WorkspaceRepositoryResult<()> {
        let workspace_id = agent.workspace_id;
        let row = AgentRow {
            workspace_id: workspace_id.into_inner(),
            secret: agent.secret.into_inner(),
            created_at: agent.created_at,
        };
        run_blocking(&self.pool, move |connection| {
            diesel::insert_into(workspace_agents::table)
                .values(&row)
                .on_conflict(workspace_agents::workspace_id)
                .do_update()
                .set((
                    workspace_agents::secret.eq(row.secret),
                    workspace_agents::created_at.eq(row.created_at),
                ))
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        WorkspaceRepositoryError::NotFound(workspace_id)
                    }
                    other => WorkspaceRepositoryError::persistence(other),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_by_agent(
        &self,
        workspace_id: WorkspaceId,
        secret: AgentSecret,
    ) -> WorkspaceRepositoryResult<Option<Workspace>> {
        run_blocking(&self.pool, move |connection| {
            let authorised: i64 = workspace_agents::table
                .filter(workspace_agents::workspace_id.eq(workspace_id.into_inner()))
                .filter(workspace_agents::secret.eq(secret.into_inner()))
                .count()
                .get_result(connection)?;
            if authorised == 0 {
                return Ok(None);
            }
            let row = workspaces::table
                .filter(workspaces::id.eq(workspace_id.into_inner()))
                .select(WorkspaceRow::as_select())
                .first::<WorkspaceRow>(connection)
                .optional()?;
            row.map(row_to_workspace).transpose()
        })
        .await
    }

    async fn find_ephemeral_binding(
        &self,
        ip: NetworkId,
        challenge_id: PostId,
    ) -> WorkspaceRepositoryResult<Option<EphemeralBinding>> {
        run_blocking(&self.pool, move |connection| {
            let row = ephemeral_shared_workspaces::table
                .filter(ephemeral_shared_workspaces::ip.eq(ip.into_inner()))
                .filter(ephemeral_shared_workspaces::challenge_id.eq(challenge_id.into_inner()))
                .select(BindingRow::as_select())
                .first::<BindingRow>(connection)
                .optional()?;
            Ok(row.map(|found| EphemeralBinding {
                ip: NetworkId::new(found.ip),
                challenge_id: PostId::new(found.challenge_id),
                workspace_id: WorkspaceId::new(found.workspace_id),
                user_id: UserId::new(found.user_id),
                date: found.date,
            }))
        })
        .await
    }

    async fn insert_ephemeral(
        &self,
        workspace: &Workspace,
        binding: &EphemeralBinding,
        intent: &LifecycleIntent,
    ) -> WorkspaceRepositoryResult<()> {
        let row = to_row(workspace)?;
        let key = workspace.source_key();
        let outbox = to_outbox_row(intent, workspace.last_state_update())?;
        let ip = binding.ip;
        let challenge_id = binding.challenge_id;
        let binding_row = BindingRow {
            ip: ip.into_inner(),
            challenge_id: challenge_id.into_inner(),
            workspace_id: binding.workspace_id.into_inner(),
            user_id: binding.user_id.into_inner(),
            date: binding.date,
        };
        run_blocking(&self.pool, move |connection| {
            connection.transaction::<_, WorkspaceRepositoryError, _>(|tx| {
                diesel::insert_into(ephemeral_shared_workspaces::table)
                    .values(&binding_row)
                    .execute(tx)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            WorkspaceRepositoryError::DuplicateBinding { ip, challenge_id }
                        }
                        other => WorkspaceRepositoryError::persistence(other),
                    })?;
                diesel::insert_into(workspaces::table)
                    .values(&row)
                    .execute(tx)
                    .map_err(|err| live_source_violation(err, &key))?;
                enqueue(tx, Some(&outbox))
            })
        })
        .await
    }
}

#[async_trait]
impl LifecycleOutbox for PostgresWorkspaceStore {
    async fn pending(&self, limit: usize) -> OutboxResult<Vec<OutboxEntry>> {
        let bounded = i64::try_from(limit).unwrap_or(i64::MAX);
        run_blocking(&self.pool, move |connection| {
            let rows = workspace_outbox::table
                .filter(workspace_outbox::delivered_at.is_null())
                .order(workspace_outbox::id.asc())
                .limit(bounded)
                .select(OutboxRow::as_select())
                .load::<OutboxRow>(connection)
                .map_err(OutboxError::persistence)?;
            Ok(rows
                .into_iter()
                .map(|row| OutboxEntry {
                    id: row.id,
                    workspace_id: WorkspaceId::new(row.workspace_id),
                    subject: row.subject,
                    payload: row.payload,
                    created_at: row.created_at,
                })
                .collect())
        })
        .await
    }

    async fn mark_delivered(&self, id: i64, delivered_at: DateTime<Utc>) -> OutboxResult<()> {
        run_blocking(&self.pool, move |connection| {
            diesel::update(
                workspace_outbox::table
                    .filter(workspace_outbox::id.eq(id))
                    .filter(workspace_outbox::delivered_at.is_null()),
            )
            .set(workspace_outbox::delivered_at.eq(delivered_at))
            .execute(connection)
            .map_err(OutboxError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn prune_delivered(&self, older_than: DateTime<Utc>) -> OutboxResult<usize> {
        run_blocking(&self.pool, move |connection| {
            diesel::delete(
                workspace_outbox::table
                    .filter(workspace_outbox::delivered_at.is_not_null())
                    .filter(workspace_outbox::delivered_at.lt(older_than)),
            )
            .execute(connection)
            .map_err(OutboxError::persistence)
        })
        .await
    }
}

fn enqueue(
    connection: &mut PgConnection,
    outbox: Option<&NewOutboxRow>,
) -> WorkspaceRepositoryResult<()> {
    if let Some(entry) = outbox {
        diesel::insert_into(workspace_outbox::table)
            .values(entry)
            .execute(connection)?;
    }
    Ok(())
}

fn live_source_violation(err: DieselError, key: &WorkspaceSourceKey) -> WorkspaceRepositoryError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
            if info.constraint_name() == Some(LIVE_SOURCE_INDEX) =>
        {
            WorkspaceRepositoryError::DuplicateActiveWorkspace(key.clone())
        }
        other => WorkspaceRepositoryError::persistence(other),
    }
}

fn to_outbox_row(
    intent: &LifecycleIntent,
    at: DateTime<Utc>,
) -> WorkspaceRepositoryResult<NewOutboxRow> {
    Ok(NewOutboxRow {
        workspace_id: intent.workspace_id().into_inner(),
        subject: intent.subject().to_owned(),
        payload: intent
            .to_payload()
            .map_err(WorkspaceRepositoryError::persistence)?,
        created_at: at,
    })
}

fn to_row(workspace: &Workspace) -> WorkspaceRepositoryResult<WorkspaceRow> {
    let resources = workspace.resources();
    Ok(WorkspaceRow {
        id: workspace.id().into_inner(),
        owner_id: workspace.owner_id().into_inner(),
        repo_id: workspace.repo_id().into_inner(),
        commit_ref: workspace.commit().to_owned(),
        code_source_id: workspace.code_source().id.into_inner(),
        code_source_type: workspace.code_source().kind.as_str().to_owned(),
        state: workspace.state().as_str().to_owned(),
        init_state: workspace.init_state().as_i32(),
        init_failure: workspace
            .init_failure()
            .map(serde_json::to_value)
            .transpose()
            .map_err(WorkspaceRepositoryError::persistence)?,
        expiration: workspace.expiration(),
        last_state_update: workspace.last_state_update(),
        created_at: workspace.created_at(),
        workspace_settings: workspace.workspace_settings().clone(),
        over_allocated: workspace
            .over_allocated()
            .map(serde_json::to_value)
            .transpose()
            .map_err(WorkspaceRepositoryError::persistence)?,
        cpu: i64::from(resources.cpu),
        mem: i64::from(resources.mem),
        disk: i64::from(resources.disk),
        container: workspace.container().to_owned(),
        ports: serde_json::to_value(workspace.ports())
            .map_err(WorkspaceRepositoryError::persistence)?,
        is_ephemeral: workspace.is_ephemeral(),
        version: workspace.version(),
    })
}

fn row_to_workspace(row: WorkspaceRow) -> WorkspaceRepositoryResult<Workspace> {
    let WorkspaceRow {
        id,
        owner_id,
        repo_id,
        commit_ref,
        code_source_id,
        code_source_type,
        state: persisted_state,
        init_state: persisted_init_state,
        init_failure,
        expiration,
        last_state_update,
        created_at,
        workspace_settings,
        over_allocated,
        cpu,
        mem,
        disk,
        container,
        ports,
        is_ephemeral,
        version,
    } = row;

    let kind = CodeSourceType::try_from(code_source_type.as_str())
        .map_err(WorkspaceRepositoryError::persistence)?;
    let state = WorkspaceState::try_from(persisted_state.as_str())
        .map_err(WorkspaceRepositoryError::persistence)?;
    let init_state = InitState::try_from(persisted_init_state)
        .map_err(WorkspaceRepositoryError::persistence)?;
    let resources = ResourceSpec::new(
        u32::try_from(cpu).map_err(WorkspaceRepositoryError::persistence)?,
        u32::try_from(mem).map_err(WorkspaceRepositoryError::persistence)?,
        u32::try_from(disk).map_err(WorkspaceRepositoryError::persistence)?,
    );

    Ok(Workspace::from_persisted(PersistedWorkspaceData {
        id: WorkspaceId::new(id),
        owner_id: UserId::new(owner_id),
        repo_id: RepoId::new(repo_id),
        commit: commit_ref,
        code_source: CodeSourceRef::new(CodeSourceId::new(code_source_id), kind),
        state,
        init_state,
        init_failure: init_failure
            .map(serde_json::from_value)
            .transpose()
            .map_err(WorkspaceRepositoryError::persistence)?,
        expiration,
        last_state_update,
        created_at,
        workspace_settings,
        over_allocated: over_allocated
            .map(serde_json::from_value)
            .transpose()
            .map_err(WorkspaceRepositoryError::persistence)?,
        resources,
        container,
        ports: serde_json::from_value(ports).map_err(WorkspaceRepositoryError::persistence)?,
        is_ephemeral,
        version,
    }))
}
