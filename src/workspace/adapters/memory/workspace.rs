//! In-memory workspace store with a transactional outbox.

use crate::workspace::{
    domain::{
        AgentSecret, EphemeralBinding, LifecycleIntent, NetworkId, PostId, Workspace,
        WorkspaceAgent, WorkspaceId, WorkspaceSourceKey,
    },
    ports::{
        LifecycleOutbox, OutboxEntry, OutboxError, OutboxResult, WorkspaceRepository,
        WorkspaceRepositoryError, WorkspaceRepositoryResult,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory workspace store.
///
/// Implements both [`WorkspaceRepository`] and [`LifecycleOutbox`] over one
/// state so that row changes and outbox entries commit together.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkspaceStore {
    state: Arc<RwLock<StoreState>>,
}

#[derive(Debug, Default)]
struct StoreState {
    rows: BTreeMap<WorkspaceId, Workspace>,
    agents: HashMap<WorkspaceId, WorkspaceAgent>,
    bindings: HashMap<(NetworkId, PostId), EphemeralBinding>,
    outbox: Vec<StoredEntry>,
    last_outbox_id: i64,
    fail_next_write: bool,
}

#[derive(Debug, Clone)]
struct StoredEntry {
    entry: OutboxEntry,
    delivered_at: Option<DateTime<Utc>>,
}

fn lock_error(err: impl ToString) -> WorkspaceRepositoryError {
    WorkspaceRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

fn outbox_lock_error(err: impl ToString) -> OutboxError {
    OutboxError::persistence(std::io::Error::other(err.to_string()))
}

impl StoreState {
    fn take_injected_failure(&mut self) -> WorkspaceRepositoryResult<()> {
        if std::mem::take(&mut self.fail_next_write) {
            return Err(WorkspaceRepositoryError::persistence(std::io::Error::other(
                "transaction rolled back",
            )));
        }
        Ok(())
    }

    fn ensure_no_live_duplicate(&self, workspace: &Workspace) -> WorkspaceRepositoryResult<()> {
        if !workspace.state().is_live() {
            return Ok(());
        }
        let key = workspace.source_key();
        let clash = self.rows.values().any(|row| {
            row.id() != workspace.id() && row.state().is_live() && row.source_key() == key
        });
        if clash {
            return Err(WorkspaceRepositoryError::DuplicateActiveWorkspace(key));
        }
        Ok(())
    }

    fn encode_entry(
        &self,
        intent: &LifecycleIntent,
        at: DateTime<Utc>,
    ) -> WorkspaceRepositoryResult<StoredEntry> {
        let payload = intent
            .to_payload()
            .map_err(WorkspaceRepositoryError::persistence)?;
        Ok(StoredEntry {
            entry: OutboxEntry {
                id: self.last_outbox_id + 1,
                workspace_id: intent.workspace_id(),
                subject: intent.subject().to_owned(),
                payload,
                created_at: at,
            },
            delivered_at: None,
        })
    }

    fn push_entry(&mut self, entry: StoredEntry) {
        self.last_outbox_id = entry.entry.id;
        self.outbox.push(entry);
    }
}

impl InMemoryWorkspaceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next mutating call fail without applying anything.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn fail_next_write(&self) -> WorkspaceRepositoryResult<()> {
        self.state.write().map_err(lock_error)?.fail_next_write = true;
        Ok(())
    }

    /// Returns every stored row in id order.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn workspaces(&self) -> WorkspaceRepositoryResult<Vec<Workspace>> {
        Ok(self
            .state
            .read()
            .map_err(lock_error)?
            .rows
            .values()
            .cloned()
            .collect())
    }

    /// Returns every outbox entry, delivered or not, in id order.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn outbox_entries(&self) -> WorkspaceRepositoryResult<Vec<OutboxEntry>> {
        Ok(self
            .state
            .read()
            .map_err(lock_error)?
            .outbox
            .iter()
            .map(|stored| stored.entry.clone())
            .collect())
    }

    /// Returns every ephemeral binding.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn bindings(&self) -> WorkspaceRepositoryResult<Vec<EphemeralBinding>> {
        Ok(self
            .state
            .read()
            .map_err(lock_error)?
            .bindings
            .values()
            .copied()
            .collect())
    }
}

#[async_trait]
impl WorkspaceRepository for InMemoryWorkspaceStore {
    async fn insert(
        &self,
        workspace: &Workspace,
        intent: Option<&LifecycleIntent>,
    ) -> WorkspaceRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.take_injected_failure()?;
        state.ensure_no_live_duplicate(workspace)?;
        if state.rows.contains_key(&workspace.id()) {
            return Err(WorkspaceRepositoryError::persistence(std::io::Error::other(
                format!("duplicate workspace id {}", workspace.id()),
            )));
        }
        let entry = intent
            .map(|pending| state.encode_entry(pending, workspace.last_state_update()))
            .transpose()?;

        state.rows.insert(workspace.id(), workspace.clone());
        if let Some(stored) = entry {
            state.push_entry(stored);
        }
        Ok(())
    }

    async fn update(
        &self,
        workspace: &Workspace,
        expected_version: i64,
        intent: Option<&LifecycleIntent>,
    ) -> WorkspaceRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.take_injected_failure()?;
        let stored_version = state
            .rows
            .get(&workspace.id())
            .map(Workspace::version)
            .ok_or_else(|| WorkspaceRepositoryError::NotFound(workspace.id()))?;
        if stored_version != expected_version {
            return Err(WorkspaceRepositoryError::VersionConflict {
                workspace_id: workspace.id(),
                expected: expected_version,
            });
        }
        state.ensure_no_live_duplicate(workspace)?;
        let entry = intent
            .map(|pending| state.encode_entry(pending, workspace.last_state_update()))
            .transpose()?;

        state.rows.insert(workspace.id(), workspace.clone());
        if let Some(stored) = entry {
            state.push_entry(stored);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: WorkspaceId) -> WorkspaceRepositoryResult<Option<Workspace>> {
        Ok(self.state.read().map_err(lock_error)?.rows.get(&id).cloned())
    }

    async fn find_live_by_source_key(
        &self,
        key: &WorkspaceSourceKey,
    ) -> WorkspaceRepositoryResult<Option<Workspace>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .rows
            .values()
            .find(|row| row.state().is_live() && row.source_key() == *key)
            .cloned())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> WorkspaceRepositoryResult<Vec<Workspace>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .rows
            .values()
            .filter(|row| row.state().is_reapable() && row.expiration() < now)
            .cloned()
            .collect())
    }

    async fn hard_delete(&self, id: WorkspaceId) -> WorkspaceRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.take_injected_failure()?;
        state.rows.remove(&id);
        state.agents.remove(&id);
        Ok(())
    }

    async fn insert_agent(&self, agent: &WorkspaceAgent) -> WorkspaceRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if !state.rows.contains_key(&agent.workspace_id) {
            return Err(WorkspaceRepositoryError::NotFound(agent.workspace_id));
        }
        state.agents.insert(agent.workspace_id, *agent);
        Ok(())
    }

    async fn find_by_agent(
        &self,
        workspace_id: WorkspaceId,
        secret: AgentSecret,
    ) -> WorkspaceRepositoryResult<Option<Workspace>> {
        let state = self.state.read().map_err(lock_error)?;
        let authorised = state
            .agents
            .get(&workspace_id)
            .is_some_and(|agent| agent.secret == secret);
        if !authorised {
            return Ok(None);
        }
        Ok(state.rows.get(&workspace_id).cloned())
    }

    async fn find_ephemeral_binding(
        &self,
        ip: NetworkId,
        challenge_id: PostId,
    ) -> WorkspaceRepositoryResult<Option<EphemeralBinding>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.bindings.get(&(ip, challenge_id)).copied())
    }

    async fn insert_ephemeral(
        &self,
        workspace: &Workspace,
        binding: &EphemeralBinding,
        intent: &LifecycleIntent,
    ) -> WorkspaceRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.take_injected_failure()?;
        let binding_key = (binding.ip, binding.challenge_id);
        if state.bindings.contains_key(&binding_key) {
            return Err(WorkspaceRepositoryError::DuplicateBinding {
                ip: binding.ip,
                challenge_id: binding.challenge_id,
            });
        }
        state.ensure_no_live_duplicate(workspace)?;
        let entry = state.encode_entry(intent, workspace.last_state_update())?;

        state.rows.insert(workspace.id(), workspace.clone());
        state.bindings.insert(binding_key, *binding);
        state.push_entry(entry);
        Ok(())
    }
}

#[async_trait]
impl LifecycleOutbox for InMemoryWorkspaceStore {
    async fn pending(&self, limit: usize) -> OutboxResult<Vec<OutboxEntry>> {
        let state = self.state.read().map_err(outbox_lock_error)?;
        Ok(state
            .outbox
            .iter()
            .filter(|stored| stored.delivered_at.is_none())
            .take(limit)
            .map(|stored| stored.entry.clone())
            .collect())
    }

    async fn mark_delivered(&self, id: i64, delivered_at: DateTime<Utc>) -> OutboxResult<()> {
        let mut state = self.state.write().map_err(outbox_lock_error)?;
        if let Some(stored) = state.outbox.iter_mut().find(|stored| stored.entry.id == id) {
            stored.delivered_at.get_or_insert(delivered_at);
        }
        Ok(())
    }

    async fn prune_delivered(&self, older_than: DateTime<Utc>) -> OutboxResult<usize> {
        let mut state = self.state.write().map_err(outbox_lock_error)?;
        let before = state.outbox.len();
        state
            .outbox
            .retain(|stored| !stored.delivered_at.is_some_and(|at| at < older_than));
        Ok(before - state.outbox.len())
    }
}
