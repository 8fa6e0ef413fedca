//! In-memory template repository for tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::workspace::domain::UserId;
use crate::workspace_config::{
    domain::{PersistedTemplateData, TemplateId, TemplateRef, WorkspaceTemplate},
    ports::{
        WorkspaceConfigRepository, WorkspaceConfigRepositoryError,
        WorkspaceConfigRepositoryResult,
    },
};

/// Thread-safe in-memory template repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkspaceConfigRepository {
    state: Arc<RwLock<InMemoryTemplateState>>,
}

#[derive(Debug, Default)]
struct InMemoryTemplateState {
    revisions: BTreeMap<(TemplateId, i64), WorkspaceTemplate>,
    fail_counters: bool,
}

fn lock_error(err: impl ToString) -> WorkspaceConfigRepositoryError {
    WorkspaceConfigRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

impl InMemoryWorkspaceConfigRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes counter increments fail, to exercise best-effort callers.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceConfigRepositoryError::Persistence`] when the state
    /// lock is poisoned.
    pub fn fail_counter_updates(&self, fail: bool) -> WorkspaceConfigRepositoryResult<()> {
        self.state.write().map_err(lock_error)?.fail_counters = fail;
        Ok(())
    }

    fn bump(
        &self,
        template_ref: TemplateRef,
        apply: impl FnOnce(&mut PersistedTemplateData),
    ) -> WorkspaceConfigRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.fail_counters {
            return Err(WorkspaceConfigRepositoryError::persistence(
                std::io::Error::other("counter updates disabled"),
            ));
        }
        let key = (template_ref.id, template_ref.revision);
        let current = state
            .revisions
            .get(&key)
            .ok_or(WorkspaceConfigRepositoryError::NotFound(template_ref))?;
        let mut data = to_persisted(current);
        apply(&mut data);
        state
            .revisions
            .insert(key, WorkspaceTemplate::from_persisted(data));
        Ok(())
    }
}

fn to_persisted(template: &WorkspaceTemplate) -> PersistedTemplateData {
    PersistedTemplateData {
        id: template.id(),
        revision: template.revision(),
        author_id: template.author_id(),
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

#[async_trait]
impl WorkspaceConfigRepository for InMemoryWorkspaceConfigRepository {
    async fn insert(&self, template: &WorkspaceTemplate) -> WorkspaceConfigRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let key = (template.id(), template.revision());
        if state.revisions.contains_key(&key) {
            return Err(WorkspaceConfigRepositoryError::DuplicateRevision(
                template.template_ref(),
            ));
        }
        state.revisions.insert(key, template.clone());
        Ok(())
    }

    async fn find_revision(
        &self,
        template_ref: TemplateRef,
    ) -> WorkspaceConfigRepositoryResult<Option<WorkspaceTemplate>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .revisions
            .get(&(template_ref.id, template_ref.revision))
            .cloned())
    }

    async fn find_latest_by_author(
        &self,
        id: TemplateId,
        author_id: UserId,
    ) -> WorkspaceConfigRepositoryResult<Option<WorkspaceTemplate>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .revisions
            .values()
            .filter(|template| template.id() == id && template.author_id() == author_id)
            .max_by_key(|template| template.revision())
            .cloned())
    }

    async fn list_revisions(
        &self,
        id: TemplateId,
    ) -> WorkspaceConfigRepositoryResult<Vec<WorkspaceTemplate>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .revisions
            .values()
            .filter(|template| template.id() == id)
            .cloned()
            .collect())
    }

    async fn increment_uses(
        &self,
        template_ref: TemplateRef,
    ) -> WorkspaceConfigRepositoryResult<()> {
        self.bump(template_ref, |data| data.uses += 1)
    }

    async fn increment_completions(
        &self,
        template_ref: TemplateRef,
    ) -> WorkspaceConfigRepositoryResult<()> {
        self.bump(template_ref, |data| data.completions += 1)
    }
}
