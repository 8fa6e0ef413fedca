//! In-memory posts, attempts and bytes.

use crate::workspace::{
    domain::{
        Attempt, AttemptId, AttemptRecord, CodeSourceId, CodeSourceRef, CodeSourceType, PostId,
        PostRecord, RepoId, UserId,
    },
    ports::{
        CodeSourceLink, CodeSourceRepository, CodeSourceRepositoryError,
        CodeSourceRepositoryResult,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

fn lock_error(err: impl ToString) -> CodeSourceRepositoryError {
    CodeSourceRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

/// Thread-safe in-memory code source rows.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCodeSources {
    state: Arc<RwLock<CodeSourceState>>,
}

#[derive(Debug, Default)]
struct CodeSourceState {
    posts: HashMap<PostId, StoredPost>,
    attempts: HashMap<AttemptId, StoredAttempt>,
    bytes: HashMap<CodeSourceId, StoredByte>,
    recommendations: HashMap<(UserId, PostId), bool>,
    fail_record_attempt: bool,
}

#[derive(Debug, Clone)]
struct StoredPost {
    record: PostRecord,
    repo_id: RepoId,
    workspace_settings: Option<serde_json::Value>,
    attempts: i64,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct StoredAttempt {
    attempt: Attempt,
    closed: bool,
    workspace_settings: Option<serde_json::Value>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct StoredByte {
    owner_id: UserId,
    name: String,
    updated_at: Option<DateTime<Utc>>,
}

impl StoredAttempt {
    const fn record(&self) -> AttemptRecord {
        AttemptRecord {
            id: self.attempt.id,
            post_id: self.attempt.post_id,
            author_id: self.attempt.author_id,
            closed: self.closed,
        }
    }
}

impl InMemoryCodeSources {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a challenge post backed by `repo_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CodeSourceRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn insert_post(
        &self,
        record: PostRecord,
        repo_id: RepoId,
        workspace_settings: Option<serde_json::Value>,
    ) -> CodeSourceRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.posts.insert(
            record.id,
            StoredPost {
                record,
                repo_id,
                workspace_settings,
                attempts: 0,
                updated_at: None,
            },
        );
        Ok(())
    }

    /// Adds a byte scratch owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CodeSourceRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn insert_byte(
        &self,
        id: CodeSourceId,
        owner_id: UserId,
        name: impl Into<String>,
    ) -> CodeSourceRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.bytes.insert(
            id,
            StoredByte {
                owner_id,
                name: name.into(),
                updated_at: None,
            },
        );
        Ok(())
    }

    /// Marks an attempt as published.
    ///
    /// # Errors
    ///
    /// Returns [`CodeSourceRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn close_attempt(&self, id: AttemptId) -> CodeSourceRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if let Some(stored) = state.attempts.get_mut(&id) {
            stored.closed = true;
        }
        Ok(())
    }

    /// Records an unaccepted recommendation of `post_id` to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CodeSourceRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn recommend(&self, user_id: UserId, post_id: PostId) -> CodeSourceRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.recommendations.insert((user_id, post_id), false);
        Ok(())
    }

    /// Returns whether the recommendation was accepted, if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`CodeSourceRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn recommendation_accepted(
        &self,
        user_id: UserId,
        post_id: PostId,
    ) -> CodeSourceRepositoryResult<Option<bool>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.recommendations.get(&(user_id, post_id)).copied())
    }

    /// Returns the post's attempt counter.
    ///
    /// # Errors
    ///
    /// Returns [`CodeSourceRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn post_attempts(&self, post_id: PostId) -> CodeSourceRepositoryResult<Option<i64>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.posts.get(&post_id).map(|stored| stored.attempts))
    }

    /// Returns the stored attempt.
    ///
    /// # Errors
    ///
    /// Returns [`CodeSourceRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn attempt(&self, id: AttemptId) -> CodeSourceRepositoryResult<Option<Attempt>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.attempts.get(&id).map(|stored| stored.attempt.clone()))
    }

    /// Returns the last `updated_at` bump of a code source.
    ///
    /// # Errors
    ///
    /// Returns [`CodeSourceRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn updated_at(
        &self,
        code_source: CodeSourceRef,
    ) -> CodeSourceRepositoryResult<Option<DateTime<Utc>>> {
        let state = self.state.read().map_err(lock_error)?;
        let raw = code_source.id.into_inner();
        Ok(match code_source.kind {
            CodeSourceType::Post => state
                .posts
                .get(&PostId::new(raw))
                .and_then(|stored| stored.updated_at),
            CodeSourceType::Attempt => state
                .attempts
                .get(&AttemptId::new(raw))
                .and_then(|stored| stored.updated_at),
            CodeSourceType::Byte => state
                .bytes
                .get(&code_source.id)
                .and_then(|stored| stored.updated_at),
        })
    }

    /// Makes [`CodeSourceRepository::record_attempt`] fail.
    ///
    /// # Errors
    ///
    /// Returns [`CodeSourceRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn set_fail_record_attempt(&self, fail: bool) -> CodeSourceRepositoryResult<()> {
        self.state.write().map_err(lock_error)?.fail_record_attempt = fail;
        Ok(())
    }
}

#[async_trait]
impl CodeSourceRepository for InMemoryCodeSources {
    async fn find_link(
        &self,
        code_source: CodeSourceRef,
    ) -> CodeSourceRepositoryResult<Option<CodeSourceLink>> {
        let state = self.state.read().map_err(lock_error)?;
        let raw = code_source.id.into_inner();
        let link = match code_source.kind {
            CodeSourceType::Post => {
                state
                    .posts
                    .get(&PostId::new(raw))
                    .map(|stored| CodeSourceLink {
                        code_source,
                        owner_id: stored.record.author_id,
                        repo_id: stored.repo_id,
                        name: stored.record.title.clone(),
                        workspace_settings: stored.workspace_settings.clone(),
                        template: stored.record.template,
                    })
            }
            CodeSourceType::Attempt => {
                state
                    .attempts
                    .get(&AttemptId::new(raw))
                    .map(|stored| CodeSourceLink {
                        code_source,
                        owner_id: stored.attempt.author_id,
                        repo_id: stored.attempt.repo_id,
                        name: stored.attempt.title.clone(),
                        workspace_settings: stored.workspace_settings.clone(),
                        template: state
                            .posts
                            .get(&stored.attempt.post_id)
                            .and_then(|post| post.record.template),
                    })
            }
            CodeSourceType::Byte => state.bytes.get(&code_source.id).map(|stored| CodeSourceLink {
                code_source,
                owner_id: stored.owner_id,
                repo_id: RepoId::new(-1),
                name: stored.name.clone(),
                workspace_settings: None,
                template: None,
            }),
        };
        Ok(link)
    }

    async fn touch(
        &self,
        code_source: CodeSourceRef,
        at: DateTime<Utc>,
    ) -> CodeSourceRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let raw = code_source.id.into_inner();
        let slot = match code_source.kind {
            CodeSourceType::Post => state
                .posts
                .get_mut(&PostId::new(raw))
                .map(|stored| &mut stored.updated_at),
            CodeSourceType::Attempt => state
                .attempts
                .get_mut(&AttemptId::new(raw))
                .map(|stored| &mut stored.updated_at),
            CodeSourceType::Byte => state
                .bytes
                .get_mut(&code_source.id)
                .map(|stored| &mut stored.updated_at),
        };
        if let Some(updated_at) = slot {
            *updated_at = Some(at);
        }
        Ok(())
    }

    async fn find_post(&self, id: PostId) -> CodeSourceRepositoryResult<Option<PostRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.posts.get(&id).map(|stored| stored.record.clone()))
    }

    async fn find_attempt(
        &self,
        id: AttemptId,
    ) -> CodeSourceRepositoryResult<Option<AttemptRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.attempts.get(&id).map(StoredAttempt::record))
    }

    async fn find_existing_attempt(
        &self,
        author_id: UserId,
        post_id: PostId,
    ) -> CodeSourceRepositoryResult<Option<AttemptRecord>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .attempts
            .values()
            .filter(|stored| {
                stored.attempt.author_id == author_id && stored.attempt.post_id == post_id
            })
            .map(StoredAttempt::record)
            .min_by_key(|record| record.id))
    }

    async fn record_attempt(&self, attempt: &Attempt) -> CodeSourceRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.fail_record_attempt {
            return Err(CodeSourceRepositoryError::persistence(std::io::Error::other(
                "attempt insert rolled back",
            )));
        }
        let post = state.posts.get_mut(&attempt.post_id).ok_or_else(|| {
            CodeSourceRepositoryError::persistence(std::io::Error::other(format!(
                "post {} missing",
                attempt.post_id
            )))
        })?;
        post.attempts += 1;
        post.updated_at = Some(attempt.created_at);
        let workspace_settings = post.workspace_settings.clone();

        if let Some(accepted) = state
            .recommendations
            .get_mut(&(attempt.author_id, attempt.post_id))
        {
            *accepted = true;
        }
        state.attempts.insert(
            attempt.id,
            StoredAttempt {
                attempt: attempt.clone(),
                closed: false,
                workspace_settings,
                updated_at: Some(attempt.created_at),
            },
        );
        Ok(())
    }

    async fn discard_attempt(&self, attempt: &Attempt) -> CodeSourceRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.attempts.remove(&attempt.id).is_none() {
            return Ok(());
        }
        if let Some(post) = state.posts.get_mut(&attempt.post_id) {
            post.attempts = (post.attempts - 1).max(0);
        }
        if let Some(accepted) = state
            .recommendations
            .get_mut(&(attempt.author_id, attempt.post_id))
        {
            *accepted = false;
        }
        Ok(())
    }

    async fn delete_attempt(&self, id: AttemptId) -> CodeSourceRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.attempts.remove(&id);
        Ok(())
    }
}
