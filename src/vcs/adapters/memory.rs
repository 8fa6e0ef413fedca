//! In-memory VCS server for tests and local development.

use crate::vcs::ports::{
    AccessLevel, RepoInfo, RepoPath, VcsClient, VcsCredentials, VcsError, VcsResult,
};
use crate::workspace::domain::RepoId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Observable side effect recorded by [`InMemoryVcs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsEvent {
    /// A collaborator grant.
    CollaboratorAdded {
        /// Target repository.
        repo: RepoPath,
        /// Grantee.
        user: String,
        /// Granted access.
        access: AccessLevel,
    },
    /// A collaborator revocation.
    CollaboratorRemoved {
        /// Target repository.
        repo: RepoPath,
        /// Revoked user.
        user: String,
    },
    /// A fork.
    Forked {
        /// Source repository.
        source: RepoPath,
        /// Created repository.
        target: RepoPath,
    },
    /// A deletion.
    Deleted(RepoPath),
}

/// Thread-safe in-memory VCS server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVcs {
    state: Arc<RwLock<InMemoryVcsState>>,
}

#[derive(Debug, Default)]
struct InMemoryVcsState {
    repos: HashMap<RepoPath, StoredRepo>,
    last_id: i64,
    events: Vec<VcsEvent>,
    fail_forks: bool,
}

#[derive(Debug, Clone)]
struct StoredRepo {
    id: RepoId,
    files: HashMap<(String, String), Vec<u8>>,
    collaborators: HashMap<String, AccessLevel>,
}

fn lock_error(err: impl ToString) -> VcsError {
    VcsError::unavailable(std::io::Error::other(err.to_string()))
}

impl InMemoryVcs {
    /// Creates an empty server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty repository.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::Rejected`] when the path is taken.
    pub fn create_repo(&self, path: RepoPath) -> VcsResult<RepoInfo> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.repos.contains_key(&path) {
            return Err(VcsError::Rejected {
                operation: "create",
                repo: path,
                reason: "repository already exists".to_owned(),
            });
        }
        state.last_id += 1;
        let id = RepoId::new(state.last_id);
        state.repos.insert(
            path.clone(),
            StoredRepo {
                id,
                files: HashMap::new(),
                collaborators: HashMap::new(),
            },
        );
        Ok(RepoInfo { id, path })
    }

    /// Writes a file at `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::RepoNotFound`] when the repository is missing.
    pub fn put_file(
        &self,
        repo: &RepoPath,
        reference: &str,
        file_path: &str,
        contents: impl Into<Vec<u8>>,
    ) -> VcsResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let stored = state
            .repos
            .get_mut(repo)
            .ok_or_else(|| VcsError::RepoNotFound(repo.clone()))?;
        stored
            .files
            .insert((reference.to_owned(), file_path.to_owned()), contents.into());
        Ok(())
    }

    /// Makes subsequent forks fail.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::Unavailable`] when the state lock is poisoned.
    pub fn set_fail_forks(&self, fail: bool) -> VcsResult<()> {
        self.state.write().map_err(lock_error)?.fail_forks = fail;
        Ok(())
    }

    /// Returns every recorded side effect in order.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::Unavailable`] when the state lock is poisoned.
    pub fn events(&self) -> VcsResult<Vec<VcsEvent>> {
        Ok(self.state.read().map_err(lock_error)?.events.clone())
    }

    /// Returns whether a repository exists.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::Unavailable`] when the state lock is poisoned.
    pub fn repo_exists(&self, repo: &RepoPath) -> VcsResult<bool> {
        Ok(self.state.read().map_err(lock_error)?.repos.contains_key(repo))
    }

    /// Returns the current collaborators of a repository.
    ///
    /// # Errors
    ///
    /// Returns [`VcsError::RepoNotFound`] when the repository is missing.
    pub fn collaborators(&self, repo: &RepoPath) -> VcsResult<HashMap<String, AccessLevel>> {
        let state = self.state.read().map_err(lock_error)?;
        state
            .repos
            .get(repo)
            .map(|stored| stored.collaborators.clone())
            .ok_or_else(|| VcsError::RepoNotFound(repo.clone()))
    }
}

#[async_trait]
impl VcsClient for InMemoryVcs {
    async fn find_repo(&self, repo_id: RepoId) -> VcsResult<Option<RepoInfo>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .repos
            .iter()
            .find(|(_, stored)| stored.id == repo_id)
            .map(|(path, stored)| RepoInfo {
                id: stored.id,
                path: path.clone(),
            }))
    }

    async fn read_file(
        &self,
        repo: &RepoPath,
        reference: &str,
        file_path: &str,
    ) -> VcsResult<Option<Vec<u8>>> {
        let state = self.state.read().map_err(lock_error)?;
        let stored = state
            .repos
            .get(repo)
            .ok_or_else(|| VcsError::RepoNotFound(repo.clone()))?;
        Ok(stored
            .files
            .get(&(reference.to_owned(), file_path.to_owned()))
            .cloned())
    }

    async fn add_collaborator(
        &self,
        repo: &RepoPath,
        user: &str,
        access: AccessLevel,
    ) -> VcsResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let stored = state
            .repos
            .get_mut(repo)
            .ok_or_else(|| VcsError::RepoNotFound(repo.clone()))?;
        stored.collaborators.insert(user.to_owned(), access);
        state.events.push(VcsEvent::CollaboratorAdded {
            repo: repo.clone(),
            user: user.to_owned(),
            access,
        });
        Ok(())
    }

    async fn remove_collaborator(&self, repo: &RepoPath, user: &str) -> VcsResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        let stored = state
            .repos
            .get_mut(repo)
            .ok_or_else(|| VcsError::RepoNotFound(repo.clone()))?;
        stored.collaborators.remove(user);
        state.events.push(VcsEvent::CollaboratorRemoved {
            repo: repo.clone(),
            user: user.to_owned(),
        });
        Ok(())
    }

    async fn fork_as(
        &self,
        credentials: &VcsCredentials,
        source: &RepoPath,
        new_name: &str,
    ) -> VcsResult<RepoInfo> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.fail_forks {
            return Err(VcsError::Rejected {
                operation: "fork",
                repo: source.clone(),
                reason: "forking is disabled".to_owned(),
            });
        }

        let stored = state
            .repos
            .get(source)
            .ok_or_else(|| VcsError::RepoNotFound(source.clone()))?;
        let permitted = source.owner == credentials.login
            || stored.collaborators.contains_key(&credentials.login);
        if !permitted || credentials.password.is_empty() {
            return Err(VcsError::Rejected {
                operation: "fork",
                repo: source.clone(),
                reason: format!("{} has no read access", credentials.login),
            });
        }

        let target = RepoPath::new(credentials.login.clone(), new_name);
        if state.repos.contains_key(&target) {
            return Err(VcsError::Rejected {
                operation: "fork",
                repo: target,
                reason: "repository already exists".to_owned(),
            });
        }

        let files = stored.files.clone();
        state.last_id += 1;
        let id = RepoId::new(state.last_id);
        state.repos.insert(
            target.clone(),
            StoredRepo {
                id,
                files,
                collaborators: HashMap::new(),
            },
        );
        state.events.push(VcsEvent::Forked {
            source: source.clone(),
            target: target.clone(),
        });
        Ok(RepoInfo { id, path: target })
    }

    async fn delete_repo(&self, repo: &RepoPath) -> VcsResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state
            .repos
            .remove(repo)
            .ok_or_else(|| VcsError::RepoNotFound(repo.clone()))?;
        state.events.push(VcsEvent::Deleted(repo.clone()));
        Ok(())
    }
}
