//! In-memory user directory.

use crate::resource_policy::UserTier;
use crate::workspace::{
    domain::{Caller, UserId},
    ports::{UserDirectory, UserDirectoryError, UserDirectoryResult, UserRecord},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

fn lock_error(err: impl ToString) -> UserDirectoryError {
    UserDirectoryError::unavailable(std::io::Error::other(err.to_string()))
}

/// Thread-safe in-memory user directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    state: Arc<RwLock<UserState>>,
}

#[derive(Debug, Default)]
struct UserState {
    users: HashMap<UserId, UserRecord>,
    fail_creates: bool,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    ///
    /// # Errors
    ///
    /// Returns [`UserDirectoryError::Unavailable`] when the state lock is
    /// poisoned.
    pub fn insert(&self, user: UserRecord) -> UserDirectoryResult<()> {
        self.state.write().map_err(lock_error)?.users.insert(user.id, user);
        Ok(())
    }

    /// Returns every stored user id.
    ///
    /// # Errors
    ///
    /// Returns [`UserDirectoryError::Unavailable`] when the state lock is
    /// poisoned.
    pub fn user_ids(&self) -> UserDirectoryResult<Vec<UserId>> {
        let state = self.state.read().map_err(lock_error)?;
        let mut ids: Vec<UserId> = state.users.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Makes ephemeral account creation fail.
    ///
    /// # Errors
    ///
    /// Returns [`UserDirectoryError::Unavailable`] when the state lock is
    /// poisoned.
    pub fn set_fail_creates(&self, fail: bool) -> UserDirectoryResult<()> {
        self.state.write().map_err(lock_error)?.fail_creates = fail;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, id: UserId) -> UserDirectoryResult<Option<UserRecord>> {
        Ok(self.state.read().map_err(lock_error)?.users.get(&id).cloned())
    }

    async fn create_ephemeral_user(&self, id: UserId) -> UserDirectoryResult<Caller> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.fail_creates {
            return Err(UserDirectoryError::unavailable(std::io::Error::other(
                "account service rejected the request",
            )));
        }
        let record = UserRecord {
            id,
            user_name: format!("guest-{id}"),
            email: format!("{id}@ephemeral.gigo.dev"),
            tier: UserTier::Basic,
            workspace_settings: Some(serde_json::json!({})),
            is_ephemeral: true,
        };
        let caller = Caller::new(id, &record.user_name, &record.email, record.tier)
            .with_service_key(Uuid::new_v4().simple().to_string());
        state.users.insert(id, record);
        Ok(caller)
    }

    async fn delete_users(&self, ids: &[UserId]) -> UserDirectoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        for id in ids {
            state.users.remove(id);
        }
        Ok(())
    }
}
