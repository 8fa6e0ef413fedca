//! Authenticated identity on whose behalf lifecycle operations run.

use super::UserId;
use crate::resource_policy::UserTier;
use serde::{Deserialize, Serialize};

/// Already-authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    id: UserId,
    user_name: String,
    email: String,
    tier: UserTier,
    service_key: Option<String>,
}

impl Caller {
    /// Creates a caller identity.
    #[must_use]
    pub fn new(
        id: UserId,
        user_name: impl Into<String>,
        email: impl Into<String>,
        tier: UserTier,
    ) -> Self {
        Self {
            id,
            user_name: user_name.into(),
            email: email.into(),
            tier,
            service_key: None,
        }
    }

    /// Attaches the session's VCS service password.
    #[must_use]
    pub fn with_service_key(mut self, service_key: impl Into<String>) -> Self {
        self.service_key = Some(service_key.into());
        self
    }

    /// Returns the user identifier.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Returns the user name.
    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Returns the email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the subscription tier.
    #[must_use]
    pub const fn tier(&self) -> UserTier {
        self.tier
    }

    /// Returns the VCS service password, when the session carries one.
    #[must_use]
    pub fn service_key(&self) -> Option<&str> {
        self.service_key.as_deref()
    }
}
