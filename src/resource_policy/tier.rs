//! Subscription tiers and their resource ceilings.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Subscription tier of a workspace owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserTier {
    /// Free accounts.
    Basic,
    /// Paying accounts.
    Premium,
}

impl UserTier {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Premium => "premium",
        }
    }

    /// Returns the hard resource ceilings for this tier.
    #[must_use]
    pub const fn ceilings(self) -> ResourceCeilings {
        match self {
            Self::Basic => ResourceCeilings::BASIC,
            Self::Premium => ResourceCeilings::PREMIUM,
        }
    }
}

impl fmt::Display for UserTier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned while parsing a tier from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown user tier: {0}")]
pub struct ParseUserTierError(pub String);

impl TryFrom<&str> for UserTier {
    type Error = ParseUserTierError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" | "free" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            _ => Err(ParseUserTierError(value.to_owned())),
        }
    }
}

/// Upper bounds a tier may allocate to a single workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceCeilings {
    /// Maximum CPU cores.
    pub cpu: u32,
    /// Maximum memory in GiB.
    pub mem: u32,
    /// Maximum disk in GiB.
    pub disk: u32,
}

impl ResourceCeilings {
    /// Ceilings for basic accounts.
    pub const BASIC: Self = Self {
        cpu: 2,
        mem: 3,
        disk: 15,
    };

    /// Ceilings for premium accounts.
    pub const PREMIUM: Self = Self {
        cpu: 6,
        mem: 8,
        disk: 50,
    };
}
