//! Tunables consumed by the pull-through services.

use std::time::Duration;

/// Default editor release download base.
pub const DEFAULT_RELEASE_BASE: &str = "https://github.com/coder/code-server/releases/download";

/// Default Open VSX API base.
pub const DEFAULT_EXTENSION_REGISTRY: &str = "https://open-vsx.org";

/// User agent sent to every upstream.
pub const DEFAULT_USER_AGENT: &str = "gigo-code-server-cache; contact@gigo.dev";

/// Settings shared by the editor binary and extension caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullThroughSettings {
    /// Base URL of editor release archives.
    pub release_base: String,
    /// Base URL of the extension registry API.
    pub extension_registry: String,
    /// User agent for upstream requests.
    pub user_agent: String,
    /// Lifetime of a negotiated extension version.
    pub negotiation_ttl: Duration,
    /// Maximum number of versions inspected during negotiation.
    pub negotiation_candidates: usize,
}

impl Default for PullThroughSettings {
    fn default() -> Self {
        Self {
            release_base: DEFAULT_RELEASE_BASE.to_owned(),
            extension_registry: DEFAULT_EXTENSION_REGISTRY.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            negotiation_ttl: Duration::from_secs(24 * 60 * 60),
            negotiation_candidates: 10,
        }
    }
}
