//! Shared world state for workspace lifecycle BDD scenarios.

use gigo_workspaces::vcs::ports::RepoInfo;
use gigo_workspaces::workspace::{
    domain::{Caller, CodeSourceRef},
    services::{EphemeralClaim, WorkspaceHandle},
};
use rstest::fixture;

use crate::test_helpers::InMemoryStack;

/// Scenario world for workspace lifecycle behaviour tests.
pub struct LifecycleWorld {
    pub stack: InMemoryStack,
    pub caller: Option<Caller>,
    pub attempt: Option<(CodeSourceRef, RepoInfo)>,
    pub last_handle: Option<WorkspaceHandle>,
    pub last_claim: Option<EphemeralClaim>,
}

impl LifecycleWorld {
    /// Creates a world over a fresh in-memory stack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: InMemoryStack::new(),
            caller: None,
            attempt: None,
            last_handle: None,
            last_claim: None,
        }
    }
}

impl Default for LifecycleWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> LifecycleWorld {
    LifecycleWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
