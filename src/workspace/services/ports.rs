//! Collaborator bundle shared by the workspace services.

use crate::pull_through::ports::ObjectStore;
use crate::status::StatusPublisher;
use crate::vcs::ports::VcsClient;
use crate::workspace::ports::{
    CodeSourceRepository, IdGenerator, LifecycleOutbox, MessageBus, UserDirectory,
    WorkspaceRepository,
};
use crate::workspace_config::ports::WorkspaceConfigRepository;
use std::sync::Arc;

/// Port implementations the workspace services are wired with.
///
/// `workspaces` and `outbox` must share one transactional store so that row
/// mutations and their outbox entries commit together.
#[derive(Clone)]
pub struct WorkspacePorts {
    /// Workspace rows, agents and ephemeral bindings.
    pub workspaces: Arc<dyn WorkspaceRepository>,
    /// Undelivered lifecycle intents.
    pub outbox: Arc<dyn LifecycleOutbox>,
    /// Bus the follower pool consumes.
    pub bus: Arc<dyn MessageBus>,
    /// Posts, attempts and bytes.
    pub code_sources: Arc<dyn CodeSourceRepository>,
    /// User accounts.
    pub users: Arc<dyn UserDirectory>,
    /// Git server.
    pub vcs: Arc<dyn VcsClient>,
    /// Workspace config templates.
    pub templates: Arc<dyn WorkspaceConfigRepository>,
    /// Object store holding thumbnails.
    pub objects: Arc<dyn ObjectStore>,
    /// Identifier source for workspaces, attempts and users.
    pub ids: Arc<dyn IdGenerator>,
    /// Status fan-out.
    pub status: Arc<dyn StatusPublisher>,
}
