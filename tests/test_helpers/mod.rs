//! Shared row builders and clocks for integration tests.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use gigo_workspaces::pull_through::adapters::memory::InMemoryObjectStore;
use gigo_workspaces::resource_policy::{ResourceSpec, UserTier};
use gigo_workspaces::status::StatusHub;
use gigo_workspaces::vcs::adapters::InMemoryVcs;
use gigo_workspaces::vcs::ports::{RepoInfo, RepoPath};
use gigo_workspaces::workspace::{
    adapters::memory::{
        InMemoryCodeSources, InMemoryMessageBus, InMemoryUserDirectory, InMemoryWorkspaceStore,
        SequentialIdGenerator,
    },
    domain::{
        Caller, CodeSourceId, CodeSourceRef, CodeSourceType, CreateWorkspaceMessage,
        DestroyWorkspaceMessage, LifecycleIntent, NewWorkspaceData, PostId, PostRecord,
        PostVisibility, RepoId, UserId, Workspace, WorkspaceId,
    },
    ports::UserRecord,
    services::{
        AttemptForkService, EphemeralService, ExpirationReaper, LifecycleSettings,
        WorkspaceLifecycleService, WorkspacePorts,
    },
};
use gigo_workspaces::workspace_config::{
    adapters::memory::InMemoryWorkspaceConfigRepository,
    domain::{TemplateRef, WORKSPACE_CONFIG_PATH},
    services::WorkspaceConfigService,
};
use mockable::Clock;

/// Workspace config committed to every seeded challenge repository.
pub const CONFIG_YAML: &str = "\
version: 0.1
base_container: gigo/base:1
working_directory: /workspace
resources: {cpu: 2, mem: 3, disk: 10}
";

/// Commit every seeded repository carries its config at.
pub const COMMIT: &str = "main";

/// Clone URL handed to followers.
pub const ACCESS_URL: &str = "https://ws.gigo.test";

/// Clock that only moves when a test advances it.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock fixed at 2026-03-01 09:00 UTC.
    pub fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid start instant");
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builds a fresh `starting` row for a post code source.
pub fn workspace_row(id: i64, owner: i64, commit: &str, clock: &ManualClock) -> Workspace {
    Workspace::new(
        NewWorkspaceData {
            id: WorkspaceId::new(id),
            owner_id: UserId::new(owner),
            repo_id: RepoId::new(7),
            commit: commit.to_owned(),
            code_source: CodeSourceRef::new(CodeSourceId::new(1), CodeSourceType::Post),
            workspace_settings: serde_json::json!({"theme": "dark"}),
            over_allocated: None,
            resources: ResourceSpec::new(2, 4, 10),
            container: "gigo/base:1".to_owned(),
            is_ephemeral: false,
            expiration: clock.utc() + Duration::minutes(15),
        },
        clock,
    )
}

/// The create intent a lifecycle service would commit with `workspace`.
pub fn create_intent(workspace: &Workspace) -> LifecycleIntent {
    let resources = workspace.resources();
    LifecycleIntent::Create(CreateWorkspaceMessage {
        workspace_id: workspace.id(),
        owner_id: workspace.owner_id(),
        owner_email: "learner@gigo.test".to_owned(),
        owner_name: "learner".to_owned(),
        cpu: resources.cpu,
        mem: resources.mem,
        disk: resources.disk,
        container: workspace.container().to_owned(),
        access_url: "https://ws.gigo.test".to_owned(),
    })
}

/// The destroy intent for `workspace`.
pub const fn destroy_intent(workspace: &Workspace) -> LifecycleIntent {
    LifecycleIntent::Destroy(DestroyWorkspaceMessage {
        id: workspace.id(),
        owner_id: workspace.owner_id(),
    })
}

/// Template service type wired over the in-memory stack.
pub type TemplateService =
    WorkspaceConfigService<InMemoryWorkspaceConfigRepository, SequentialIdGenerator, ManualClock>;

/// Every in-memory adapter wired into one set of workspace ports.
pub struct InMemoryStack {
    pub clock: Arc<ManualClock>,
    pub store: Arc<InMemoryWorkspaceStore>,
    pub bus: Arc<InMemoryMessageBus>,
    pub code_sources: Arc<InMemoryCodeSources>,
    pub users: Arc<InMemoryUserDirectory>,
    pub vcs: Arc<InMemoryVcs>,
    pub templates: Arc<InMemoryWorkspaceConfigRepository>,
    pub objects: Arc<InMemoryObjectStore>,
    pub ids: Arc<SequentialIdGenerator>,
    pub status: StatusHub,
    pub ports: WorkspacePorts,
}

impl InMemoryStack {
    /// Wires a fresh stack whose identifiers start at 1000.
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(InMemoryWorkspaceStore::new());
        let bus = Arc::new(InMemoryMessageBus::new());
        let code_sources = Arc::new(InMemoryCodeSources::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let vcs = Arc::new(InMemoryVcs::new());
        let templates = Arc::new(InMemoryWorkspaceConfigRepository::new());
        let objects = Arc::new(InMemoryObjectStore::new());
        let ids = Arc::new(SequentialIdGenerator::starting_at(1000));
        let status = StatusHub::new(64);
        let ports = WorkspacePorts {
            workspaces: Arc::clone(&store) as _,
            outbox: Arc::clone(&store) as _,
            bus: Arc::clone(&bus) as _,
            code_sources: Arc::clone(&code_sources) as _,
            users: Arc::clone(&users) as _,
            vcs: Arc::clone(&vcs) as _,
            templates: Arc::clone(&templates) as _,
            objects: Arc::clone(&objects) as _,
            ids: Arc::clone(&ids) as _,
            status: Arc::new(status.clone()),
        };
        Self {
            clock,
            store,
            bus,
            code_sources,
            users,
            vcs,
            templates,
            objects,
            ids,
            status,
            ports,
        }
    }

    pub fn lifecycle(&self) -> WorkspaceLifecycleService<ManualClock> {
        WorkspaceLifecycleService::new(
            self.ports.clone(),
            LifecycleSettings::default(),
            Arc::clone(&self.clock),
        )
    }

    pub fn attempts(&self) -> AttemptForkService<ManualClock> {
        AttemptForkService::new(self.ports.clone(), Arc::clone(&self.clock))
    }

    pub fn ephemeral(&self) -> EphemeralService<ManualClock> {
        EphemeralService::new(self.lifecycle(), self.attempts(), Arc::clone(&self.clock))
    }

    pub fn reaper(&self) -> ExpirationReaper<ManualClock> {
        ExpirationReaper::new(self.lifecycle(), Arc::clone(&self.clock))
    }

    pub fn template_service(&self) -> TemplateService {
        WorkspaceConfigService::new(
            Arc::clone(&self.templates),
            Arc::clone(&self.ids),
            Arc::clone(&self.clock),
        )
    }

    /// Registers a learner and returns the caller the API layer would build.
    pub fn learner(&self, id: i64, tier: UserTier) -> Caller {
        let user_id = UserId::new(id);
        let user_name = format!("learner-{id}");
        let email = format!("{id}@gigo.test");
        self.users
            .insert(UserRecord {
                id: user_id,
                user_name: user_name.clone(),
                email: email.clone(),
                tier,
                workspace_settings: Some(serde_json::json!({"theme": "dark"})),
                is_ephemeral: false,
            })
            .expect("user insert");
        Caller::new(user_id, user_name, email, tier).with_service_key("vcs-password")
    }

    /// Publishes a public challenge whose repository carries [`CONFIG_YAML`].
    pub fn challenge(&self, post_id: i64, author: i64, template: Option<TemplateRef>) -> RepoInfo {
        let post = PostId::new(post_id);
        let author_id = UserId::new(author);
        let repo = self
            .vcs
            .create_repo(RepoPath::owned_by(author_id, post))
            .expect("repo creation");
        self.vcs
            .put_file(
                &repo.path,
                COMMIT,
                WORKSPACE_CONFIG_PATH,
                CONFIG_YAML.as_bytes().to_vec(),
            )
            .expect("config upload");
        self.code_sources
            .insert_post(
                PostRecord {
                    id: post,
                    title: format!("Challenge {post_id}"),
                    description: "Solve it".to_owned(),
                    author_id,
                    visibility: PostVisibility::Public,
                    template,
                },
                repo.id,
                Some(serde_json::json!({"theme": "light"})),
            )
            .expect("post insert");
        repo
    }
}

impl Default for InMemoryStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Code source reference for a post.
pub const fn post_source(post_id: i64) -> CodeSourceRef {
    CodeSourceRef::new(CodeSourceId::new(post_id), CodeSourceType::Post)
}
