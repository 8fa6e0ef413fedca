//! Shared wiring for the workspace service tests.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;

use crate::pull_through::adapters::memory::InMemoryObjectStore;
use crate::resource_policy::UserTier;
use crate::status::StatusHub;
use crate::vcs::adapters::InMemoryVcs;
use crate::vcs::ports::{RepoInfo, RepoPath, VcsClient};
use crate::workspace::{
    adapters::memory::{
        InMemoryCodeSources, InMemoryMessageBus, InMemoryUserDirectory, InMemoryWorkspaceStore,
        SequentialIdGenerator,
    },
    domain::{
        AttemptId, Caller, CodeSourceId, CodeSourceRef, CodeSourceType, PostId, PostRecord,
        PostVisibility, UserId,
    },
    ports::UserRecord,
    services::{
        AttemptForkService, EphemeralService, ExpirationReaper, LifecycleSettings,
        StartAttemptOutcome, StartAttemptRequest, WorkspaceLifecycleService, WorkspacePorts,
    },
};
use crate::workspace_config::{
    adapters::memory::InMemoryWorkspaceConfigRepository,
    domain::{TemplateRef, WORKSPACE_CONFIG_PATH},
};

pub(super) const CONFIG_YAML: &str = "\
version: 0.1
base_container: img:1
working_directory: /w
resources: {cpu: 1, mem: 2, disk: 5}
";

pub(super) const COMMIT: &str = "main";
pub(super) const ACCESS_URL: &str = "https://ws.gigo.test";

/// Clock that only moves when told to.
#[derive(Debug)]
pub(super) struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub(super) fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for TestClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(super) struct Harness {
    pub clock: Arc<TestClock>,
    pub store: Arc<InMemoryWorkspaceStore>,
    pub bus: Arc<InMemoryMessageBus>,
    pub code_sources: Arc<InMemoryCodeSources>,
    pub users: Arc<InMemoryUserDirectory>,
    pub vcs: Arc<InMemoryVcs>,
    pub templates: Arc<InMemoryWorkspaceConfigRepository>,
    pub objects: Arc<InMemoryObjectStore>,
    pub status: StatusHub,
    pub ports: WorkspacePorts,
}

impl Harness {
    pub(super) fn new() -> Self {
        let vcs = Arc::new(InMemoryVcs::new());
        Self::wire(Arc::clone(&vcs), vcs)
    }

    /// Wires the services against `client` while keeping the in-memory VCS
    /// available for seeding.
    pub(super) fn with_vcs_client(client: Arc<dyn VcsClient>) -> Self {
        Self::wire(Arc::new(InMemoryVcs::new()), client)
    }

    /// Wires the services against a client layered over the seeded
    /// in-memory VCS.
    pub(super) fn wrapping_vcs(wrap: impl FnOnce(Arc<InMemoryVcs>) -> Arc<dyn VcsClient>) -> Self {
        let vcs = Arc::new(InMemoryVcs::new());
        let client = wrap(Arc::clone(&vcs));
        Self::wire(vcs, client)
    }

    fn wire(vcs: Arc<InMemoryVcs>, client: Arc<dyn VcsClient>) -> Self {
        let clock = Arc::new(TestClock::starting_at(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
                .single()
                .expect("valid start instant"),
        ));
        let store = Arc::new(InMemoryWorkspaceStore::new());
        let bus = Arc::new(InMemoryMessageBus::new());
        let code_sources = Arc::new(InMemoryCodeSources::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let templates = Arc::new(InMemoryWorkspaceConfigRepository::new());
        let objects = Arc::new(InMemoryObjectStore::new());
        let status = StatusHub::new(16);
        let ports = WorkspacePorts {
            workspaces: Arc::clone(&store) as _,
            outbox: Arc::clone(&store) as _,
            bus: Arc::clone(&bus) as _,
            code_sources: Arc::clone(&code_sources) as _,
            users: Arc::clone(&users) as _,
            vcs: client,
            templates: Arc::clone(&templates) as _,
            objects: Arc::clone(&objects) as _,
            ids: Arc::new(SequentialIdGenerator::starting_at(1000)),
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
            status,
            ports,
        }
    }

    pub(super) fn lifecycle(&self) -> WorkspaceLifecycleService<TestClock> {
        WorkspaceLifecycleService::new(
            self.ports.clone(),
            LifecycleSettings::default(),
            Arc::clone(&self.clock),
        )
    }

    pub(super) fn attempts(&self) -> AttemptForkService<TestClock> {
        AttemptForkService::new(self.ports.clone(), Arc::clone(&self.clock))
    }

    pub(super) fn ephemeral(&self) -> EphemeralService<TestClock> {
        EphemeralService::new(self.lifecycle(), self.attempts(), Arc::clone(&self.clock))
    }

    pub(super) fn reaper(&self) -> ExpirationReaper<TestClock> {
        ExpirationReaper::new(self.lifecycle(), Arc::clone(&self.clock))
    }

    /// Registers a learner with default editor settings.
    pub(super) fn learner(&self, id: i64, tier: UserTier) -> Caller {
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

    /// Creates a challenge post whose repository carries a valid config.
    pub(super) fn challenge(
        &self,
        post_id: i64,
        author: UserId,
        visibility: PostVisibility,
    ) -> RepoInfo {
        self.challenge_with_config(post_id, author, visibility, CONFIG_YAML)
    }

    pub(super) fn challenge_with_config(
        &self,
        post_id: i64,
        author: UserId,
        visibility: PostVisibility,
        config: &str,
    ) -> RepoInfo {
        self.seed_challenge(post_id, author, visibility, config, None)
    }

    /// Creates a public challenge post created from `template`.
    pub(super) fn templated_challenge(
        &self,
        post_id: i64,
        author: UserId,
        template: TemplateRef,
    ) -> RepoInfo {
        self.seed_challenge(post_id, author, PostVisibility::Public, CONFIG_YAML, Some(template))
    }

    fn seed_challenge(
        &self,
        post_id: i64,
        author: UserId,
        visibility: PostVisibility,
        config: &str,
        template: Option<TemplateRef>,
    ) -> RepoInfo {
        let post = PostId::new(post_id);
        let repo = self
            .vcs
            .create_repo(RepoPath::owned_by(author, post))
            .expect("repo creation");
        self.vcs
            .put_file(&repo.path, COMMIT, WORKSPACE_CONFIG_PATH, config.as_bytes().to_vec())
            .expect("config upload");
        self.code_sources
            .insert_post(
                PostRecord {
                    id: post,
                    title: format!("Challenge {post_id}"),
                    description: "Solve it".to_owned(),
                    author_id: author,
                    visibility,
                    template,
                },
                repo.id,
                Some(serde_json::json!({"theme": "light"})),
            )
            .expect("post insert");
        repo
    }

    /// Starts an attempt on `post_id` for `caller` and returns its code
    /// source reference and repository.
    pub(super) async fn attempt(&self, caller: &Caller, post_id: i64) -> (CodeSourceRef, RepoInfo) {
        let started = self
            .attempts()
            .start_attempt(caller, StartAttemptRequest::new(PostId::new(post_id)))
            .await
            .expect("attempt should start");
        let StartAttemptOutcome::Started { attempt, repo } = started.outcome else {
            panic!("expected a fresh attempt, got {:?}", started.outcome);
        };
        (attempt_source(attempt.id), repo)
    }
}

pub(super) const fn post_source(post_id: i64) -> CodeSourceRef {
    CodeSourceRef::new(CodeSourceId::new(post_id), CodeSourceType::Post)
}

pub(super) const fn attempt_source(attempt_id: AttemptId) -> CodeSourceRef {
    CodeSourceRef::new(
        CodeSourceId::new(attempt_id.into_inner()),
        CodeSourceType::Attempt,
    )
}
