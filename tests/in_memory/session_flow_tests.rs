//! End-to-end learner sessions over the in-memory adapters.

use chrono::Duration;
use gigo_workspaces::resource_policy::UserTier;
use gigo_workspaces::workspace::{
    domain::{
        InitState, NetworkId, PostId, SUBJECT_CREATE, SUBJECT_DESTROY, SUBJECT_START,
        SUBJECT_STOP, UserId, WorkspaceId, WorkspaceState,
    },
    services::{
        CreateOutcome, CreateWorkspaceRequest, EphemeralOutcome, EphemeralRequest,
        StartAttemptOutcome, StartAttemptRequest,
    },
};
use gigo_workspaces::workspace_config::{
    ports::WorkspaceConfigRepository, services::CreateTemplateRequest,
};
use rstest::rstest;

use super::helpers::{attempt_source, published_subjects, stack};
use crate::test_helpers::{ACCESS_URL, COMMIT, CONFIG_YAML, InMemoryStack};

const AUTHOR: i64 = 100;
const LEARNER: i64 = 200;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn learner_session_runs_from_attempt_to_teardown(stack: InMemoryStack) {
    stack.challenge(1, AUTHOR, None);
    let caller = stack.learner(LEARNER, UserTier::Basic);
    let lifecycle = stack.lifecycle();

    let started = stack
        .attempts()
        .start_attempt(&caller, StartAttemptRequest::new(PostId::new(1)))
        .await
        .expect("attempt");
    let StartAttemptOutcome::Started { attempt, repo } = started.outcome else {
        panic!("expected a fresh attempt");
    };
    let workspace_id = WorkspaceId::new(1001);
    let mut updates = stack.status.subscribe(workspace_id);

    let handle = lifecycle
        .create(
            &caller,
            CreateWorkspaceRequest::new(attempt_source(attempt.id), repo.id, COMMIT, ACCESS_URL),
        )
        .await
        .expect("create");
    assert_eq!(handle.outcome, CreateOutcome::Created);
    assert_eq!(handle.workspace.id(), workspace_id);
    assert_eq!(
        handle.editor_url,
        "/editor/200/1001-main?folder=%2Fworkspace"
    );

    let agent = lifecycle
        .register_agent(workspace_id)
        .await
        .expect("agent");
    let mut step = InitState::NotStarted;
    while let Some(next) = step.next() {
        lifecycle
            .init_step_completed(workspace_id, next)
            .await
            .expect("init step");
        step = next;
    }
    lifecycle
        .extend_expiration(workspace_id, agent.secret)
        .await
        .expect("heartbeat");

    lifecycle.stop(&caller, workspace_id).await.expect("stop");
    let stopped = lifecycle
        .report_follower_state(workspace_id, WorkspaceState::Stopped, None)
        .await
        .expect("follower report");
    assert_eq!(stopped.state(), WorkspaceState::Stopped);
    lifecycle.start(&caller, workspace_id).await.expect("start");

    stack.clock.advance(Duration::minutes(31));
    let reaped = stack.reaper().sweep().await.expect("sweep");

    assert_eq!(reaped, vec![workspace_id]);
    assert_eq!(
        published_subjects(&stack),
        vec![SUBJECT_CREATE, SUBJECT_STOP, SUBJECT_START, SUBJECT_DESTROY]
    );
    let mut seen = Vec::new();
    while let Some(update) = updates.try_recv() {
        seen.push(update);
    }
    assert_eq!(seen.first().map(|update| update.state), Some(WorkspaceState::Starting));
    assert_eq!(seen.last().map(|update| update.state), Some(WorkspaceState::Removing));
    assert!(
        seen.windows(2)
            .all(|pair| matches!(pair, [earlier, later] if earlier.version < later.version))
    );
    assert!(
        seen.iter()
            .any(|update| update.state == WorkspaceState::Active && update.init_state == 8)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn template_counters_follow_attempts_and_workspaces(stack: InMemoryStack) {
    let template = stack
        .template_service()
        .create(CreateTemplateRequest::new(
            UserId::new(AUTHOR),
            "Two core starter",
            CONFIG_YAML,
        ))
        .await
        .expect("template");
    stack.challenge(1, AUTHOR, Some(template.template_ref()));
    let caller = stack.learner(LEARNER, UserTier::Basic);

    let started = stack
        .attempts()
        .start_attempt(&caller, StartAttemptRequest::new(PostId::new(1)))
        .await
        .expect("attempt");
    let StartAttemptOutcome::Started { attempt, repo } = started.outcome else {
        panic!("expected a fresh attempt");
    };
    stack
        .lifecycle()
        .create(
            &caller,
            CreateWorkspaceRequest::new(attempt_source(attempt.id), repo.id, COMMIT, ACCESS_URL),
        )
        .await
        .expect("create");

    let revision = stack
        .templates
        .find_revision(template.template_ref())
        .await
        .expect("lookup")
        .expect("revision present");
    assert_eq!(revision.uses(), 1);
    assert_eq!(revision.completions(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn ephemeral_claims_can_be_purged(stack: InMemoryStack) {
    stack.challenge(1, AUTHOR, None);
    let ephemeral = stack.ephemeral();
    let network = NetworkId::new(2_130_706_433);

    let claim = ephemeral
        .create_and_bind(EphemeralRequest::new(
            network,
            PostId::new(1),
            COMMIT,
            ACCESS_URL,
        ))
        .await
        .expect("claim");
    let EphemeralOutcome::Created { workspace, user, .. } = claim.outcome else {
        panic!("expected a created claim");
    };
    let report = ephemeral
        .purge(&[workspace.workspace.id()])
        .await
        .expect("purge");
    let again = ephemeral
        .create_and_bind(EphemeralRequest::new(
            network,
            PostId::new(1),
            COMMIT,
            ACCESS_URL,
        ))
        .await
        .expect("repeat claim");

    assert_eq!(report.users, vec![user.id()]);
    assert!(stack.store.workspaces().expect("rows").is_empty());
    assert_eq!(again.outcome, EphemeralOutcome::AlreadyUsed);
}
