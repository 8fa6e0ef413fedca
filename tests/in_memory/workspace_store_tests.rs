//! Contract tests for the in-memory workspace store.

use chrono::Duration;
use gigo_workspaces::workspace::{
    adapters::memory::InMemoryWorkspaceStore,
    domain::{
        AgentSecret, EphemeralBinding, LifecycleIntent, NetworkId, PostId, SUBJECT_CREATE,
        UserId, Workspace, WorkspaceAgent, WorkspaceId, WorkspaceState,
    },
    ports::{LifecycleOutbox, WorkspaceRepository, WorkspaceRepositoryError},
};
use mockable::Clock;
use rstest::{fixture, rstest};

use crate::test_helpers::{ManualClock, create_intent, destroy_intent, workspace_row};

#[fixture]
fn store() -> InMemoryWorkspaceStore {
    InMemoryWorkspaceStore::new()
}

#[fixture]
fn clock() -> ManualClock {
    ManualClock::new()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn insert_commits_row_and_outbox_entry(store: InMemoryWorkspaceStore, clock: ManualClock) {
    let row = workspace_row(1, 10, "main", &clock);
    let intent = create_intent(&row);

    store.insert(&row, Some(&intent)).await.expect("insert");

    let found = store.find_by_id(row.id()).await.expect("lookup");
    assert_eq!(found, Some(row.clone()));
    let pending = store.pending(10).await.expect("pending");
    let [entry] = pending.as_slice() else {
        panic!("expected one pending entry, got {pending:?}");
    };
    assert_eq!(entry.subject, SUBJECT_CREATE);
    assert_eq!(entry.workspace_id, row.id());
    let decoded =
        LifecycleIntent::from_payload(&entry.subject, entry.payload.clone()).expect("decode");
    assert_eq!(decoded, intent);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_updates_are_rejected(store: InMemoryWorkspaceStore, clock: ManualClock) {
    let row = workspace_row(1, 10, "main", &clock);
    store.insert(&row, None).await.expect("insert");

    let mut first = row.clone();
    first.begin_stop(&clock).expect("stop");
    store
        .update(&first, row.version(), None)
        .await
        .expect("first writer wins");

    let mut second = row.clone();
    second.begin_destroy(&clock).expect("destroy");
    let result = store.update(&second, row.version(), None).await;

    assert!(matches!(
        result,
        Err(WorkspaceRepositoryError::VersionConflict { workspace_id, expected })
            if workspace_id == row.id() && expected == row.version()
    ));
    let stored = store
        .find_by_id(row.id())
        .await
        .expect("lookup")
        .expect("row present");
    assert_eq!(stored.state(), WorkspaceState::Stopping);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn updates_to_missing_rows_are_not_found(store: InMemoryWorkspaceStore, clock: ManualClock) {
    let row = workspace_row(5, 10, "main", &clock);

    let result = store.update(&row, 0, None).await;

    assert!(matches!(result, Err(WorkspaceRepositoryError::NotFound(id)) if id == row.id()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn one_live_row_per_source_key(store: InMemoryWorkspaceStore, clock: ManualClock) {
    let first = workspace_row(1, 10, "main", &clock);
    store.insert(&first, None).await.expect("insert");

    let clash = workspace_row(2, 10, "main", &clock);
    let result = store.insert(&clash, None).await;
    assert!(matches!(
        result,
        Err(WorkspaceRepositoryError::DuplicateActiveWorkspace(ref key)) if *key == first.source_key()
    ));

    let mut retired = first.clone();
    retired.begin_destroy(&clock).expect("destroy");
    store
        .update(&retired, first.version(), Some(&destroy_intent(&retired)))
        .await
        .expect("retire");
    store
        .insert(&clash, None)
        .await
        .expect("source key is free again");

    let live = store
        .find_live_by_source_key(&first.source_key())
        .await
        .expect("lookup");
    assert_eq!(live.as_ref().map(Workspace::id), Some(WorkspaceId::new(2)));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn different_commits_do_not_clash(store: InMemoryWorkspaceStore, clock: ManualClock) {
    store
        .insert(&workspace_row(1, 10, "main", &clock), None)
        .await
        .expect("main");
    store
        .insert(&workspace_row(2, 10, "feature", &clock), None)
        .await
        .expect("feature");

    assert_eq!(store.workspaces().expect("rows").len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_writes_leave_no_trace(store: InMemoryWorkspaceStore, clock: ManualClock) {
    let row = workspace_row(1, 10, "main", &clock);
    store.fail_next_write().expect("inject");

    let result = store.insert(&row, Some(&create_intent(&row))).await;

    assert!(matches!(result, Err(WorkspaceRepositoryError::Persistence(_))));
    assert!(store.workspaces().expect("rows").is_empty());
    assert!(store.outbox_entries().expect("outbox").is_empty());
    store
        .insert(&row, Some(&create_intent(&row)))
        .await
        .expect("the injected failure fires once");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delivered_entries_leave_the_pending_queue(
    store: InMemoryWorkspaceStore,
    clock: ManualClock,
) {
    let first = workspace_row(1, 10, "main", &clock);
    let second = workspace_row(2, 11, "main", &clock);
    store
        .insert(&first, Some(&create_intent(&first)))
        .await
        .expect("first");
    store
        .insert(&second, Some(&create_intent(&second)))
        .await
        .expect("second");

    let pending = store.pending(10).await.expect("pending");
    let ids: Vec<i64> = pending.iter().map(|entry| entry.id).collect();
    assert!(ids.windows(2).all(|pair| matches!(pair, [a, b] if a < b)));
    let head = pending.first().expect("head entry");
    assert_eq!(head.workspace_id, first.id());

    store
        .mark_delivered(head.id, clock.utc())
        .await
        .expect("mark");

    let remaining = store.pending(10).await.expect("pending");
    assert_eq!(
        remaining.iter().map(|entry| entry.workspace_id).collect::<Vec<_>>(),
        vec![second.id()]
    );
    assert_eq!(store.pending(0).await.expect("pending").len(), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn pruning_drops_only_old_deliveries(store: InMemoryWorkspaceStore, clock: ManualClock) {
    for id in 1..=3 {
        let row = workspace_row(id, 10 + id, "main", &clock);
        store
            .insert(&row, Some(&create_intent(&row)))
            .await
            .expect("insert");
    }
    let pending = store.pending(10).await.expect("pending");
    let [old, recent, waiting] = pending.as_slice() else {
        panic!("expected three pending entries, got {pending:?}");
    };
    store.mark_delivered(old.id, clock.utc()).await.expect("mark");
    clock.advance(Duration::hours(2));
    store.mark_delivered(recent.id, clock.utc()).await.expect("mark");

    let cutoff = clock.utc() - Duration::hours(1);
    assert_eq!(store.prune_delivered(cutoff).await.expect("prune"), 1);
    let ids: Vec<i64> = store
        .outbox_entries()
        .expect("entries")
        .iter()
        .map(|entry| entry.id)
        .collect();
    assert_eq!(ids, vec![recent.id, waiting.id]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn expired_listing_skips_fresh_and_retired_rows(
    store: InMemoryWorkspaceStore,
    clock: ManualClock,
) {
    let stale = workspace_row(1, 10, "main", &clock);
    let retired = workspace_row(2, 11, "main", &clock);
    store.insert(&stale, None).await.expect("stale");
    store.insert(&retired, None).await.expect("retired");
    let mut removing = retired.clone();
    removing.begin_destroy(&clock).expect("destroy");
    store
        .update(&removing, retired.version(), None)
        .await
        .expect("retire");
    clock.advance(Duration::minutes(20));
    let fresh = workspace_row(3, 12, "main", &clock);
    store.insert(&fresh, None).await.expect("fresh");

    let expired = store.list_expired(clock.utc()).await.expect("expired");

    assert_eq!(
        expired.iter().map(Workspace::id).collect::<Vec<_>>(),
        vec![stale.id()]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn agents_authenticate_by_secret(store: InMemoryWorkspaceStore, clock: ManualClock) {
    let row = workspace_row(1, 10, "main", &clock);
    store.insert(&row, None).await.expect("insert");
    let agent = WorkspaceAgent {
        workspace_id: row.id(),
        secret: AgentSecret::generate(),
        created_at: clock.utc(),
    };
    store.insert_agent(&agent).await.expect("agent");

    let authorised = store
        .find_by_agent(row.id(), agent.secret)
        .await
        .expect("lookup");
    let forged = store
        .find_by_agent(row.id(), AgentSecret::generate())
        .await
        .expect("lookup");

    assert_eq!(authorised.as_ref().map(Workspace::id), Some(row.id()));
    assert_eq!(forged, None);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn agents_need_an_existing_row(store: InMemoryWorkspaceStore, clock: ManualClock) {
    let agent = WorkspaceAgent {
        workspace_id: WorkspaceId::new(404),
        secret: AgentSecret::generate(),
        created_at: clock.utc(),
    };

    let result = store.insert_agent(&agent).await;

    assert!(matches!(result, Err(WorkspaceRepositoryError::NotFound(_))));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn bindings_are_claimed_once(store: InMemoryWorkspaceStore, clock: ManualClock) {
    let ip = NetworkId::new(167_772_161);
    let challenge_id = PostId::new(1);
    let first = workspace_row(1, 10, "main", &clock);
    let binding = EphemeralBinding {
        ip,
        challenge_id,
        workspace_id: first.id(),
        user_id: UserId::new(10),
        date: clock.utc(),
    };
    store
        .insert_ephemeral(&first, &binding, &create_intent(&first))
        .await
        .expect("first claim");

    let second = workspace_row(2, 11, "main", &clock);
    let result = store
        .insert_ephemeral(
            &second,
            &EphemeralBinding {
                workspace_id: second.id(),
                user_id: UserId::new(11),
                ..binding
            },
            &create_intent(&second),
        )
        .await;

    assert!(matches!(
        result,
        Err(WorkspaceRepositoryError::DuplicateBinding { ip: bound, challenge_id: post })
            if bound == ip && post == challenge_id
    ));
    assert_eq!(store.find_by_id(second.id()).await.expect("lookup"), None);
    assert_eq!(store.outbox_entries().expect("outbox").len(), 1);
    assert_eq!(
        store
            .find_ephemeral_binding(ip, challenge_id)
            .await
            .expect("lookup"),
        Some(binding)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn hard_delete_drops_row_and_agent(store: InMemoryWorkspaceStore, clock: ManualClock) {
    let row = workspace_row(1, 10, "main", &clock);
    store.insert(&row, None).await.expect("insert");
    let secret = AgentSecret::generate();
    store
        .insert_agent(&WorkspaceAgent {
            workspace_id: row.id(),
            secret,
            created_at: clock.utc(),
        })
        .await
        .expect("agent");

    store.hard_delete(row.id()).await.expect("delete");

    assert_eq!(store.find_by_id(row.id()).await.expect("lookup"), None);
    assert_eq!(
        store.find_by_agent(row.id(), secret).await.expect("lookup"),
        None
    );
}
