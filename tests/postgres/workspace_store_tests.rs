//! `PostgreSQL` workspace store tests.

use chrono::Duration;
use gigo_workspaces::workspace::{
    adapters::postgres::PostgresWorkspaceStore,
    domain::{
        AgentSecret, EphemeralBinding, InitState, LifecycleIntent, NetworkId, PortDescriptor,
        PostId, UserId, Workspace, WorkspaceAgent, WorkspaceState,
    },
    ports::{LifecycleOutbox, WorkspaceRepository, WorkspaceRepositoryError},
};
use mockable::Clock;

use super::helpers::TestSchema;
use crate::test_helpers::{ManualClock, create_intent, destroy_intent, workspace_row};

fn store(schema: &TestSchema) -> PostgresWorkspaceStore {
    PostgresWorkspaceStore::new(schema.pool())
}

#[tokio::test(flavor = "multi_thread")]
async fn rows_round_trip_with_their_outbox_entry() -> eyre::Result<()> {
    let Some(schema) = TestSchema::provision()? else {
        return Ok(());
    };
    let store = store(&schema);
    let clock = ManualClock::new();
    let mut row = workspace_row(1, 10, "main", &clock);
    let intent = create_intent(&row);
    store.insert(&row, Some(&intent)).await?;

    let loaded = store.find_by_id(row.id()).await?;
    eyre::ensure!(loaded.as_ref() == Some(&row), "loaded {loaded:?}, stored {row:?}");

    let expected = row.version();
    row.complete_init_step(InitState::Provisioning, &clock)?;
    row.apply_follower_report(
        WorkspaceState::Starting,
        Some(vec![PortDescriptor {
            name: "editor".to_owned(),
            port: 8080,
            public: false,
        }]),
        &clock,
    )?;
    store.update(&row, expected, None).await?;
    let reloaded = store
        .find_by_id(row.id())
        .await?
        .ok_or_else(|| eyre::eyre!("row vanished"))?;
    eyre::ensure!(reloaded == row, "update did not round trip: {reloaded:?}");

    let pending = store.pending(10).await?;
    let [entry] = pending.as_slice() else {
        eyre::bail!("expected one pending entry, got {pending:?}");
    };
    let decoded = LifecycleIntent::from_payload(&entry.subject, entry.payload.clone())?;
    eyre::ensure!(decoded == intent, "outbox payload mismatch: {decoded:?}");

    store.mark_delivered(entry.id, clock.utc()).await?;
    eyre::ensure!(store.pending(10).await?.is_empty(), "entry still pending");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn pruning_keeps_pending_and_recent_entries() -> eyre::Result<()> {
    let Some(schema) = TestSchema::provision()? else {
        return Ok(());
    };
    let store = store(&schema);
    let clock = ManualClock::new();
    for id in 1..=3 {
        let row = workspace_row(id, 10 + id, "main", &clock);
        store.insert(&row, Some(&create_intent(&row))).await?;
    }
    let pending = store.pending(10).await?;
    let [old, recent, waiting] = pending.as_slice() else {
        eyre::bail!("expected three pending entries, got {pending:?}");
    };
    store.mark_delivered(old.id, clock.utc()).await?;
    clock.advance(Duration::hours(2));
    store.mark_delivered(recent.id, clock.utc()).await?;

    let pruned = store.prune_delivered(clock.utc() - Duration::hours(1)).await?;
    eyre::ensure!(pruned == 1, "expected one pruned entry, got {pruned}");
    let left = store.pending(10).await?;
    eyre::ensure!(
        left.iter().map(|entry| entry.id).collect::<Vec<_>>() == vec![waiting.id],
        "pending entries changed: {left:?}"
    );
    let again = store.prune_delivered(clock.utc() - Duration::hours(1)).await?;
    eyre::ensure!(again == 0, "recent delivery was pruned");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn stale_versions_conflict() -> eyre::Result<()> {
    let Some(schema) = TestSchema::provision()? else {
        return Ok(());
    };
    let store = store(&schema);
    let clock = ManualClock::new();
    let row = workspace_row(1, 10, "main", &clock);
    store.insert(&row, None).await?;

    let mut first = row.clone();
    first.begin_stop(&clock)?;
    store.update(&first, row.version(), None).await?;
    let mut second = row.clone();
    second.begin_destroy(&clock)?;
    let result = store.update(&second, row.version(), None).await;

    eyre::ensure!(
        matches!(result, Err(WorkspaceRepositoryError::VersionConflict { .. })),
        "expected a version conflict, got {result:?}"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn live_source_index_allows_one_live_row() -> eyre::Result<()> {
    let Some(schema) = TestSchema::provision()? else {
        return Ok(());
    };
    let store = store(&schema);
    let clock = ManualClock::new();
    let first = workspace_row(1, 10, "main", &clock);
    store.insert(&first, Some(&create_intent(&first))).await?;

    let clash = workspace_row(2, 10, "main", &clock);
    let result = store.insert(&clash, Some(&create_intent(&clash))).await;
    eyre::ensure!(
        matches!(result, Err(WorkspaceRepositoryError::DuplicateActiveWorkspace(_))),
        "expected a duplicate live row, got {result:?}"
    );
    eyre::ensure!(
        store.pending(10).await?.len() == 1,
        "rejected insert left an outbox entry"
    );

    let mut retired = first.clone();
    retired.begin_destroy(&clock)?;
    store
        .update(&retired, first.version(), Some(&destroy_intent(&retired)))
        .await?;
    store.insert(&clash, None).await?;
    let live = store.find_live_by_source_key(&first.source_key()).await?;
    eyre::ensure!(
        live.as_ref().map(Workspace::id) == Some(clash.id()),
        "unexpected live row {live:?}"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn expired_rows_and_agents() -> eyre::Result<()> {
    let Some(schema) = TestSchema::provision()? else {
        return Ok(());
    };
    let store = store(&schema);
    let clock = ManualClock::new();
    let stale = workspace_row(1, 10, "main", &clock);
    store.insert(&stale, None).await?;
    let agent = WorkspaceAgent {
        workspace_id: stale.id(),
        secret: AgentSecret::generate(),
        created_at: clock.utc(),
    };
    store.insert_agent(&agent).await?;
    clock.advance(Duration::minutes(20));
    let fresh = workspace_row(2, 11, "main", &clock);
    store.insert(&fresh, None).await?;

    let expired = store.list_expired(clock.utc()).await?;
    eyre::ensure!(
        expired.iter().map(Workspace::id).eq([stale.id()]),
        "unexpected expired rows {expired:?}"
    );
    eyre::ensure!(
        store.find_by_agent(stale.id(), agent.secret).await?.is_some(),
        "agent secret rejected"
    );
    eyre::ensure!(
        store
            .find_by_agent(stale.id(), AgentSecret::generate())
            .await?
            .is_none(),
        "forged secret accepted"
    );

    store.hard_delete(stale.id()).await?;
    eyre::ensure!(
        store.find_by_agent(stale.id(), agent.secret).await?.is_none(),
        "agent outlived its workspace"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn bindings_reject_a_second_claim() -> eyre::Result<()> {
    let Some(schema) = TestSchema::provision()? else {
        return Ok(());
    };
    let store = store(&schema);
    let clock = ManualClock::new();
    let ip = NetworkId::new(3_232_235_777);
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
        .await?;

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

    eyre::ensure!(
        matches!(result, Err(WorkspaceRepositoryError::DuplicateBinding { .. })),
        "expected a duplicate binding, got {result:?}"
    );
    eyre::ensure!(
        store.find_by_id(second.id()).await?.is_none(),
        "rejected claim left a row"
    );
    let stored = store.find_ephemeral_binding(ip, challenge_id).await?;
    eyre::ensure!(stored == Some(binding), "binding changed: {stored:?}");
    Ok(())
}
