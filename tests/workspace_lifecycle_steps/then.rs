//! Then steps for workspace lifecycle BDD scenarios.

use gigo_workspaces::workspace::{
    domain::{LifecycleIntent, WorkspaceState},
    ports::WorkspaceRepository,
    services::{CreateOutcome, EphemeralOutcome},
};
use rstest_bdd_macros::then;

use super::world::{LifecycleWorld, run_async};

#[then(r#"the workspace is "{state}""#)]
fn workspace_is(world: &LifecycleWorld, state: String) -> Result<(), eyre::Report> {
    let expected = WorkspaceState::try_from(state.as_str())
        .map_err(|err| eyre::eyre!("invalid expected state in scenario: {err}"))?;
    let handle = world
        .last_handle
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing workspace handle"))?;
    let stored = run_async(world.stack.store.find_by_id(handle.workspace.id()))?
        .ok_or_else(|| eyre::eyre!("workspace {} is gone", handle.workspace.id()))?;
    eyre::ensure!(
        stored.state() == expected,
        "expected state {expected}, found {}",
        stored.state()
    );
    Ok(())
}

#[then(r#"the bus carried "{subject}""#)]
fn bus_carried(world: &LifecycleWorld, subject: String) -> Result<(), eyre::Report> {
    let published = world.stack.bus.published()?;
    eyre::ensure!(
        published.iter().map(LifecycleIntent::subject).any(|seen| seen == subject),
        "no {subject} intent among {published:?}"
    );
    Ok(())
}

#[then("the bus carried {count:usize} intents")]
fn bus_carried_count(world: &LifecycleWorld, count: usize) -> Result<(), eyre::Report> {
    let published = world.stack.bus.published()?;
    eyre::ensure!(
        published.len() == count,
        "expected {count} intents, found {}",
        published.len()
    );
    Ok(())
}

#[then("the last open reused the workspace")]
fn last_open_reused(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    let handle = world
        .last_handle
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing workspace handle"))?;
    eyre::ensure!(
        handle.outcome == CreateOutcome::Reused,
        "expected a reused workspace, got {:?}",
        handle.outcome
    );
    Ok(())
}

#[then("the last claim was refused as already used")]
fn last_claim_refused(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    let claim = world
        .last_claim
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing ephemeral claim"))?;
    eyre::ensure!(
        claim.outcome == EphemeralOutcome::AlreadyUsed,
        "expected the claim to be refused, got {:?}",
        claim.outcome
    );
    Ok(())
}
