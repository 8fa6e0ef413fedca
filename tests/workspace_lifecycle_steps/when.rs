//! When steps for workspace lifecycle BDD scenarios.

use chrono::Duration;
use eyre::WrapErr;
use gigo_workspaces::workspace::{
    domain::{CodeSourceId, CodeSourceRef, CodeSourceType, NetworkId, PostId},
    services::{
        CreateWorkspaceRequest, EphemeralRequest, StartAttemptOutcome, StartAttemptRequest,
    },
};
use rstest_bdd_macros::when;

use super::world::{LifecycleWorld, run_async};
use crate::test_helpers::{ACCESS_URL, COMMIT};

#[when("the learner starts an attempt on challenge {post_id:i64}")]
fn start_attempt(world: &mut LifecycleWorld, post_id: i64) -> Result<(), eyre::Report> {
    let caller = world
        .caller
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing learner in scenario world"))?;
    let started = run_async(
        world
            .stack
            .attempts()
            .start_attempt(caller, StartAttemptRequest::new(PostId::new(post_id))),
    )
    .wrap_err("start attempt")?;
    let StartAttemptOutcome::Started { attempt, repo } = started.outcome else {
        return Err(eyre::eyre!("expected a fresh attempt, got {:?}", started.outcome));
    };
    let source = CodeSourceRef::new(
        CodeSourceId::new(attempt.id.into_inner()),
        CodeSourceType::Attempt,
    );
    world.attempt = Some((source, repo));
    Ok(())
}

#[when("the learner opens a workspace on the attempt")]
fn open_workspace(world: &mut LifecycleWorld) -> Result<(), eyre::Report> {
    let caller = world
        .caller
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing learner in scenario world"))?;
    let (source, repo) = world
        .attempt
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing attempt in scenario world"))?;
    let handle = run_async(world.stack.lifecycle().create(
        caller,
        CreateWorkspaceRequest::new(*source, repo.id, COMMIT, ACCESS_URL),
    ))
    .wrap_err("open workspace")?;
    world.last_handle = Some(handle);
    Ok(())
}

#[when("{minutes:i64} minutes pass")]
fn minutes_pass(world: &mut LifecycleWorld, minutes: i64) {
    world.stack.clock.advance(Duration::minutes(minutes));
}

#[when("the reaper sweeps")]
fn reaper_sweeps(world: &mut LifecycleWorld) -> Result<(), eyre::Report> {
    run_async(world.stack.reaper().sweep()).wrap_err("reaper sweep")?;
    Ok(())
}

#[when("network {ip:i64} claims challenge {post_id:i64}")]
fn network_claims(world: &mut LifecycleWorld, ip: i64, post_id: i64) -> Result<(), eyre::Report> {
    let claim = run_async(world.stack.ephemeral().create_and_bind(EphemeralRequest::new(
        NetworkId::new(ip),
        PostId::new(post_id),
        COMMIT,
        ACCESS_URL,
    )))
    .wrap_err("ephemeral claim")?;
    world.last_claim = Some(claim);
    Ok(())
}
