//! `PostgreSQL` template repository tests.

use gigo_workspaces::workspace::domain::UserId;
use gigo_workspaces::workspace_config::{
    adapters::postgres::PostgresWorkspaceConfigRepository,
    domain::{NewTemplateData, TemplateEdit, TemplateId, TemplateRef, WorkspaceTemplate},
    ports::{WorkspaceConfigRepository, WorkspaceConfigRepositoryError},
};

use super::helpers::TestSchema;
use crate::test_helpers::{CONFIG_YAML, ManualClock};

fn revision_zero(clock: &ManualClock) -> eyre::Result<WorkspaceTemplate> {
    Ok(WorkspaceTemplate::new(
        NewTemplateData {
            id: TemplateId::new(40),
            author_id: UserId::new(100),
            title: "Two core starter".to_owned(),
            description: "Python with two cores".to_owned(),
            content: CONFIG_YAML.to_owned(),
            tags: vec!["python".to_owned()],
            languages: vec!["Python".to_owned()],
        },
        clock,
    )?)
}

#[tokio::test(flavor = "multi_thread")]
async fn revisions_append_and_list_in_order() -> eyre::Result<()> {
    let Some(schema) = TestSchema::provision()? else {
        return Ok(());
    };
    let repository = PostgresWorkspaceConfigRepository::new(schema.pool());
    let clock = ManualClock::new();
    let first = revision_zero(&clock)?;
    repository.insert(&first).await?;
    let second = first.revise(
        TemplateEdit::new().with_description("Python with two cores and a linter"),
        &clock,
    );
    repository.insert(&second).await?;

    let revisions = repository.list_revisions(first.id()).await?;
    let latest = repository
        .find_latest_by_author(first.id(), UserId::new(100))
        .await?;
    let foreign = repository
        .find_latest_by_author(first.id(), UserId::new(999))
        .await?;

    eyre::ensure!(
        revisions.iter().map(WorkspaceTemplate::revision).eq([0, 1]),
        "unexpected revisions {revisions:?}"
    );
    eyre::ensure!(latest.as_ref() == Some(&second), "latest was {latest:?}");
    eyre::ensure!(foreign.is_none(), "foreign author matched {foreign:?}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_revisions_are_rejected() -> eyre::Result<()> {
    let Some(schema) = TestSchema::provision()? else {
        return Ok(());
    };
    let repository = PostgresWorkspaceConfigRepository::new(schema.pool());
    let clock = ManualClock::new();
    let template = revision_zero(&clock)?;
    repository.insert(&template).await?;

    let result = repository.insert(&template).await;

    eyre::ensure!(
        matches!(
            result,
            Err(WorkspaceConfigRepositoryError::DuplicateRevision(reference))
                if reference == template.template_ref()
        ),
        "expected a duplicate revision, got {result:?}"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn counters_track_one_revision() -> eyre::Result<()> {
    let Some(schema) = TestSchema::provision()? else {
        return Ok(());
    };
    let repository = PostgresWorkspaceConfigRepository::new(schema.pool());
    let clock = ManualClock::new();
    let template = revision_zero(&clock)?;
    repository.insert(&template).await?;

    repository.increment_uses(template.template_ref()).await?;
    repository.increment_uses(template.template_ref()).await?;
    repository
        .increment_completions(template.template_ref())
        .await?;
    let missing = repository
        .increment_uses(TemplateRef::new(template.id(), 7))
        .await;

    let stored = repository
        .find_revision(template.template_ref())
        .await?
        .ok_or_else(|| eyre::eyre!("revision missing"))?;
    eyre::ensure!(stored.uses() == 2, "uses {}", stored.uses());
    eyre::ensure!(stored.completions() == 1, "completions {}", stored.completions());
    eyre::ensure!(
        matches!(missing, Err(WorkspaceConfigRepositoryError::NotFound(_))),
        "expected a missing revision, got {missing:?}"
    );
    Ok(())
}
