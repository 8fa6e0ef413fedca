//! `PostgreSQL` code source adapter tests.

use gigo_workspaces::resource_policy::UserTier;
use gigo_workspaces::workspace::{
    adapters::postgres::PostgresCodeSourceRepository,
    domain::{
        Attempt, AttemptId, CodeSourceId, CodeSourceRef, CodeSourceType, PostId, PostVisibility,
        RepoId, UserId,
    },
    ports::CodeSourceRepository,
};
use gigo_workspaces::workspace_config::domain::{TemplateId, TemplateRef};
use mockable::Clock;

use super::helpers::{TestSchema, seed_post};
use crate::test_helpers::ManualClock;

fn attempt(id: i64, post: i64, author: i64, clock: &ManualClock) -> Attempt {
    Attempt {
        id: AttemptId::new(id),
        post_id: PostId::new(post),
        author_id: UserId::new(author),
        author_name: format!("learner-{author}"),
        author_tier: UserTier::Basic,
        title: format!("Challenge {post}"),
        description: "Solve it".to_owned(),
        repo_id: RepoId::new(90),
        parent_attempt: None,
        created_at: clock.utc(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn posts_resolve_with_their_template() -> eyre::Result<()> {
    let Some(schema) = TestSchema::provision()? else {
        return Ok(());
    };
    seed_post(&schema, 1, 100, 7)?;
    schema.execute("UPDATE posts SET template_id = 40, template_revision = 2 WHERE id = 1")?;
    let repository = PostgresCodeSourceRepository::new(schema.pool());

    let post = repository
        .find_post(PostId::new(1))
        .await?
        .ok_or_else(|| eyre::eyre!("post missing"))?;
    let link = repository
        .find_link(CodeSourceRef::new(CodeSourceId::new(1), CodeSourceType::Post))
        .await?
        .ok_or_else(|| eyre::eyre!("link missing"))?;

    let template = Some(TemplateRef::new(TemplateId::new(40), 2));
    eyre::ensure!(post.visibility == PostVisibility::Public, "visibility {:?}", post.visibility);
    eyre::ensure!(post.template == template, "post template {:?}", post.template);
    eyre::ensure!(link.owner_id == UserId::new(100), "owner {}", link.owner_id);
    eyre::ensure!(link.repo_id == RepoId::new(7), "repo {}", link.repo_id);
    eyre::ensure!(link.template == template, "link template {:?}", link.template);
    eyre::ensure!(
        link.workspace_settings == Some(serde_json::json!({"theme": "light"})),
        "settings {:?}",
        link.workspace_settings
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn recorded_attempts_inherit_post_settings() -> eyre::Result<()> {
    let Some(schema) = TestSchema::provision()? else {
        return Ok(());
    };
    seed_post(&schema, 1, 100, 7)?;
    let repository = PostgresCodeSourceRepository::new(schema.pool());
    let clock = ManualClock::new();

    repository.record_attempt(&attempt(500, 1, 200, &clock)).await?;

    let existing = repository
        .find_existing_attempt(UserId::new(200), PostId::new(1))
        .await?
        .ok_or_else(|| eyre::eyre!("attempt missing"))?;
    eyre::ensure!(existing.id == AttemptId::new(500), "found {existing:?}");
    eyre::ensure!(!existing.closed, "fresh attempts are open");
    let link = repository
        .find_link(CodeSourceRef::new(
            CodeSourceId::new(500),
            CodeSourceType::Attempt,
        ))
        .await?
        .ok_or_else(|| eyre::eyre!("link missing"))?;
    eyre::ensure!(link.owner_id == UserId::new(200), "owner {}", link.owner_id);
    eyre::ensure!(link.repo_id == RepoId::new(90), "repo {}", link.repo_id);
    eyre::ensure!(
        link.workspace_settings == Some(serde_json::json!({"theme": "light"})),
        "settings {:?}",
        link.workspace_settings
    );

    repository.delete_attempt(AttemptId::new(500)).await?;
    eyre::ensure!(
        repository.find_attempt(AttemptId::new(500)).await?.is_none(),
        "attempt survived deletion"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn discarded_attempts_restore_the_post_counter() -> eyre::Result<()> {
    let Some(schema) = TestSchema::provision()? else {
        return Ok(());
    };
    seed_post(&schema, 1, 100, 7)?;
    let repository = PostgresCodeSourceRepository::new(schema.pool());
    let clock = ManualClock::new();
    let recorded = attempt(500, 1, 200, &clock);

    repository.record_attempt(&recorded).await?;
    repository.discard_attempt(&recorded).await?;
    repository.discard_attempt(&recorded).await?;

    eyre::ensure!(
        repository.find_attempt(AttemptId::new(500)).await?.is_none(),
        "attempt survived discard"
    );
    schema.execute(
        "DO $$ BEGIN \
         IF (SELECT attempts FROM posts WHERE id = 1) <> 0 THEN \
         RAISE EXCEPTION 'attempt counter not restored'; \
         END IF; END $$",
    )?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn attempts_on_missing_posts_are_not_recorded() -> eyre::Result<()> {
    let Some(schema) = TestSchema::provision()? else {
        return Ok(());
    };
    let repository = PostgresCodeSourceRepository::new(schema.pool());
    let clock = ManualClock::new();

    let result = repository.record_attempt(&attempt(500, 9, 200, &clock)).await;

    eyre::ensure!(result.is_err(), "attempt recorded without a post");
    eyre::ensure!(
        repository.find_attempt(AttemptId::new(500)).await?.is_none(),
        "partial attempt row left behind"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn touching_unknown_rows_is_harmless() -> eyre::Result<()> {
    let Some(schema) = TestSchema::provision()? else {
        return Ok(());
    };
    let repository = PostgresCodeSourceRepository::new(schema.pool());
    let clock = ManualClock::new();

    repository
        .touch(
            CodeSourceRef::new(CodeSourceId::new(77), CodeSourceType::Byte),
            clock.utc(),
        )
        .await?;
    Ok(())
}
