//! Service layer for public workspace config templates.

use crate::error::ErrorKind;
use crate::workspace::domain::UserId;
use crate::workspace::ports::IdGenerator;
use crate::workspace_config::{
    domain::{
        ConfigParseError, NewTemplateData, ResolvedConfig, TemplateDomainError, TemplateEdit,
        TemplateId, TemplateRef, WorkspaceTemplate,
    },
    ports::{WorkspaceConfigRepository, WorkspaceConfigRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Request payload for publishing a new template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTemplateRequest {
    author_id: UserId,
    title: String,
    description: String,
    content: String,
    tags: Vec<String>,
    languages: Vec<String>,
}

impl CreateTemplateRequest {
    /// Creates a request with the required template fields.
    #[must_use]
    pub fn new(author_id: UserId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author_id,
            title: title.into(),
            description: String::new(),
            content: content.into(),
            tags: Vec::new(),
            languages: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    /// Sets the languages.
    #[must_use]
    pub fn with_languages(mut self, languages: impl IntoIterator<Item = String>) -> Self {
        self.languages = languages.into_iter().collect();
        self
    }
}

/// Service-level errors for template operations.
#[derive(Debug, Error)]
pub enum WorkspaceConfigServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TemplateDomainError),
    /// The template content is not a valid workspace config.
    #[error(transparent)]
    Content(#[from] ConfigParseError),
    /// No revision of the template is visible to the caller.
    #[error("workspace config template {0} not found")]
    NotFound(TemplateId),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] WorkspaceConfigRepositoryError),
}

/// Result type for template service operations.
pub type WorkspaceConfigServiceResult<T> = Result<T, WorkspaceConfigServiceError>;

impl WorkspaceConfigServiceError {
    /// Classifies the failure for callers.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(_) => ErrorKind::InvalidRequest,
            Self::Content(ConfigParseError::Malformed(_)) => ErrorKind::ConfigMalformed,
            Self::Content(ConfigParseError::Invalid(_)) => ErrorKind::ConfigInvalid,
            Self::NotFound(_) | Self::Repository(WorkspaceConfigRepositoryError::NotFound(_)) => {
                ErrorKind::NotFound
            }
            Self::Repository(WorkspaceConfigRepositoryError::DuplicateRevision(_)) => {
                ErrorKind::Conflict
            }
            Self::Repository(WorkspaceConfigRepositoryError::Persistence(_)) => {
                ErrorKind::ExternalUnavailable
            }
        }
    }
}

/// Template publishing and revision service.
#[derive(Clone)]
pub struct WorkspaceConfigService<R, I, C>
where
    R: WorkspaceConfigRepository,
    I: IdGenerator,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    ids: Arc<I>,
    clock: Arc<C>,
}

impl<R, I, C> WorkspaceConfigService<R, I, C>
where
    R: WorkspaceConfigRepository,
    I: IdGenerator,
    C: Clock + Send + Sync,
{
    /// Creates a template service.
    #[must_use]
    pub const fn new(repository: Arc<R>, ids: Arc<I>, clock: Arc<C>) -> Self {
        Self {
            repository,
            ids,
            clock,
        }
    }

    /// Publishes revision zero of a new template.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceConfigServiceError::Content`] when the content is
    /// not a valid config within [`crate::workspace_config::domain::TEMPLATE_RESOURCE_CEILING`],
    /// or another [`WorkspaceConfigServiceError`] when validation or
    /// persistence fails.
    pub async fn create(
        &self,
        request: CreateTemplateRequest,
    ) -> WorkspaceConfigServiceResult<WorkspaceTemplate> {
        let CreateTemplateRequest {
            author_id,
            title,
            description,
            content,
            tags,
            languages,
        } = request;
        ResolvedConfig::parse_template(content.as_bytes())?;

        let template = WorkspaceTemplate::new(
            NewTemplateData {
                id: TemplateId::new(self.ids.next_id()),
                author_id,
                title,
                description,
                content,
                tags,
                languages,
            },
            &*self.clock,
        )?;
        self.repository.insert(&template).await?;
        tracing::info!(template = %template.template_ref(), author = %author_id, "published workspace config template");
        Ok(template)
    }

    /// Appends a revision built from the author's latest revision.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceConfigServiceError::NotFound`] when the author has
    /// no revision of `id`, [`WorkspaceConfigServiceError::Content`] when the
    /// revised content is invalid, or a repository error when the insert
    /// fails.
    pub async fn update(
        &self,
        author_id: UserId,
        id: TemplateId,
        edit: TemplateEdit,
    ) -> WorkspaceConfigServiceResult<WorkspaceTemplate> {
        let latest = self
            .repository
            .find_latest_by_author(id, author_id)
            .await?
            .ok_or(WorkspaceConfigServiceError::NotFound(id))?;

        let revised = latest.revise(edit, &*self.clock);
        ResolvedConfig::parse_template(revised.content().as_bytes())?;
        self.repository.insert(&revised).await?;
        Ok(revised)
    }

    /// Returns every revision of a template, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceConfigServiceError::NotFound`] when the template has
    /// no revisions.
    pub async fn get(&self, id: TemplateId) -> WorkspaceConfigServiceResult<Vec<WorkspaceTemplate>> {
        let revisions = self.repository.list_revisions(id).await?;
        if revisions.is_empty() {
            return Err(WorkspaceConfigServiceError::NotFound(id));
        }
        Ok(revisions)
    }

    /// Records that an attempt was started from a revision.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceConfigServiceError::Repository`] when the revision
    /// is missing or the update fails.
    pub async fn increment_uses(&self, template_ref: TemplateRef) -> WorkspaceConfigServiceResult<()> {
        Ok(self.repository.increment_uses(template_ref).await?)
    }

    /// Records that a workspace was created with a revision's content.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceConfigServiceError::Repository`] when the revision
    /// is missing or the update fails.
    pub async fn increment_completions(
        &self,
        template_ref: TemplateRef,
    ) -> WorkspaceConfigServiceResult<()> {
        Ok(self.repository.increment_completions(template_ref).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::adapters::memory::SequentialIdGenerator;
    use crate::workspace_config::adapters::memory::InMemoryWorkspaceConfigRepository;
    use mockable::DefaultClock;
    use rstest::{fixture, rstest};

    type TestService = WorkspaceConfigService<
        InMemoryWorkspaceConfigRepository,
        SequentialIdGenerator,
        DefaultClock,
    >;

    #[fixture]
    fn service() -> TestService {
        WorkspaceConfigService::new(
            Arc::new(InMemoryWorkspaceConfigRepository::new()),
            Arc::new(SequentialIdGenerator::starting_at(500)),
            Arc::new(DefaultClock),
        )
    }

    const CONTENT: &str = "\
version: 0.1
base_container: gigodev/gimg:python
working_directory: /home/gigo/codebase
resources: {cpu: 2, mem: 4, disk: 20}
";

    fn request(author: i64) -> CreateTemplateRequest {
        CreateTemplateRequest::new(UserId::new(author), "Python", CONTENT)
            .with_description("pip and pytest")
            .with_tags(vec!["python".to_owned()])
            .with_languages(vec!["Python".to_owned()])
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn update_appends_a_revision(service: TestService) {
        let created = service
            .create(request(1))
            .await
            .expect("create should succeed");

        let revised = service
            .update(
                UserId::new(1),
                created.id(),
                TemplateEdit::new().with_description("pip, pytest and ruff"),
            )
            .await
            .expect("update should succeed");

        let revisions = service
            .get(created.id())
            .await
            .expect("revisions should load");
        assert_eq!(revised.revision(), 1);
        assert_eq!(revisions.len(), 2);
        assert_eq!(revisions.first(), Some(&created));
        assert_eq!(revisions.last(), Some(&revised));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn update_by_another_author_is_not_found(service: TestService) {
        let created = service
            .create(request(1))
            .await
            .expect("create should succeed");

        let result = service
            .update(UserId::new(2), created.id(), TemplateEdit::new())
            .await;

        assert!(matches!(
            result,
            Err(WorkspaceConfigServiceError::NotFound(_))
        ));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn get_unknown_template_is_not_found(service: TestService) {
        let result = service.get(TemplateId::new(77)).await;
        assert!(matches!(
            result,
            Err(WorkspaceConfigServiceError::NotFound(_))
        ));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn counters_apply_to_one_revision(service: TestService) {
        let created = service
            .create(request(1))
            .await
            .expect("create should succeed");
        let revised = service
            .update(UserId::new(1), created.id(), TemplateEdit::new())
            .await
            .expect("update should succeed");

        service
            .increment_uses(revised.template_ref())
            .await
            .expect("uses should increment");
        service
            .increment_completions(revised.template_ref())
            .await
            .expect("completions should increment");

        let revisions = service
            .get(created.id())
            .await
            .expect("revisions should load");
        let counters: Vec<(i64, i64)> = revisions
            .iter()
            .map(|template| (template.uses(), template.completions()))
            .collect();
        assert_eq!(counters, vec![(0, 0), (1, 1)]);
    }

    #[rstest]
    #[case("not: [valid", ErrorKind::ConfigMalformed)]
    #[case("version: 0.2\nbase_container: img\nworking_directory: /w\nresources: {cpu: 1, mem: 1, disk: 1}\n", ErrorKind::ConfigInvalid)]
    #[case("version: 0.1\nbase_container: img\nworking_directory: /w\nresources: {cpu: 99, mem: 64, disk: 900}\n", ErrorKind::ConfigInvalid)]
    #[case("version: 0.1\nbase_container: img\nworking_directory: /w\nresources: {cpu: 6, mem: 8, disk: 101}\n", ErrorKind::ConfigInvalid)]
    #[tokio::test(flavor = "multi_thread")]
    async fn create_rejects_invalid_content(
        service: TestService,
        #[case] content: &str,
        #[case] expected: ErrorKind,
    ) {
        let result = service
            .create(CreateTemplateRequest::new(UserId::new(1), "Broken", content))
            .await;

        let Err(err) = result else {
            panic!("content should be rejected");
        };
        assert!(matches!(err, WorkspaceConfigServiceError::Content(_)));
        assert_eq!(err.kind(), expected);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn content_at_the_ceiling_is_accepted(service: TestService) {
        let content = CONTENT.replace("{cpu: 2, mem: 4, disk: 20}", "{cpu: 6, mem: 8, disk: 100}");

        let created = service
            .create(CreateTemplateRequest::new(UserId::new(1), "Large", content))
            .await
            .expect("ceiling values are allowed");

        assert_eq!(created.revision(), 0);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn update_rejects_content_over_the_ceiling(service: TestService) {
        let created = service
            .create(request(1))
            .await
            .expect("create should succeed");

        let result = service
            .update(
                UserId::new(1),
                created.id(),
                TemplateEdit::new().with_content(CONTENT.replace("cpu: 2", "cpu: 7")),
            )
            .await;

        let Err(err) = result else {
            panic!("oversized revision should be rejected");
        };
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        let revisions = service.get(created.id()).await.expect("revisions");
        assert_eq!(revisions.len(), 1);
    }
}
