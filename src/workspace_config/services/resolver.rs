//! Resolution of `.gigo/workspace.yaml` into a granted workspace config.

use crate::error::ErrorKind;
use crate::resource_policy::{OverAllocated, UserTier, apply_resource_policy};
use crate::vcs::ports::{RepoPath, VcsClient, VcsError};
use crate::workspace::domain::{CodeSourceType, RepoId};
use crate::workspace_config::{
    domain::{ConfigParseError, ResolvedConfig, TemplateRef, WORKSPACE_CONFIG_PATH},
    ports::WorkspaceConfigRepository,
};
use std::sync::Arc;
use thiserror::Error;

/// Inputs for resolving the config of a workspace about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Kind of code source being opened.
    pub code_source: CodeSourceType,
    /// Repository holding the config file.
    pub repo_id: RepoId,
    /// Commit the config is read at.
    pub commit: String,
    /// Tier of the workspace owner.
    pub tier: UserTier,
    /// Template the code source was created from, if any.
    pub template: Option<TemplateRef>,
}

/// Config after the resource policy has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedWorkspaceConfig {
    /// Config carrying the granted resources.
    pub config: ResolvedConfig,
    /// Clamping record, when the request exceeded the tier ceilings.
    pub over_allocated: Option<OverAllocated>,
    /// Explanation of the clamped dimensions.
    pub message: Option<String>,
}

/// Errors raised while resolving a workspace config.
#[derive(Debug, Error)]
pub enum ConfigResolutionError {
    /// The repository id is unknown to the VCS server.
    #[error("repository {0} not found")]
    RepoNotFound(RepoId),

    /// The config file is absent or empty at the requested commit.
    #[error(".gigo/workspace.yaml not found in {repo} at {commit}")]
    ConfigNotFound {
        /// Repository searched.
        repo: RepoPath,
        /// Commit searched.
        commit: String,
    },

    /// The config file was rejected.
    #[error(transparent)]
    Parse(#[from] ConfigParseError),

    /// The VCS server failed.
    #[error(transparent)]
    Vcs(#[from] VcsError),
}

impl ConfigResolutionError {
    /// Classifies the failure for callers.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RepoNotFound(_) | Self::Vcs(VcsError::RepoNotFound(_)) => ErrorKind::NotFound,
            Self::ConfigNotFound { .. } => ErrorKind::ConfigNotFound,
            Self::Parse(ConfigParseError::Malformed(_)) => ErrorKind::ConfigMalformed,
            Self::Parse(ConfigParseError::Invalid(_)) => ErrorKind::ConfigInvalid,
            Self::Vcs(_) => ErrorKind::ExternalUnavailable,
        }
    }
}

/// Result type for config resolution.
pub type ConfigResolutionResult<T> = Result<T, ConfigResolutionError>;

/// Reads, validates and clamps workspace configs.
pub struct WorkspaceConfigResolver<V, T>
where
    V: VcsClient + ?Sized,
    T: WorkspaceConfigRepository + ?Sized,
{
    vcs: Arc<V>,
    templates: Arc<T>,
}

impl<V, T> Clone for WorkspaceConfigResolver<V, T>
where
    V: VcsClient + ?Sized,
    T: WorkspaceConfigRepository + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            vcs: Arc::clone(&self.vcs),
            templates: Arc::clone(&self.templates),
        }
    }
}

impl<V, T> WorkspaceConfigResolver<V, T>
where
    V: VcsClient + ?Sized,
    T: WorkspaceConfigRepository + ?Sized,
{
    /// Creates a resolver.
    #[must_use]
    pub const fn new(vcs: Arc<V>, templates: Arc<T>) -> Self {
        Self { vcs, templates }
    }

    /// Resolves the config for a new workspace and applies the tier policy.
    ///
    /// Byte workspaces short-circuit to the built-in config. For other code
    /// sources, a config that matches the referenced template revision bumps
    /// that revision's completion counter; failures there are only logged.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigResolutionError`] when the repository or config file
    /// cannot be read or the config is malformed or invalid.
    pub async fn resolve(
        &self,
        request: &ResolveRequest,
    ) -> ConfigResolutionResult<ResolvedWorkspaceConfig> {
        let requested = if request.code_source == CodeSourceType::Byte {
            ResolvedConfig::byte_default()
        } else {
            let config = self.load(request.repo_id, &request.commit).await?;
            if let Some(template_ref) = request.template {
                self.record_completion(template_ref, &config).await;
            }
            config
        };

        let decision = apply_resource_policy(request.tier, requested.resources());
        Ok(ResolvedWorkspaceConfig {
            config: requested.with_resources(decision.granted),
            over_allocated: decision.over_allocated,
            message: decision.message,
        })
    }

    /// Reads and validates the config at `commit` without touching counters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigResolutionError`] when the repository or config file
    /// cannot be read or the config is malformed or invalid.
    pub async fn load(&self, repo_id: RepoId, commit: &str) -> ConfigResolutionResult<ResolvedConfig> {
        let repo = self
            .vcs
            .find_repo(repo_id)
            .await?
            .ok_or(ConfigResolutionError::RepoNotFound(repo_id))?;

        let contents = self
            .vcs
            .read_file(&repo.path, commit, WORKSPACE_CONFIG_PATH)
            .await?
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| ConfigResolutionError::ConfigNotFound {
                repo: repo.path.clone(),
                commit: commit.to_owned(),
            })?;

        Ok(ResolvedConfig::parse(&contents)?)
    }

    /// Returns the editor working directory for an existing workspace.
    ///
    /// The config is read fresh because it may have been edited since the
    /// workspace was created.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigResolutionError`] when the config cannot be loaded.
    pub async fn working_directory(
        &self,
        code_source: CodeSourceType,
        repo_id: RepoId,
        commit: &str,
    ) -> ConfigResolutionResult<String> {
        if code_source == CodeSourceType::Byte {
            return Ok(ResolvedConfig::byte_default().working_directory().to_owned());
        }
        let config = self.load(repo_id, commit).await?;
        Ok(config.working_directory().to_owned())
    }

    async fn record_completion(&self, template_ref: TemplateRef, resolved: &ResolvedConfig) {
        let template = match self.templates.find_revision(template_ref).await {
            Ok(Some(template)) => template,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(template = %template_ref, error = %err, "failed to load template for completion count");
                return;
            }
        };

        let Ok(reference) = ResolvedConfig::parse(template.content().as_bytes()) else {
            tracing::debug!(template = %template_ref, "template content does not parse; skipping completion count");
            return;
        };
        if !reference.structurally_matches(resolved) {
            return;
        }

        if let Err(err) = self.templates.increment_completions(template_ref).await {
            tracing::warn!(template = %template_ref, error = %err, "failed to record template completion");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_policy::ResourceSpec;
    use crate::vcs::adapters::InMemoryVcs;
    use crate::workspace::domain::UserId;
    use crate::workspace_config::{
        adapters::memory::InMemoryWorkspaceConfigRepository,
        domain::{NewTemplateData, TemplateId, WorkspaceTemplate},
        ports::WorkspaceConfigRepository,
    };
    use mockable::DefaultClock;
    use rstest::{fixture, rstest};

    const CONFIG: &str = "\
version: 0.1
base_container: img:1
working_directory: /w
resources:
  cpu: 1
  mem: 2
  disk: 5
";

    struct Harness {
        vcs: Arc<InMemoryVcs>,
        templates: Arc<InMemoryWorkspaceConfigRepository>,
        resolver: WorkspaceConfigResolver<InMemoryVcs, InMemoryWorkspaceConfigRepository>,
        repo_id: RepoId,
    }

    #[fixture]
    fn harness() -> Harness {
        let vcs = Arc::new(InMemoryVcs::new());
        let templates = Arc::new(InMemoryWorkspaceConfigRepository::new());
        let repo = vcs
            .create_repo(RepoPath::new("100", "challenge"))
            .expect("repo should be created");
        vcs.put_file(&repo.path, "c1", WORKSPACE_CONFIG_PATH, CONFIG)
            .expect("file should be written");
        Harness {
            resolver: WorkspaceConfigResolver::new(Arc::clone(&vcs), Arc::clone(&templates)),
            vcs,
            templates,
            repo_id: repo.id,
        }
    }

    fn request(repo_id: RepoId, commit: &str, template: Option<TemplateRef>) -> ResolveRequest {
        ResolveRequest {
            code_source: CodeSourceType::Post,
            repo_id,
            commit: commit.to_owned(),
            tier: UserTier::Basic,
            template,
        }
    }

    async fn seed_template(harness: &Harness, content: &str) -> TemplateRef {
        let template = WorkspaceTemplate::new(
            NewTemplateData {
                id: TemplateId::new(9),
                author_id: UserId::new(1),
                title: "starter".to_owned(),
                description: String::new(),
                content: content.to_owned(),
                tags: Vec::new(),
                languages: Vec::new(),
            },
            &DefaultClock,
        )
        .expect("template should be valid");
        harness
            .templates
            .insert(&template)
            .await
            .expect("template should be stored");
        template.template_ref()
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn resolves_repository_config(harness: Harness) {
        let resolved = harness
            .resolver
            .resolve(&request(harness.repo_id, "c1", None))
            .await
            .expect("config should resolve");

        assert_eq!(resolved.config.working_directory(), "/w");
        assert_eq!(resolved.config.resources(), ResourceSpec::new(1, 2, 5));
        assert!(resolved.over_allocated.is_none());
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn missing_file_is_config_not_found(harness: Harness) {
        let result = harness
            .resolver
            .resolve(&request(harness.repo_id, "other-commit", None))
            .await;
        assert!(matches!(
            result,
            Err(ConfigResolutionError::ConfigNotFound { .. })
        ));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_repository_is_reported(harness: Harness) {
        let result = harness
            .resolver
            .resolve(&request(RepoId::new(404), "c1", None))
            .await;
        assert!(matches!(result, Err(ConfigResolutionError::RepoNotFound(_))));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn byte_workspaces_skip_the_repository(harness: Harness) {
        let mut byte_request = request(RepoId::NONE, "", None);
        byte_request.code_source = CodeSourceType::Byte;

        let resolved = harness
            .resolver
            .resolve(&byte_request)
            .await
            .expect("byte config should resolve");

        assert_eq!(resolved.config, ResolvedConfig::byte_default());
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn matching_template_gains_a_completion(harness: Harness) {
        let template_ref = seed_template(&harness, CONFIG).await;

        harness
            .resolver
            .resolve(&request(harness.repo_id, "c1", Some(template_ref)))
            .await
            .expect("config should resolve");

        let stored = harness
            .templates
            .find_revision(template_ref)
            .await
            .expect("lookup should succeed")
            .expect("template should exist");
        assert_eq!(stored.completions(), 1);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn edited_config_does_not_count_as_completion(harness: Harness) {
        let template_ref = seed_template(&harness, &CONFIG.replace("img:1", "img:2")).await;

        harness
            .resolver
            .resolve(&request(harness.repo_id, "c1", Some(template_ref)))
            .await
            .expect("config should resolve");

        let stored = harness
            .templates
            .find_revision(template_ref)
            .await
            .expect("lookup should succeed")
            .expect("template should exist");
        assert_eq!(stored.completions(), 0);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn counter_failure_does_not_fail_resolution(harness: Harness) {
        let template_ref = seed_template(&harness, CONFIG).await;
        harness
            .templates
            .fail_counter_updates(true)
            .expect("failure injection should apply");

        let result = harness
            .resolver
            .resolve(&request(harness.repo_id, "c1", Some(template_ref)))
            .await;

        assert!(result.is_ok());
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn working_directory_reflects_latest_file(harness: Harness) {
        let repo = RepoPath::new("100", "challenge");
        harness
            .vcs
            .put_file(
                &repo,
                "c1",
                WORKSPACE_CONFIG_PATH,
                CONFIG.replace("/w", "/workspace"),
            )
            .expect("file should be rewritten");

        let directory = harness
            .resolver
            .working_directory(CodeSourceType::Post, harness.repo_id, "c1")
            .await
            .expect("directory should resolve");

        assert_eq!(directory, "/workspace");
    }
}
