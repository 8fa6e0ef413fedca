//! Forking a challenge repository into a learner-owned attempt.

use super::WorkspacePorts;
use crate::error::ErrorKind;
use crate::resource_policy::UserTier;
use crate::vcs::ports::{AccessLevel, RepoInfo, RepoPath, VcsCredentials, VcsError};
use crate::workspace::{
    domain::{Attempt, AttemptId, Caller, PostId, PostRecord, PostVisibility, UserId},
    ports::CodeSourceRepositoryError,
};
use crate::workspace_config::domain::TemplateRef;
use mockable::Clock;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

const ATTEMPT_CREATED_MESSAGE: &str = "Attempt created successfully.";
const ALREADY_STARTED_MESSAGE: &str = "You have already started an attempt. Keep working on that one!";
const PARENT_NOT_PUBLISHED_MESSAGE: &str = "Attempt must be published first.";

/// Request to start an attempt on a challenge post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartAttemptRequest {
    /// Challenge being attempted.
    pub post_id: PostId,
    /// Published attempt to fork instead of the post's own repository.
    pub parent_attempt: Option<AttemptId>,
}

impl StartAttemptRequest {
    /// Creates a request forking the post's repository.
    #[must_use]
    pub const fn new(post_id: PostId) -> Self {
        Self {
            post_id,
            parent_attempt: None,
        }
    }

    /// Forks a published attempt instead of the post.
    #[must_use]
    pub const fn with_parent(mut self, parent_attempt: AttemptId) -> Self {
        self.parent_attempt = Some(parent_attempt);
        self
    }
}

/// How a start-attempt request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartAttemptOutcome {
    /// A fork and attempt row were created.
    Started {
        /// The recorded attempt.
        attempt: Attempt,
        /// The caller-owned fork.
        repo: RepoInfo,
    },
    /// The caller already has an attempt on this post; nothing was created.
    AlreadyStarted(AttemptId),
    /// The parent attempt is not published yet; nothing was created.
    ParentNotPublished(AttemptId),
}

/// Result of a start-attempt request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedAttempt {
    /// What happened.
    pub outcome: StartAttemptOutcome,
    /// Short message for the UI.
    pub user_message: String,
}

impl StartedAttempt {
    fn new(outcome: StartAttemptOutcome) -> Self {
        let user_message = match outcome {
            StartAttemptOutcome::Started { .. } => ATTEMPT_CREATED_MESSAGE,
            StartAttemptOutcome::AlreadyStarted(_) => ALREADY_STARTED_MESSAGE,
            StartAttemptOutcome::ParentNotPublished(_) => PARENT_NOT_PUBLISHED_MESSAGE,
        };
        Self {
            outcome,
            user_message: user_message.to_owned(),
        }
    }
}

/// Errors raised while starting an attempt.
#[derive(Debug, Error)]
pub enum AttemptForkError {
    /// The challenge post does not exist.
    #[error("post {0} not found")]
    PostNotFound(PostId),

    /// The parent attempt does not exist.
    #[error("attempt {0} not found")]
    ParentNotFound(AttemptId),

    /// Exclusive challenges must be purchased first.
    #[error("post {0} is exclusive")]
    Exclusive(PostId),

    /// Premium challenges require a premium account.
    #[error("post {post_id} requires a premium account; user {user_id} is basic")]
    PremiumRequired {
        /// Gated post.
        post_id: PostId,
        /// Caller.
        user_id: UserId,
    },

    /// The caller's session carries no service key for the VCS server.
    #[error("user {0} has no VCS service key")]
    MissingServiceKey(UserId),

    /// The VCS server failed.
    #[error(transparent)]
    Vcs(#[from] VcsError),

    /// Attempt persistence failed.
    #[error(transparent)]
    CodeSources(#[from] CodeSourceRepositoryError),
}

/// Result type for attempt forking.
pub type AttemptForkResult<T> = Result<T, AttemptForkError>;

impl AttemptForkError {
    /// Classifies the failure for callers.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PostNotFound(_)
            | Self::ParentNotFound(_)
            | Self::Vcs(VcsError::RepoNotFound(_)) => ErrorKind::NotFound,
            Self::Exclusive(_) | Self::PremiumRequired { .. } | Self::MissingServiceKey(_) => {
                ErrorKind::Forbidden
            }
            Self::Vcs(_) | Self::CodeSources(_) => ErrorKind::ExternalUnavailable,
        }
    }

    /// Returns the message shown to the learner.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Exclusive(_) => "You can't start this attempt yet. This Challenge is an Exclusive \
                                   Challenge and must be purchased."
                .to_owned(),
            Self::PremiumRequired { .. } => "You can't start this attempt yet. This Challenge is a \
                                             Premium Challenge and is only accessible to Premium \
                                             users."
                .to_owned(),
            Self::ParentNotFound(_) => "We couldn't find that Attempt.".to_owned(),
            Self::PostNotFound(_) | Self::MissingServiceKey(_) | Self::Vcs(_) | Self::CodeSources(_) => {
                "Failed to start attempt.".to_owned()
            }
        }
    }
}

/// Object-store key of the thumbnail belonging to `id` under `scope`.
///
/// Keys are sharded by the lowercase hex SHA-256 of the decimal id:
/// `<scope>/<h[0..3]>/<h[3..6]>/<h>/thumbnail.jpg`.
#[must_use]
pub fn thumbnail_key(scope: &str, id: impl fmt::Display) -> String {
    let hash = format!("{:x}", Sha256::digest(id.to_string().as_bytes()));
    let shard: String = hash.chars().take(3).collect();
    let sub_shard: String = hash.chars().skip(3).take(3).collect();
    format!("{scope}/{shard}/{sub_shard}/{hash}/thumbnail.jpg")
}

/// Starts attempts by forking challenge repositories.
pub struct AttemptForkService<C>
where
    C: Clock + Send + Sync,
{
    ports: WorkspacePorts,
    clock: Arc<C>,
}

impl<C> Clone for AttemptForkService<C>
where
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            ports: self.ports.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C> AttemptForkService<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an attempt fork service.
    #[must_use]
    pub const fn new(ports: WorkspacePorts, clock: Arc<C>) -> Self {
        Self { ports, clock }
    }

    /// Starts an attempt for the caller.
    ///
    /// The caller is granted read access on the source repository for the
    /// duration of the fork; the grant is revoked whether or not the fork
    /// succeeds. If recording the attempt fails, the fork is left for
    /// garbage collection.
    ///
    /// # Errors
    ///
    /// Returns [`AttemptForkError`] when the post or parent is missing, the
    /// caller is not allowed to attempt the post, or the VCS server or
    /// persistence fails.
    pub async fn start_attempt(
        &self,
        caller: &Caller,
        request: StartAttemptRequest,
    ) -> AttemptForkResult<StartedAttempt> {
        let (started, template) = self.fork_attempt(caller, request).await?;
        if let Some(template_ref) = template {
            self.count_template_use(template_ref).await;
        }
        Ok(started)
    }

    /// Same as [`AttemptForkService::start_attempt`] but leaves the template
    /// use uncounted, returning the template of a freshly started attempt
    /// so the caller can count it once its own transaction commits.
    pub(super) async fn fork_attempt(
        &self,
        caller: &Caller,
        request: StartAttemptRequest,
    ) -> AttemptForkResult<(StartedAttempt, Option<TemplateRef>)> {
        let code_sources = &self.ports.code_sources;
        if let Some(existing) = code_sources
            .find_existing_attempt(caller.id(), request.post_id)
            .await?
        {
            let outcome = StartAttemptOutcome::AlreadyStarted(existing.id);
            return Ok((StartedAttempt::new(outcome), None));
        }

        let post = code_sources
            .find_post(request.post_id)
            .await?
            .ok_or(AttemptForkError::PostNotFound(request.post_id))?;
        ensure_visible(&post, caller)?;

        let source = match request.parent_attempt {
            None => RepoPath::owned_by(post.author_id, post.id),
            Some(parent_id) => {
                let parent = code_sources
                    .find_attempt(parent_id)
                    .await?
                    .ok_or(AttemptForkError::ParentNotFound(parent_id))?;
                if !parent.closed {
                    let outcome = StartAttemptOutcome::ParentNotPublished(parent_id);
                    return Ok((StartedAttempt::new(outcome), None));
                }
                RepoPath::owned_by(parent.author_id, parent.id)
            }
        };

        let credentials = VcsCredentials {
            login: caller.id().to_string(),
            password: caller
                .service_key()
                .ok_or(AttemptForkError::MissingServiceKey(caller.id()))?
                .to_owned(),
        };
        let attempt_id = AttemptId::new(self.ports.ids.next_id());
        let repo = self
            .fork_with_read_grant(&credentials, &source, &attempt_id.to_string())
            .await?;

        let attempt = Attempt {
            id: attempt_id,
            post_id: post.id,
            author_id: caller.id(),
            author_name: caller.user_name().to_owned(),
            author_tier: caller.tier(),
            title: post.title.clone(),
            description: post.description.clone(),
            repo_id: repo.id,
            parent_attempt: request.parent_attempt,
            created_at: self.clock.utc(),
        };
        if let Err(err) = code_sources.record_attempt(&attempt).await {
            tracing::warn!(
                attempt_id = %attempt_id,
                repo = %repo.path,
                error = %err,
                "attempt insert failed; fork left for garbage collection"
            );
            return Err(err.into());
        }

        self.copy_thumbnail(post.id, attempt_id).await;
        tracing::info!(
            attempt_id = %attempt_id,
            post_id = %post.id,
            author_id = %caller.id(),
            repo = %repo.path,
            "attempt started"
        );
        let started = StartedAttempt::new(StartAttemptOutcome::Started { attempt, repo });
        Ok((started, post.template))
    }

    /// Records that an attempt was started from `template_ref`. Failures are
    /// logged and swallowed.
    pub(super) async fn count_template_use(&self, template_ref: TemplateRef) {
        if let Err(err) = self.ports.templates.increment_uses(template_ref).await {
            tracing::warn!(template = %template_ref, error = %err, "failed to count template use");
        }
    }

    /// Forks `source` as the caller behind a temporary read grant.
    ///
    /// The grant, fork and revocation run on their own task, so the grant is
    /// revoked even when the caller stops waiting for the fork.
    async fn fork_with_read_grant(
        &self,
        credentials: &VcsCredentials,
        source: &RepoPath,
        new_name: &str,
    ) -> AttemptForkResult<RepoInfo> {
        let vcs = Arc::clone(&self.ports.vcs);
        let credentials = credentials.clone();
        let source = source.clone();
        let new_name = new_name.to_owned();
        let granted = tokio::spawn(
            async move {
                vcs.add_collaborator(&source, &credentials.login, AccessLevel::Read)
                    .await?;
                let forked = vcs.fork_as(&credentials, &source, &new_name).await;
                let revoked = vcs.remove_collaborator(&source, &credentials.login).await;

                let repo = forked?;
                if let Err(err) = revoked {
                    tracing::warn!(
                        repo = %source,
                        user = %credentials.login,
                        error = %err,
                        "failed to revoke read grant after fork"
                    );
                    return Err(err);
                }
                Ok(repo)
            }
            .in_current_span(),
        );
        let repo = granted.await.map_err(VcsError::unavailable)??;
        Ok(repo)
    }

    async fn copy_thumbnail(&self, post_id: PostId, attempt_id: AttemptId) {
        let from = thumbnail_key("post", post_id);
        let to = thumbnail_key("attempt", attempt_id);
        match self.ports.objects.copy(&from, &to).await {
            Ok(true) => tracing::debug!(%attempt_id, key = %to, "attempt thumbnail copied"),
            Ok(false) => tracing::debug!(%post_id, key = %from, "post has no thumbnail"),
            Err(err) => tracing::warn!(
                %attempt_id,
                error = %err,
                "failed to copy attempt thumbnail"
            ),
        }
    }
}

fn ensure_visible(post: &PostRecord, caller: &Caller) -> AttemptForkResult<()> {
    match post.visibility {
        PostVisibility::Exclusive => Err(AttemptForkError::Exclusive(post.id)),
        PostVisibility::Premium if caller.tier() != UserTier::Premium => {
            Err(AttemptForkError::PremiumRequired {
                post_id: post.id,
                user_id: caller.id(),
            })
        }
        PostVisibility::Public | PostVisibility::Premium | PostVisibility::Private => Ok(()),
    }
}
