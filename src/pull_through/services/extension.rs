//! Pull-through cache for editor extensions with host-version negotiation.

use super::{
    CachedDownload, PullThroughSettings,
    error::{PullThroughError, PullThroughResult},
    tee::{open_cached, stream_and_cache},
};
use crate::pull_through::{
    domain::{ExtensionId, is_compatible, normalize_host_version, sort_descending},
    ports::{ExtensionMetadata, ExtensionRegistry, ObjectStore, VersionCache},
};
use std::sync::Arc;

const LATEST: &str = "latest";
const VSCODE_ENGINE: &str = "vscode";

/// Extension download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRequest {
    extension: ExtensionId,
    version: String,
    host_version: Option<String>,
}

impl ExtensionRequest {
    /// Requests the latest version of `extension`.
    #[must_use]
    pub fn latest(extension: ExtensionId) -> Self {
        Self {
            extension,
            version: LATEST.to_owned(),
            host_version: None,
        }
    }

    /// Requests a concrete version, or `latest`.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Negotiates against the given host editor version.
    #[must_use]
    pub fn with_host_version(mut self, host_version: impl Into<String>) -> Self {
        self.host_version = Some(host_version.into());
        self
    }

    /// Returns the extension identifier.
    #[must_use]
    pub const fn extension(&self) -> &ExtensionId {
        &self.extension
    }

    fn wants_latest(&self) -> bool {
        let requested = self.version.trim();
        requested.is_empty() || requested == LATEST
    }
}

/// Serves editor extension packages through the object store.
#[derive(Clone)]
pub struct ExtensionCache<S, R, V>
where
    S: ObjectStore,
    R: ExtensionRegistry,
    V: VersionCache,
{
    store: Arc<S>,
    registry: Arc<R>,
    versions: Arc<V>,
    candidate_limit: usize,
}

impl<S, R, V> ExtensionCache<S, R, V>
where
    S: ObjectStore,
    R: ExtensionRegistry,
    V: VersionCache,
{
    /// Creates an extension cache.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        registry: Arc<R>,
        versions: Arc<V>,
        settings: &PullThroughSettings,
    ) -> Self {
        Self {
            store,
            registry,
            versions,
            candidate_limit: settings.negotiation_candidates,
        }
    }

    /// Returns the package for `request`, downloading and caching on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`PullThroughError::Domain`] for an invalid host version,
    /// [`PullThroughError::NoCompatibleExtension`] when negotiation finds no
    /// candidate and [`PullThroughError::Upstream`] when the registry fails.
    pub async fn fetch(&self, request: &ExtensionRequest) -> PullThroughResult<CachedDownload> {
        let version = self.resolve_version(request).await?;
        let extension = request.extension();
        let cache_key = extension.cache_key(&version);
        if let Some(body) = open_cached(self.store.as_ref(), &cache_key).await {
            return Ok(CachedDownload {
                body,
                content_length: None,
                wrote_cache: false,
            });
        }

        let response = self.registry.download(extension, &version).await?;
        let content_length = response.content_length;
        tracing::info!(cache_key = %cache_key, extension = %extension, version = %version, "caching extension");
        let (body, wrote_cache) = stream_and_cache(self.store.as_ref(), &cache_key, response).await;
        Ok(CachedDownload {
            body,
            content_length,
            wrote_cache,
        })
    }

    /// Picks the concrete version served for `request`.
    ///
    /// A concrete requested version is used as is. For `latest` the host
    /// version, when present, is negotiated and remembered in the version
    /// cache; otherwise the registry's latest version is used.
    ///
    /// # Errors
    ///
    /// See [`ExtensionCache::fetch`].
    pub async fn resolve_version(&self, request: &ExtensionRequest) -> PullThroughResult<String> {
        if !request.wants_latest() {
            return Ok(request.version.trim().to_owned());
        }
        let extension = request.extension();
        let Some(raw_host) = request.host_version.as_deref() else {
            let latest = self.registry.metadata(extension, None).await?;
            return Ok(latest.version);
        };

        let host = normalize_host_version(raw_host)?;
        let negotiation_key = extension.negotiation_key(&host);
        if let Some(cached) = self.versions.get(&negotiation_key).await {
            tracing::debug!(extension = %extension, host_version = %host, version = %cached, "negotiated version cache hit");
            return Ok(cached);
        }

        let version = self.negotiate(extension, &host).await?;
        self.versions.insert(negotiation_key, version.clone()).await;
        Ok(version)
    }

    async fn negotiate(&self, extension: &ExtensionId, host: &str) -> PullThroughResult<String> {
        let latest = self.registry.metadata(extension, None).await?;
        let older = sort_descending(
            latest
                .all_versions
                .iter()
                .filter(|version| version.as_str() != LATEST && **version != latest.version)
                .cloned(),
        );
        let candidates: Vec<String> = std::iter::once(latest.version.clone())
            .chain(older)
            .take(self.candidate_limit)
            .collect();

        for candidate in candidates {
            let metadata = if candidate == latest.version {
                latest.clone()
            } else {
                self.registry.metadata(extension, Some(&candidate)).await?
            };
            if accepts_host(&metadata, host) {
                tracing::debug!(extension = %extension, host_version = host, version = %candidate, "negotiated extension version");
                return Ok(candidate);
            }
        }

        Err(PullThroughError::NoCompatibleExtension {
            extension: extension.to_string(),
            host_version: host.to_owned(),
        })
    }
}

fn accepts_host(metadata: &ExtensionMetadata, host: &str) -> bool {
    metadata
        .engines
        .get(VSCODE_ENGINE)
        .is_some_and(|range| is_compatible(host, range))
}
