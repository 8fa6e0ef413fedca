//! Pull-through cache for editor release archives.

use super::{
    PullThroughSettings,
    error::{PullThroughError, PullThroughResult},
    tee::{open_cached, stream_and_cache},
};
use crate::pull_through::{
    domain::EditorBinary,
    ports::{ByteStream, ObjectStore, UpstreamFetcher},
};
use std::sync::Arc;

/// Body returned by a pull-through call.
pub struct CachedDownload {
    /// Bytes for the caller.
    pub body: ByteStream,
    /// Length advertised by the upstream, when the body came from upstream.
    pub content_length: Option<u64>,
    /// Whether this call started writing the cache entry.
    pub wrote_cache: bool,
}

impl std::fmt::Debug for CachedDownload {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CachedDownload")
            .field("content_length", &self.content_length)
            .field("wrote_cache", &self.wrote_cache)
            .finish_non_exhaustive()
    }
}

/// Serves editor release archives through the object store.
#[derive(Clone)]
pub struct EditorBinaryCache<S, F>
where
    S: ObjectStore,
    F: UpstreamFetcher,
{
    store: Arc<S>,
    fetcher: Arc<F>,
    release_base: String,
}

impl<S, F> EditorBinaryCache<S, F>
where
    S: ObjectStore,
    F: UpstreamFetcher,
{
    /// Creates a cache downloading from `settings.release_base`.
    #[must_use]
    pub fn new(store: Arc<S>, fetcher: Arc<F>, settings: &PullThroughSettings) -> Self {
        Self {
            store,
            fetcher,
            release_base: settings.release_base.clone(),
        }
    }

    /// Returns the archive for `binary`, downloading and caching it on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`PullThroughError::Upstream`] when the download fails and
    /// [`PullThroughError::MissingContentLength`] when the upstream does not
    /// report the archive size.
    pub async fn fetch(&self, binary: &EditorBinary) -> PullThroughResult<CachedDownload> {
        let cache_key = binary.cache_key();
        if let Some(body) = open_cached(self.store.as_ref(), &cache_key).await {
            return Ok(CachedDownload {
                body,
                content_length: None,
                wrote_cache: false,
            });
        }

        let url = binary.download_url(&self.release_base);
        let response = self.fetcher.fetch(&url).await?;
        let Some(content_length) = response.content_length else {
            return Err(PullThroughError::MissingContentLength { url });
        };
        tracing::info!(cache_key = %cache_key, url = %url, content_length, "caching editor binary");
        let (body, wrote_cache) = stream_and_cache(self.store.as_ref(), &cache_key, response).await;
        Ok(CachedDownload {
            body,
            content_length: Some(content_length),
            wrote_cache,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pull_through::adapters::memory::{
        InMemoryObjectStore, InMemoryUpstream, UpstreamFixture,
    };
    use crate::pull_through::domain::InstallType;
    use bytes::Bytes;
    use futures::TryStreamExt;
    use rstest::{fixture, rstest};

    const RELEASES: &str = "https://releases.test/download";
    const URL: &str = "https://releases.test/download/v4.9.0/code-server-4.9.0-linux-amd64.tar.gz";

    struct Harness {
        store: Arc<InMemoryObjectStore>,
        upstream: Arc<InMemoryUpstream>,
        cache: EditorBinaryCache<InMemoryObjectStore, InMemoryUpstream>,
    }

    #[fixture]
    fn harness() -> Harness {
        let store = Arc::new(InMemoryObjectStore::new());
        let upstream = Arc::new(InMemoryUpstream::new());
        let settings = PullThroughSettings {
            release_base: RELEASES.to_owned(),
            ..PullThroughSettings::default()
        };
        let cache = EditorBinaryCache::new(Arc::clone(&store), Arc::clone(&upstream), &settings);
        Harness {
            store,
            upstream,
            cache,
        }
    }

    fn binary() -> EditorBinary {
        EditorBinary::new("4.9.0", "amd64", "linux", InstallType::Tar).expect("valid binary")
    }

    async fn collect(download: CachedDownload) -> Vec<u8> {
        let chunks: Vec<Bytes> = download.body.try_collect().await.expect("body");
        chunks.concat()
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn first_call_caches_identical_bytes(harness: Harness) {
        harness
            .upstream
            .serve(URL, UpstreamFixture::new(&b"code-server archive"[..]))
            .expect("route");

        let download = harness.cache.fetch(&binary()).await.expect("fetch");
        assert!(download.wrote_cache);
        assert_eq!(download.content_length, Some(19));
        let served = collect(download).await;

        let stored = harness
            .store
            .object(&binary().cache_key())
            .expect("lookup")
            .expect("object cached");
        assert_eq!(served, stored.to_vec());
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn cached_object_skips_upstream(harness: Harness) {
        harness
            .store
            .put(&binary().cache_key(), Bytes::from_static(b"cached"))
            .expect("seed");

        let download = harness.cache.fetch(&binary()).await.expect("fetch");
        assert!(!download.wrote_cache);
        assert_eq!(collect(download).await, b"cached".to_vec());
        assert!(harness.upstream.requests().expect("requests").is_empty());
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn missing_content_length_fails(harness: Harness) {
        harness
            .upstream
            .serve(
                URL,
                UpstreamFixture::new(&b"archive"[..]).with_content_length(None),
            )
            .expect("route");

        let result = harness.cache.fetch(&binary()).await;
        assert!(matches!(
            result,
            Err(PullThroughError::MissingContentLength { .. })
        ));
        assert_eq!(harness.store.object(&binary().cache_key()).expect("lookup"), None);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn upstream_status_is_external_failure(harness: Harness) {
        let result = harness.cache.fetch(&binary()).await;
        let Err(err) = result else {
            panic!("missing upstream route should fail");
        };
        assert_eq!(err.kind(), crate::error::ErrorKind::ExternalUnavailable);
    }
}
