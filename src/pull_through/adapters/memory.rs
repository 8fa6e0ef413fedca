//! In-memory object store and upstream fakes for tests.

use crate::pull_through::{
    domain::{ExtensionId, sort_descending},
    ports::{
        ByteStream, ExtensionMetadata, ExtensionRegistry, ObjectStore, ObjectStoreError,
        ObjectStoreResult, ObjectWriter, UpstreamError, UpstreamFetcher, UpstreamResponse,
        UpstreamResult,
    },
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

fn lock_error(err: impl ToString) -> ObjectStoreError {
    ObjectStoreError::storage(std::io::Error::other(err.to_string()))
}

/// Thread-safe in-memory object store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    state: Arc<RwLock<ObjectState>>,
}

#[derive(Debug, Default)]
struct ObjectState {
    objects: HashMap<String, Bytes>,
    commits: usize,
    discarded: usize,
    fail_writes: bool,
}

impl InMemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object directly.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Storage`] when the state lock is poisoned.
    pub fn put(&self, key: &str, contents: impl Into<Bytes>) -> ObjectStoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.objects.insert(key.to_owned(), contents.into());
        Ok(())
    }

    /// Returns a committed object's bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Storage`] when the state lock is poisoned.
    pub fn object(&self, key: &str) -> ObjectStoreResult<Option<Bytes>> {
        Ok(self.state.read().map_err(lock_error)?.objects.get(key).cloned())
    }

    /// Returns how many writers committed.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Storage`] when the state lock is poisoned.
    pub fn commit_count(&self) -> ObjectStoreResult<usize> {
        Ok(self.state.read().map_err(lock_error)?.commits)
    }

    /// Returns how many writers were dropped or aborted without committing.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Storage`] when the state lock is poisoned.
    pub fn discarded_count(&self) -> ObjectStoreResult<usize> {
        Ok(self.state.read().map_err(lock_error)?.discarded)
    }

    /// Makes every subsequent chunk write fail.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Storage`] when the state lock is poisoned.
    pub fn set_fail_writes(&self, fail: bool) -> ObjectStoreResult<()> {
        self.state.write().map_err(lock_error)?.fail_writes = fail;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, key: &str) -> ObjectStoreResult<Option<ByteStream>> {
        let contents = self.object(key)?;
        Ok(contents.map(|bytes| futures::stream::iter([Ok(bytes)]).boxed()))
    }

    async fn exists(&self, key: &str) -> ObjectStoreResult<bool> {
        Ok(self.object(key)?.is_some())
    }

    async fn create_writer(&self, key: &str) -> ObjectStoreResult<Box<dyn ObjectWriter>> {
        Ok(Box::new(InMemoryObjectWriter {
            key: key.to_owned(),
            buffer: Vec::new(),
            state: Arc::clone(&self.state),
            committed: false,
        }))
    }

    async fn delete(&self, key: &str) -> ObjectStoreResult<()> {
        self.state.write().map_err(lock_error)?.objects.remove(key);
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> ObjectStoreResult<bool> {
        let mut state = self.state.write().map_err(lock_error)?;
        let Some(contents) = state.objects.get(from).cloned() else {
            return Ok(false);
        };
        state.objects.insert(to.to_owned(), contents);
        Ok(true)
    }
}

struct InMemoryObjectWriter {
    key: String,
    buffer: Vec<u8>,
    state: Arc<RwLock<ObjectState>>,
    committed: bool,
}

#[async_trait]
impl ObjectWriter for InMemoryObjectWriter {
    async fn write(&mut self, chunk: Bytes) -> ObjectStoreResult<()> {
        if self.state.read().map_err(lock_error)?.fail_writes {
            return Err(ObjectStoreError::storage(std::io::Error::other(
                "object store rejected the write",
            )));
        }
        self.buffer.extend_from_slice(&chunk);
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> ObjectStoreResult<()> {
        let contents = Bytes::from(std::mem::take(&mut self.buffer));
        let mut state = self.state.write().map_err(lock_error)?;
        state.objects.insert(self.key.clone(), contents);
        state.commits += 1;
        drop(state);
        self.committed = true;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> ObjectStoreResult<()> {
        drop(self);
        Ok(())
    }
}

impl Drop for InMemoryObjectWriter {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Ok(mut state) = self.state.write() {
            state.discarded += 1;
        }
    }
}

/// Canned upstream response served by [`InMemoryUpstream`].
#[derive(Debug, Clone)]
pub struct UpstreamFixture {
    body: Bytes,
    content_length: Option<u64>,
    chunk_size: usize,
    fail_after_chunks: Option<usize>,
}

impl UpstreamFixture {
    /// Serves `body` with a matching `Content-Length`.
    #[must_use]
    pub fn new(contents: impl Into<Bytes>) -> Self {
        let body = contents.into();
        Self {
            content_length: u64::try_from(body.len()).ok(),
            body,
            chunk_size: 4,
            fail_after_chunks: None,
        }
    }

    /// Overrides the advertised `Content-Length`.
    #[must_use]
    pub const fn with_content_length(mut self, content_length: Option<u64>) -> Self {
        self.content_length = content_length;
        self
    }

    /// Sets the body chunk size.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Fails the body stream after `chunks` chunks.
    #[must_use]
    pub const fn failing_after(mut self, chunks: usize) -> Self {
        self.fail_after_chunks = Some(chunks);
        self
    }

    fn response(&self) -> UpstreamResponse {
        let mut items: Vec<std::io::Result<Bytes>> = self
            .body
            .chunks(self.chunk_size.max(1))
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        if let Some(limit) = self.fail_after_chunks {
            items.truncate(limit);
            items.push(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "upstream reset the connection",
            )));
        }
        UpstreamResponse {
            content_length: self.content_length,
            body: futures::stream::iter(items).boxed(),
        }
    }
}

/// URL-keyed fake for [`UpstreamFetcher`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryUpstream {
    state: Arc<RwLock<UpstreamState>>,
}

#[derive(Debug, Default)]
struct UpstreamState {
    fixtures: HashMap<String, UpstreamFixture>,
    requests: Vec<String>,
}

fn upstream_lock_error(err: impl ToString) -> UpstreamError {
    UpstreamError::transport(std::io::Error::other(err.to_string()))
}

impl InMemoryUpstream {
    /// Creates a fake with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `fixture` at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Transport`] when the state lock is poisoned.
    pub fn serve(&self, url: impl Into<String>, fixture: UpstreamFixture) -> UpstreamResult<()> {
        self.state
            .write()
            .map_err(upstream_lock_error)?
            .fixtures
            .insert(url.into(), fixture);
        Ok(())
    }

    /// Returns every requested URL in order.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Transport`] when the state lock is poisoned.
    pub fn requests(&self) -> UpstreamResult<Vec<String>> {
        Ok(self.state.read().map_err(upstream_lock_error)?.requests.clone())
    }
}

#[async_trait]
impl UpstreamFetcher for InMemoryUpstream {
    async fn fetch(&self, url: &str) -> UpstreamResult<UpstreamResponse> {
        let mut state = self.state.write().map_err(upstream_lock_error)?;
        state.requests.push(url.to_owned());
        state
            .fixtures
            .get(url)
            .map(UpstreamFixture::response)
            .ok_or_else(|| UpstreamError::Status {
                url: url.to_owned(),
                status: 404,
            })
    }
}

#[derive(Debug, Clone)]
struct PublishedVersion {
    engine: Option<String>,
    package: Bytes,
}

/// Fake extension registry.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExtensionRegistry {
    state: Arc<RwLock<RegistryState>>,
}

#[derive(Debug, Default)]
struct RegistryState {
    extensions: HashMap<ExtensionId, HashMap<String, PublishedVersion>>,
    metadata_requests: usize,
    downloads: usize,
}

impl InMemoryExtensionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a version with an optional `engines.vscode` range.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Transport`] when the state lock is poisoned.
    pub fn publish(
        &self,
        extension: &ExtensionId,
        version: &str,
        vscode_engine: Option<&str>,
        package: impl Into<Bytes>,
    ) -> UpstreamResult<()> {
        let mut state = self.state.write().map_err(upstream_lock_error)?;
        state.extensions.entry(extension.clone()).or_default().insert(
            version.to_owned(),
            PublishedVersion {
                engine: vscode_engine.map(str::to_owned),
                package: package.into(),
            },
        );
        Ok(())
    }

    /// Returns how many metadata documents were requested.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Transport`] when the state lock is poisoned.
    pub fn metadata_requests(&self) -> UpstreamResult<usize> {
        Ok(self.state.read().map_err(upstream_lock_error)?.metadata_requests)
    }

    /// Returns how many packages were downloaded.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Transport`] when the state lock is poisoned.
    pub fn download_count(&self) -> UpstreamResult<usize> {
        Ok(self.state.read().map_err(upstream_lock_error)?.downloads)
    }
}

fn not_published(extension: &ExtensionId) -> UpstreamError {
    UpstreamError::Status {
        url: format!("registry://{extension}"),
        status: 404,
    }
}

#[async_trait]
impl ExtensionRegistry for InMemoryExtensionRegistry {
    async fn metadata(
        &self,
        extension: &ExtensionId,
        version: Option<&str>,
    ) -> UpstreamResult<ExtensionMetadata> {
        let mut state = self.state.write().map_err(upstream_lock_error)?;
        state.metadata_requests += 1;
        let versions = state
            .extensions
            .get(extension)
            .ok_or_else(|| not_published(extension))?;

        let selected = match version {
            Some(requested) => requested.to_owned(),
            None => sort_descending(versions.keys().cloned())
                .into_iter()
                .next()
                .ok_or_else(|| not_published(extension))?,
        };
        let published = versions
            .get(&selected)
            .ok_or_else(|| not_published(extension))?;

        let mut all_versions: Vec<String> = versions.keys().cloned().collect();
        all_versions.push("latest".to_owned());
        Ok(ExtensionMetadata {
            engines: published
                .engine
                .iter()
                .map(|range| ("vscode".to_owned(), range.clone()))
                .collect(),
            version: selected,
            all_versions,
            download_url: None,
        })
    }

    async fn download(
        &self,
        extension: &ExtensionId,
        version: &str,
    ) -> UpstreamResult<UpstreamResponse> {
        let mut state = self.state.write().map_err(upstream_lock_error)?;
        state.downloads += 1;
        let package = state
            .extensions
            .get(extension)
            .and_then(|versions| versions.get(version))
            .map(|published| published.package.clone())
            .ok_or_else(|| not_published(extension))?;
        Ok(UpstreamFixture::new(package).response())
    }
}

