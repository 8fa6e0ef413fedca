//! Streaming object storage port.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::sync::Arc;
use thiserror::Error;

/// Body stream shared by the object store and upstream ports.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Result type for object store operations.
pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

/// Byte storage keyed by opaque `/`-separated paths.
///
/// Objects written through [`ObjectWriter`] become visible only once
/// committed, so readers never observe a partially written object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Opens a committed object, returning `None` when it does not exist.
    async fn get(&self, key: &str) -> ObjectStoreResult<Option<ByteStream>>;

    /// Returns whether a committed object exists.
    async fn exists(&self, key: &str) -> ObjectStoreResult<bool>;

    /// Starts a streamed write to `key`.
    async fn create_writer(&self, key: &str) -> ObjectStoreResult<Box<dyn ObjectWriter>>;

    /// Deletes an object. Deleting a missing object succeeds.
    async fn delete(&self, key: &str) -> ObjectStoreResult<()>;

    /// Copies an object, returning `false` when the source does not exist.
    async fn copy(&self, from: &str, to: &str) -> ObjectStoreResult<bool>;
}

/// In-progress object write.
///
/// Dropping a writer without calling [`ObjectWriter::commit`] discards
/// everything written so far.
#[async_trait]
pub trait ObjectWriter: Send {
    /// Appends a chunk.
    async fn write(&mut self, chunk: Bytes) -> ObjectStoreResult<()>;

    /// Publishes the object under its key, replacing any previous object.
    async fn commit(self: Box<Self>) -> ObjectStoreResult<()>;

    /// Discards the partial object.
    async fn abort(self: Box<Self>) -> ObjectStoreResult<()>;
}

/// Errors returned by object store adapters.
#[derive(Debug, Clone, Error)]
pub enum ObjectStoreError {
    /// The key cannot be used as a storage path.
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    /// Storage backend failure.
    #[error("object storage error: {0}")]
    Storage(Arc<dyn std::error::Error + Send + Sync>),
}

impl ObjectStoreError {
    /// Wraps a storage backend error.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Arc::new(err))
    }
}
