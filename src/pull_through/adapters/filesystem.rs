//! Capability-scoped filesystem object store.

use crate::pull_through::ports::{
    ByteStream, ObjectStore, ObjectStoreError, ObjectStoreResult, ObjectWriter,
};
use async_trait::async_trait;
use bytes::Bytes;
use cap_std::{ambient_authority, fs_utf8::Dir};
use futures::StreamExt;
use std::io::{ErrorKind, Write};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

const PARTIAL_SUFFIX: &str = ".partial";

/// Object store rooted at a directory.
///
/// Keys map to relative paths under the root. Writers stream into a
/// uniquely named `.partial` sibling that is renamed over the key on commit.
#[derive(Debug, Clone)]
pub struct FilesystemObjectStore {
    root: Arc<Dir>,
}

impl FilesystemObjectStore {
    /// Opens (creating if necessary) the store root.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Storage`] when the directory cannot be
    /// created or opened.
    pub fn open(root: &str) -> ObjectStoreResult<Self> {
        Dir::create_ambient_dir_all(root, ambient_authority()).map_err(ObjectStoreError::storage)?;
        let dir =
            Dir::open_ambient_dir(root, ambient_authority()).map_err(ObjectStoreError::storage)?;
        Ok(Self {
            root: Arc::new(dir),
        })
    }

    async fn run_blocking<F, T>(&self, f: F) -> ObjectStoreResult<T>
    where
        F: FnOnce(&Dir) -> std::io::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || f(&root))
            .await
            .map_err(ObjectStoreError::storage)?
            .map_err(ObjectStoreError::storage)
    }
}

fn validate_key(key: &str) -> ObjectStoreResult<String> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && !key.ends_with(PARTIAL_SUFFIX)
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if valid {
        Ok(key.to_owned())
    } else {
        Err(ObjectStoreError::InvalidKey(key.to_owned()))
    }
}

fn ensure_parent(dir: &Dir, key: &str) -> std::io::Result<()> {
    match key.rsplit_once('/') {
        Some((parent, _)) => dir.create_dir_all(parent),
        None => Ok(()),
    }
}

fn partial_path(key: &str) -> String {
    format!("{key}.{}{PARTIAL_SUFFIX}", Uuid::new_v4().simple())
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn get(&self, key: &str) -> ObjectStoreResult<Option<ByteStream>> {
        let path = validate_key(key)?;
        let file = self
            .run_blocking(move |dir| match dir.open(&path) {
                Ok(file) => Ok(Some(file.into_std())),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err),
            })
            .await?;
        Ok(file.map(|std_file| {
            ReaderStream::new(tokio::fs::File::from_std(std_file)).boxed()
        }))
    }

    async fn exists(&self, key: &str) -> ObjectStoreResult<bool> {
        let path = validate_key(key)?;
        self.run_blocking(move |dir| Ok(dir.is_file(&path))).await
    }

    async fn create_writer(&self, key: &str) -> ObjectStoreResult<Box<dyn ObjectWriter>> {
        let target = validate_key(key)?;
        let partial = partial_path(&target);
        let (file, created_target, created_partial) = self
            .run_blocking(move |dir| {
                ensure_parent(dir, &target)?;
                let file = dir.create(&partial)?;
                Ok((file.into_std(), target, partial))
            })
            .await?;
        Ok(Box::new(FilesystemObjectWriter {
            root: Arc::clone(&self.root),
            key: created_target,
            partial: created_partial,
            file: Some(file),
        }))
    }

    async fn delete(&self, key: &str) -> ObjectStoreResult<()> {
        let path = validate_key(key)?;
        self.run_blocking(move |dir| match dir.remove_file(&path) {
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        })
        .await
    }

    async fn copy(&self, from: &str, to: &str) -> ObjectStoreResult<bool> {
        let source = validate_key(from)?;
        let target = validate_key(to)?;
        self.run_blocking(move |dir| {
            if !dir.is_file(&source) {
                return Ok(false);
            }
            ensure_parent(dir, &target)?;
            let partial = partial_path(&target);
            dir.copy(&source, dir, &partial)?;
            dir.rename(&partial, dir, &target)?;
            Ok(true)
        })
        .await
    }
}

struct FilesystemObjectWriter {
    root: Arc<Dir>,
    key: String,
    partial: String,
    file: Option<std::fs::File>,
}

impl FilesystemObjectWriter {
    fn take_file(&mut self) -> ObjectStoreResult<std::fs::File> {
        self.file.take().ok_or_else(|| {
            ObjectStoreError::storage(std::io::Error::other(format!(
                "writer for {} already failed",
                self.key
            )))
        })
    }
}

#[async_trait]
impl ObjectWriter for FilesystemObjectWriter {
    async fn write(&mut self, chunk: Bytes) -> ObjectStoreResult<()> {
        let mut file = self.take_file()?;
        let returned = tokio::task::spawn_blocking(move || {
            file.write_all(&chunk)?;
            Ok::<_, std::io::Error>(file)
        })
        .await
        .map_err(ObjectStoreError::storage)?
        .map_err(ObjectStoreError::storage)?;
        self.file = Some(returned);
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> ObjectStoreResult<()> {
        let file = self.take_file()?;
        let root = Arc::clone(&self.root);
        let partial = self.partial.clone();
        let key = self.key.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            file.sync_all()?;
            drop(file);
            root.rename(&partial, &root, &key)
        })
        .await
        .map_err(ObjectStoreError::storage)?;
        if outcome.is_ok() {
            self.partial.clear();
        }
        outcome.map_err(ObjectStoreError::storage)
    }

    async fn abort(self: Box<Self>) -> ObjectStoreResult<()> {
        drop(self);
        Ok(())
    }
}

impl Drop for FilesystemObjectWriter {
    fn drop(&mut self) {
        if self.partial.is_empty() {
            return;
        }
        drop(self.file.take());
        if let Err(err) = self.root.remove_file(&self.partial) {
            tracing::debug!(
                key = %self.key,
                partial = %self.partial,
                error = %err,
                "failed to remove partial object"
            );
        }
    }
}
