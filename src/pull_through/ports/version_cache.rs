//! Cache of negotiated extension versions.

use async_trait::async_trait;

/// Maps negotiation keys to concrete extension versions.
///
/// Entries expire after the adapter's time-to-live. Concurrent inserts for
/// the same key resolve last-writer-wins.
#[async_trait]
pub trait VersionCache: Send + Sync {
    /// Returns the cached version for `key`.
    async fn get(&self, key: &str) -> Option<String>;

    /// Stores `version` under `key`.
    async fn insert(&self, key: String, version: String);
}
