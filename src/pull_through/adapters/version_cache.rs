//! Moka-backed negotiated version cache.

use crate::pull_through::ports::VersionCache;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

/// Time-bounded in-process cache of negotiated extension versions.
#[derive(Debug, Clone)]
pub struct MokaVersionCache {
    cache: Cache<String, String>,
}

impl MokaVersionCache {
    /// Creates a cache whose entries expire `ttl` after insertion.
    #[must_use]
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(max_capacity)
                .build(),
        }
    }
}

#[async_trait]
impl VersionCache for MokaVersionCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).await
    }

    async fn insert(&self, key: String, version: String) {
        self.cache.insert(key, version).await;
    }
}
