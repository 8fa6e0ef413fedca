//! Upstream download and extension registry ports.

use super::ByteStream;
use crate::pull_through::domain::ExtensionId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Result type for upstream operations.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Successful upstream response.
pub struct UpstreamResponse {
    /// Parsed `Content-Length`, when the upstream sent a valid one.
    pub content_length: Option<u64>,
    /// Response body.
    pub body: ByteStream,
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("UpstreamResponse")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Plain HTTP GET against an upstream release host.
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    /// Fetches `url`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Status`] for any status other than 200 and
    /// [`UpstreamError::Transport`] when the request fails.
    async fn fetch(&self, url: &str) -> UpstreamResult<UpstreamResponse>;
}

/// Metadata for one extension version as reported by the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionMetadata {
    /// Concrete version described by this document.
    pub version: String,
    /// Engine compatibility ranges, keyed by engine (`vscode`).
    pub engines: HashMap<String, String>,
    /// Every published version, possibly including the `latest` alias.
    pub all_versions: Vec<String>,
    /// Package download location, when the registry advertises one.
    pub download_url: Option<String>,
}

/// Editor extension registry.
#[async_trait]
pub trait ExtensionRegistry: Send + Sync {
    /// Loads metadata for `version`, or for the latest version when `None`.
    async fn metadata(
        &self,
        extension: &ExtensionId,
        version: Option<&str>,
    ) -> UpstreamResult<ExtensionMetadata>;

    /// Starts downloading the package for a concrete version.
    async fn download(
        &self,
        extension: &ExtensionId,
        version: &str,
    ) -> UpstreamResult<UpstreamResponse>;
}

/// Errors returned by upstream adapters.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// The upstream answered with an unexpected status.
    #[error("unexpected status {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The request could not be completed.
    #[error("upstream request failed: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),

    /// The upstream response could not be decoded.
    #[error("upstream response could not be decoded: {0}")]
    Decode(Arc<dyn std::error::Error + Send + Sync>),
}

impl UpstreamError {
    /// Wraps a transport failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Wraps a decoding failure.
    pub fn decode(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Decode(Arc::new(err))
    }
}
