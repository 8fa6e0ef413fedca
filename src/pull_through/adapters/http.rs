//! Reqwest-backed upstream adapters.

use crate::pull_through::{
    domain::ExtensionId,
    ports::{
        ExtensionMetadata, ExtensionRegistry, UpstreamError, UpstreamFetcher, UpstreamResponse,
        UpstreamResult,
    },
};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

fn build_client(user_agent: &str, timeout: Duration) -> UpstreamResult<Client> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(timeout)
        .build()
        .map_err(UpstreamError::transport)
}

async fn get_ok(client: &Client, url: &str) -> UpstreamResult<reqwest::Response> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(UpstreamError::transport)?;
    if response.status() != StatusCode::OK {
        return Err(UpstreamError::Status {
            url: url.to_owned(),
            status: response.status().as_u16(),
        });
    }
    Ok(response)
}

fn into_upstream_response(response: reqwest::Response) -> UpstreamResponse {
    UpstreamResponse {
        content_length: response.content_length(),
        body: response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed(),
    }
}

/// Plain HTTP GET fetcher for editor release archives.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher that identifies itself with `user_agent`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Transport`] when the HTTP client cannot be
    /// constructed.
    pub fn new(user_agent: &str, connect_timeout: Duration) -> UpstreamResult<Self> {
        Ok(Self {
            client: build_client(user_agent, connect_timeout)?,
        })
    }
}

#[async_trait]
impl UpstreamFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> UpstreamResult<UpstreamResponse> {
        tracing::debug!(url, "fetching upstream artefact");
        let response = get_ok(&self.client, url).await?;
        Ok(into_upstream_response(response))
    }
}

/// Open VSX compatible extension registry client.
#[derive(Debug, Clone)]
pub struct OpenVsxRegistry {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    version: String,
    #[serde(default)]
    engines: HashMap<String, String>,
    #[serde(default, rename = "allVersions")]
    all_versions: HashMap<String, String>,
    #[serde(default)]
    files: HashMap<String, String>,
}

impl From<RawMetadata> for ExtensionMetadata {
    fn from(raw: RawMetadata) -> Self {
        Self {
            version: raw.version,
            engines: raw.engines,
            all_versions: raw.all_versions.into_keys().collect(),
            download_url: raw.files.get("download").cloned(),
        }
    }
}

impl OpenVsxRegistry {
    /// Builds a registry client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Transport`] when the HTTP client cannot be
    /// constructed.
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        connect_timeout: Duration,
    ) -> UpstreamResult<Self> {
        Ok(Self {
            client: build_client(user_agent, connect_timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    fn metadata_url(&self, extension: &ExtensionId, version: Option<&str>) -> String {
        let publisher = urlencoding::encode(extension.publisher());
        let name = urlencoding::encode(extension.name());
        match version {
            Some(requested) => format!(
                "{}/api/{publisher}/{name}/{}",
                self.base_url,
                urlencoding::encode(requested)
            ),
            None => format!("{}/api/{publisher}/{name}", self.base_url),
        }
    }

    fn fallback_download_url(&self, extension: &ExtensionId, version: &str) -> String {
        let publisher = extension.publisher();
        let name = extension.name();
        format!(
            "{}/api/{publisher}/{name}/{version}/file/{publisher}.{name}-{version}.vsix",
            self.base_url
        )
    }
}

#[async_trait]
impl ExtensionRegistry for OpenVsxRegistry {
    async fn metadata(
        &self,
        extension: &ExtensionId,
        version: Option<&str>,
    ) -> UpstreamResult<ExtensionMetadata> {
        let url = self.metadata_url(extension, version);
        let raw: RawMetadata = get_ok(&self.client, &url)
            .await?
            .json()
            .await
            .map_err(UpstreamError::decode)?;
        Ok(raw.into())
    }

    async fn download(
        &self,
        extension: &ExtensionId,
        version: &str,
    ) -> UpstreamResult<UpstreamResponse> {
        let metadata = self.metadata(extension, Some(version)).await?;
        let url = metadata
            .download_url
            .unwrap_or_else(|| self.fallback_download_url(extension, version));
        tracing::debug!(extension = %extension, version, url = %url, "downloading extension");
        let response = get_ok(&self.client, &url).await?;
        Ok(into_upstream_response(response))
    }
}
