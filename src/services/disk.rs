use crate::models::{Entry, EntryKind};
use crate::services::resolver::{RemotePath, encode_query_value};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://cloud-api.yandex.net/v1/disk/public";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiskError {
    #[error("listing unavailable: {0}")]
    ListingUnavailable(String),

    #[error("download of {path} failed: {reason}")]
    Download { path: String, reason: String },
}

impl DiskError {
    pub fn download(path: &str, reason: impl Into<String>) -> Self {
        DiskError::Download {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Public-resources API of the storage provider.
#[async_trait]
pub trait DiskApi: Send + Sync {
    /// First page of the shared folder's items.
    async fn list(&self, public_key: &str) -> Result<Vec<Entry>, DiskError>;

    /// Short-lived direct link for one file of the share.
    async fn download_link(&self, public_key: &str, path: &RemotePath)
    -> Result<String, DiskError>;

    /// Raw bytes behind a link returned by [`DiskApi::download_link`].
    async fn fetch(&self, href: &str, path: &RemotePath) -> Result<Bytes, DiskError>;
}

#[derive(Deserialize)]
struct ResourceListing {
    #[serde(rename = "_embedded", default)]
    embedded: Option<EmbeddedItems>,
}

#[derive(Deserialize)]
struct EmbeddedItems {
    #[serde(default)]
    items: Vec<ResourceItem>,
}

#[derive(Deserialize)]
struct ResourceItem {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    size: Option<u64>,
    mime_type: Option<String>,
    media_type: Option<String>,
    modified: Option<String>,
    preview: Option<String>,
}

impl From<ResourceItem> for Entry {
    fn from(item: ResourceItem) -> Self {
        Entry {
            kind: EntryKind::from_provider(&item.kind),
            name: item.name,
            path: item.path,
            raw_type: item.kind,
            size: item.size,
            mime_type: item.mime_type,
            media_type: item.media_type,
            modified: item.modified,
            preview: item.preview,
        }
    }
}

#[derive(Deserialize)]
struct DownloadLink {
    href: Option<String>,
}

/// reqwest-backed client for the provider's public API.
pub struct PublicDiskClient {
    http: reqwest::Client,
    base_url: String,
}

impl PublicDiskClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DiskApi for PublicDiskClient {
    async fn list(&self, public_key: &str) -> Result<Vec<Entry>, DiskError> {
        let url = format!("{}/resources", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("public_key", public_key)])
            .send()
            .await
            .map_err(|e| DiskError::ListingUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiskError::ListingUnavailable(format!(
                "provider answered {}",
                status
            )));
        }

        let listing: ResourceListing = response
            .json()
            .await
            .map_err(|e| DiskError::ListingUnavailable(format!("malformed listing: {}", e)))?;

        let entries: Vec<Entry> = listing
            .embedded
            .map(|embedded| embedded.items.into_iter().map(Entry::from).collect())
            .unwrap_or_default();

        tracing::debug!("📂 Listed {} items for share", entries.len());
        Ok(entries)
    }

    async fn download_link(
        &self,
        public_key: &str,
        path: &RemotePath,
    ) -> Result<String, DiskError> {
        // The path is already percent-encoded; reqwest's query builder would
        // encode it a second time.
        let url = format!(
            "{}/resources/download?public_key={}&path={}",
            self.base_url,
            encode_query_value(public_key),
            path.encoded()
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DiskError::download(path.original(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiskError::download(
                path.original(),
                format!("download link request answered {}", status),
            ));
        }

        let link: DownloadLink = response
            .json()
            .await
            .map_err(|e| DiskError::download(path.original(), format!("malformed link: {}", e)))?;

        link.href
            .filter(|href| !href.is_empty())
            .ok_or_else(|| DiskError::download(path.original(), "provider returned no href"))
    }

    async fn fetch(&self, href: &str, path: &RemotePath) -> Result<Bytes, DiskError> {
        let response = self
            .http
            .get(href)
            .send()
            .await
            .map_err(|e| DiskError::download(path.original(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiskError::download(
                path.original(),
                format!("file request answered {}", status),
            ));
        }

        response
            .bytes()
            .await
            .map_err(|e| DiskError::download(path.original(), e.to_string()))
    }
}
