use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::json;

use crate::media_types::{Collection, ItemPage, ListFilter, MediaItem, MediaListEntry};
use crate::size_descriptor::SizeDescriptor;

/// Timeout for metadata and listing calls.
const METADATA_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for resized-image byte fetches.
const IMAGE_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_API_BASE: &str = "https://photoslibrary.googleapis.com";

/// Error types for remote service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Http(reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("service returned status {0}")]
    Status(u16),
    #[error("unexpected response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::Timeout
        } else {
            ServiceError::Http(err)
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Capability surface of the remote photo service. The engine only consumes
/// this contract; authentication and credential refresh live behind the
/// implementation.
#[async_trait]
pub trait PhotoService: Send + Sync {
    /// One page of a collection listing. Passing the continuation token from
    /// the previous page resumes the traversal.
    async fn list_items(
        &self,
        filter: &ListFilter,
        page_size: u32,
        page_token: Option<&str>,
    ) -> ServiceResult<ItemPage>;

    /// Resolve one item by id, yielding a fresh base URL.
    async fn get_item(&self, item_id: &str) -> ServiceResult<MediaItem>;

    /// Collection metadata (title, cover item).
    async fn get_collection(&self, collection_id: &str) -> ServiceResult<Collection>;

    /// Resized rendition bytes: plain GET of the base URL with the size
    /// descriptor appended.
    async fn fetch_resized(
        &self,
        base_url: &str,
        descriptor: &SizeDescriptor,
    ) -> ServiceResult<Vec<u8>>;
}

/// Search response as it appears on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    media_items: Vec<MediaListEntry>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// reqwest-backed [`PhotoService`]. The access token is provided by the
/// embedding application; expired credentials simply surface as failed calls
/// until the caller swaps in a refreshed token.
pub struct HttpPhotoService {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl HttpPhotoService {
    pub fn new(access_token: impl Into<String>) -> ServiceResult<Self> {
        Self::with_api_base(DEFAULT_API_BASE, access_token)
    }

    pub fn with_api_base(
        api_base: impl Into<String>,
        access_token: impl Into<String>,
    ) -> ServiceResult<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Replace the bearer token after the embedding application refreshed
    /// credentials.
    pub fn set_access_token(&mut self, access_token: impl Into<String>) {
        self.access_token = access_token.into();
    }

    fn check_status(response: reqwest::Response) -> ServiceResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl PhotoService for HttpPhotoService {
    async fn list_items(
        &self,
        filter: &ListFilter,
        page_size: u32,
        page_token: Option<&str>,
    ) -> ServiceResult<ItemPage> {
        let mut body = filter.to_search_body();
        body["pageSize"] = json!(page_size);
        if let Some(token) = page_token {
            body["pageToken"] = json!(token);
        }

        debug!("Listing items: {:?} (token present: {})", filter, page_token.is_some());
        let response = self
            .http
            .post(format!("{}/v1/mediaItems:search", self.api_base))
            .bearer_auth(&self.access_token)
            .timeout(METADATA_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let wire: SearchResponse = Self::check_status(response)?
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        Ok(ItemPage {
            items: wire.media_items,
            next_page_token: wire.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn get_item(&self, item_id: &str) -> ServiceResult<MediaItem> {
        let response = self
            .http
            .get(format!("{}/v1/mediaItems/{}", self.api_base, item_id))
            .bearer_auth(&self.access_token)
            .timeout(METADATA_TIMEOUT)
            .send()
            .await?;

        Self::check_status(response)?
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))
    }

    async fn get_collection(&self, collection_id: &str) -> ServiceResult<Collection> {
        let response = self
            .http
            .get(format!("{}/v1/albums/{}", self.api_base, collection_id))
            .bearer_auth(&self.access_token)
            .timeout(METADATA_TIMEOUT)
            .send()
            .await?;

        Self::check_status(response)?
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))
    }

    async fn fetch_resized(
        &self,
        base_url: &str,
        descriptor: &SizeDescriptor,
    ) -> ServiceResult<Vec<u8>> {
        let url = format!("{}{}", base_url, descriptor);
        debug!("Fetching {}", url);
        let response = self.http.get(url).timeout(IMAGE_TIMEOUT).send().await?;
        let bytes = Self::check_status(response)?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
