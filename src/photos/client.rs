use crate::models::{Album, MediaItem, SearchParameters};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// A remote call failure, normalized at the collaborator boundary into one
/// tagged shape regardless of whether it came from an error body, a bare
/// HTTP status, or the transport.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("{name} ({code}): {message}")]
pub struct ApiError {
    pub name: String,
    pub code: u16,
    pub message: String,
}

impl ApiError {
    /// A failure that never reached the remote service (file read, join
    /// error). Reported with code 500 like any other unclassified failure.
    pub fn local(name: &str, message: impl Into<String>) -> Self {
        ApiError {
            name: name.to_string(),
            code: 500,
            message: message.into(),
        }
    }

    fn from_transport(err: reqwest::Error) -> Self {
        let name = if err.is_timeout() {
            "TimeoutError"
        } else {
            "RequestError"
        };
        ApiError {
            name: name.to_string(),
            code: err.status().map(|s| s.as_u16()).unwrap_or(500),
            message: err.to_string(),
        }
    }

    /// Extract the error from a non-success response, preferring the
    /// structured `{"error": {"code", "message", "status"}}` body the remote
    /// API returns.
    async fn from_response(response: Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if let Ok(parsed) = serde_json::from_str::<RemoteErrorBody>(&body) {
            return ApiError {
                name: parsed.error.status.unwrap_or_else(|| status_name(status)),
                code: parsed.error.code.unwrap_or_else(|| status.as_u16()),
                message: parsed.error.message.unwrap_or(body),
            };
        }

        ApiError {
            name: status_name(status),
            code: status.as_u16(),
            message: body,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::from_transport(err)
    }
}

fn status_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("UnknownError")
        .replace(' ', "")
}

#[derive(Debug, Deserialize)]
struct RemoteErrorBody {
    error: RemoteErrorDetail,
}

#[derive(Debug, Deserialize)]
struct RemoteErrorDetail {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

/// One page of a media item search.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub media_items: Vec<MediaItem>,
    pub next_page_token: Option<String>,
}

/// One page of the album list.
#[derive(Debug, Clone, Default)]
pub struct AlbumPage {
    pub albums: Vec<Album>,
    pub next_page_token: Option<String>,
}

/// Operations the pipeline needs from the remote photo library.
/// Trait-object seam so tests can substitute an in-memory implementation.
#[async_trait]
pub trait PhotosApi: Send + Sync {
    /// `POST /v1/mediaItems:search` — one page of results for `parameters`.
    async fn search_media_items(
        &self,
        token: &str,
        parameters: &SearchParameters,
    ) -> Result<SearchPage, ApiError>;

    /// `GET /v1/albums` — one page of the user's albums.
    async fn list_albums(
        &self,
        token: &str,
        page_size: i32,
        page_token: Option<&str>,
    ) -> Result<AlbumPage, ApiError>;

    /// `POST /v1/albums` — create a new album with the given title.
    async fn create_album(&self, token: &str, title: &str) -> Result<Album, ApiError>;

    /// Exchange raw file bytes for an upload token.
    async fn upload_bytes(
        &self,
        token: &str,
        file_name: &str,
        bytes: Vec<u8>,
        timeout: Duration,
    ) -> Result<String, ApiError>;

    /// `POST /v1/mediaItems:batchCreate` — commit an upload token into an
    /// album with filename and description metadata.
    async fn create_media_item(
        &self,
        token: &str,
        album_id: &str,
        file_name: &str,
        description: &str,
        upload_token: &str,
        timeout: Duration,
    ) -> Result<MediaItem, ApiError>;
}

/// Production client for the remote photo-library API.
#[derive(Clone)]
pub struct PhotosClient {
    http: Client,
    base_url: String,
}

impl PhotosClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        PhotosClient {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// The media item list may be sparse or hold malformed elements;
    /// deserialize each one individually and drop the invalid ones.
    fn collect_valid<T: serde::de::DeserializeOwned>(raw: Option<Vec<serde_json::Value>>) -> Vec<T> {
        raw.unwrap_or_default()
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    media_items: Option<Vec<serde_json::Value>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlbumsResponse {
    albums: Option<Vec<serde_json::Value>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAlbumRequest<'a> {
    album: CreateAlbumBody<'a>,
}

#[derive(Debug, Serialize)]
struct CreateAlbumBody<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchCreateRequest<'a> {
    album_id: &'a str,
    new_media_items: Vec<NewMediaItem<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewMediaItem<'a> {
    description: &'a str,
    simple_media_item: SimpleMediaItem<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimpleMediaItem<'a> {
    file_name: &'a str,
    upload_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchCreateResponse {
    new_media_item_results: Vec<NewMediaItemResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewMediaItemResult {
    media_item: Option<MediaItem>,
    status: Option<ItemStatus>,
}

#[derive(Debug, Deserialize)]
struct ItemStatus {
    message: Option<String>,
    code: Option<u16>,
}

#[async_trait]
impl PhotosApi for PhotosClient {
    async fn search_media_items(
        &self,
        token: &str,
        parameters: &SearchParameters,
    ) -> Result<SearchPage, ApiError> {
        let url = format!("{}/v1/mediaItems:search", self.base_url);
        debug!("Submitting media item search with {:?}", parameters);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(parameters)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }

        let body: SearchResponse = response.json().await?;
        Ok(SearchPage {
            media_items: Self::collect_valid(body.media_items),
            next_page_token: body.next_page_token,
        })
    }

    async fn list_albums(
        &self,
        token: &str,
        page_size: i32,
        page_token: Option<&str>,
    ) -> Result<AlbumPage, ApiError> {
        let url = format!("{}/v1/albums", self.base_url);

        let mut query = vec![("pageSize", page_size.to_string())];
        if let Some(page_token) = page_token {
            query.push(("pageToken", page_token.to_string()));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }

        let body: AlbumsResponse = response.json().await?;
        Ok(AlbumPage {
            albums: Self::collect_valid(body.albums),
            next_page_token: body.next_page_token,
        })
    }

    async fn create_album(&self, token: &str, title: &str) -> Result<Album, ApiError> {
        let url = format!("{}/v1/albums", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&CreateAlbumRequest {
                album: CreateAlbumBody { title },
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }

        Ok(response.json().await?)
    }

    async fn upload_bytes(
        &self,
        token: &str,
        file_name: &str,
        bytes: Vec<u8>,
        timeout: Duration,
    ) -> Result<String, ApiError> {
        let url = format!("{}/v1/uploads", self.base_url);
        debug!("Requesting upload token for {} ({} bytes)", file_name, bytes.len());

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header("Content-Type", "application/octet-stream")
            .header("X-Goog-Upload-File-Name", file_name)
            .header("X-Goog-Upload-Protocol", "raw")
            .timeout(timeout)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }

        // The upload endpoint returns the token as the raw response body.
        Ok(response.text().await?)
    }

    async fn create_media_item(
        &self,
        token: &str,
        album_id: &str,
        file_name: &str,
        description: &str,
        upload_token: &str,
        timeout: Duration,
    ) -> Result<MediaItem, ApiError> {
        let url = format!("{}/v1/mediaItems:batchCreate", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&BatchCreateRequest {
                album_id,
                new_media_items: vec![NewMediaItem {
                    description,
                    simple_media_item: SimpleMediaItem {
                        file_name,
                        upload_token,
                    },
                }],
            })
            .timeout(timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }

        let body: BatchCreateResponse = response.json().await?;
        let result = body.new_media_item_results.into_iter().next();

        match result {
            Some(NewMediaItemResult {
                media_item: Some(item),
                ..
            }) => Ok(item),
            Some(NewMediaItemResult { status, .. }) => Err(ApiError {
                name: "MediaItemCreateError".to_string(),
                code: status.as_ref().and_then(|s| s.code).unwrap_or(500),
                message: status
                    .and_then(|s| s.message)
                    .unwrap_or_else(|| "media item was not created".to_string()),
            }),
            None => Err(ApiError::local(
                "MediaItemCreateError",
                "batch create returned no results",
            )),
        }
    }
}
