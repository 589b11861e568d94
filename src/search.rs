//! Search accumulation and the per-user photo queue cache.
//!
//! A search keeps paging through `mediaItems:search` until the configured
//! minimum number of images is gathered or the continuation token runs out.
//! Successful results are cached (photos and the parameters that produced
//! them are written together) so queue fetches can be served from cache or
//! replayed after the photo cache expires.

use crate::error::ServiceError;
use crate::models::{CachedQuery, MediaItem, QueueResponse, SearchParameters};
use crate::persist::PersistStore;
use crate::photos::{ApiError, PhotosApi};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a search accumulation: whatever was gathered, the parameters as
/// last submitted, and the error that stopped accumulation early, if any.
#[derive(Debug)]
pub struct SearchOutcome {
    pub photos: Vec<MediaItem>,
    pub parameters: SearchParameters,
    pub error: Option<ApiError>,
}

#[derive(Clone)]
pub struct SearchService {
    api: Arc<dyn PhotosApi>,
    media_items: PersistStore,
    storage: PersistStore,
    photos_to_load: usize,
    page_size: i32,
}

impl SearchService {
    pub fn new(
        api: Arc<dyn PhotosApi>,
        media_items: PersistStore,
        storage: PersistStore,
        photos_to_load: usize,
        page_size: i32,
    ) -> Self {
        SearchService {
            api,
            media_items,
            storage,
            photos_to_load,
            page_size,
        }
    }

    /// Page through the remote search, keeping only image items, until the
    /// minimum photo count is reached or the continuation token is
    /// exhausted. A remote failure stops accumulation immediately; whatever
    /// was gathered so far is returned alongside the normalized error.
    pub async fn search(&self, token: &str, mut parameters: SearchParameters) -> SearchOutcome {
        let mut photos = Vec::new();
        parameters.page_size = Some(self.page_size);

        loop {
            debug!("Submitting search with {:?}", parameters);

            let page = match self.api.search_media_items(token, &parameters).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Search failed, stopping accumulation: {}", e);
                    return SearchOutcome {
                        photos,
                        parameters,
                        error: Some(e),
                    };
                }
            };

            // Media type filters can't be applied when an album is loaded,
            // so non-image items are dropped here in every case.
            let images = page
                .media_items
                .into_iter()
                .filter(|item| item.mime_type.starts_with("image/"));
            photos.extend(images);

            parameters.page_token = page.next_page_token;

            debug!("Accumulated {} image(s) so far", photos.len());

            if photos.len() >= self.photos_to_load || parameters.page_token.is_none() {
                break;
            }
        }

        info!("Search complete with {} image(s)", photos.len());
        SearchOutcome {
            photos,
            parameters,
            error: None,
        }
    }

    /// Run a search and, on success, cache the photos and store the
    /// parameters together so `get_queue` can later replay them. Pagination
    /// fields are stripped before storing; they are set afresh on resubmit.
    pub async fn load_and_cache(
        &self,
        user_id: &str,
        token: &str,
        parameters: SearchParameters,
    ) -> Result<QueueResponse, ServiceError> {
        let outcome = self.search(token, parameters).await;

        if let Some(error) = outcome.error {
            return Err(ServiceError::Remote(error));
        }

        let mut stored = outcome.parameters;
        stored.clear_pagination();

        self.media_items.set(user_id, &outcome.photos).await?;
        self.storage
            .set(
                user_id,
                &CachedQuery {
                    parameters: stored.clone(),
                },
            )
            .await?;

        Ok(QueueResponse {
            photos: outcome.photos,
            parameters: Some(stored),
        })
    }

    /// Cache-first queue fetch: fresh photo cache wins; else the stored
    /// query is resubmitted verbatim with pagination cleared; else the user
    /// has no prior query and gets an empty response.
    pub async fn get_queue(
        &self,
        user_id: &str,
        token: &str,
    ) -> Result<QueueResponse, ServiceError> {
        if let Some(photos) = self.media_items.get::<Vec<MediaItem>>(user_id).await? {
            debug!("Serving queue for {} from cache", user_id);
            let parameters = self
                .storage
                .get::<CachedQuery>(user_id)
                .await?
                .map(|q| q.parameters);
            return Ok(QueueResponse { photos, parameters });
        }

        if let Some(cached) = self.storage.get::<CachedQuery>(user_id).await? {
            info!("Photo cache for {} expired, replaying stored query", user_id);
            let mut parameters = cached.parameters;
            parameters.clear_pagination();
            return self.load_and_cache(user_id, token, parameters).await;
        }

        debug!("No cached photos or stored query for {}", user_id);
        Ok(QueueResponse::empty())
    }
}
