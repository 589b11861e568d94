use crate::error::ServiceError;
use crate::models::{MediaItem, SearchParameters};
use crate::persist::{PersistStore, StoreError};
use crate::photos::PhotosApi;
use std::sync::Arc;
use tracing::debug;

/// Checks whether a filename already exists in a remote album, backed by a
/// per-album item cache so repeated lookups within one import run don't
/// repeat full remote searches. Prior partial imports are what make this
/// worthwhile: files uploaded last time are skipped instead of duplicated.
#[derive(Clone)]
pub struct DuplicateDetector {
    api: Arc<dyn PhotosApi>,
    album_items: PersistStore,
    page_size: i32,
}

impl DuplicateDetector {
    pub fn new(api: Arc<dyn PhotosApi>, album_items: PersistStore, page_size: i32) -> Self {
        DuplicateDetector {
            api,
            album_items,
            page_size,
        }
    }

    /// True iff the album's item listing contains an entry whose filename
    /// equals `file_name` exactly (case-sensitive). The listing is fetched
    /// in full on cache miss and cached for the remainder of the run.
    pub async fn exists(
        &self,
        token: &str,
        album_id: &str,
        file_name: &str,
    ) -> Result<bool, ServiceError> {
        let items = match self.album_items.get::<Vec<MediaItem>>(album_id).await? {
            Some(items) => items,
            None => {
                let items = self.fetch_album_items(token, album_id).await?;
                self.album_items.set(album_id, &items).await?;
                items
            }
        };

        let found = items.iter().any(|item| item.filename == file_name);
        debug!(
            "Duplicate check for {} in album {}: {}",
            file_name, album_id, found
        );
        Ok(found)
    }

    /// Fetch every page of the album's item listing.
    async fn fetch_album_items(
        &self,
        token: &str,
        album_id: &str,
    ) -> Result<Vec<MediaItem>, ServiceError> {
        let mut parameters = SearchParameters::for_album(album_id);
        parameters.page_size = Some(self.page_size);

        let mut items = Vec::new();
        loop {
            let page = self.api.search_media_items(token, &parameters).await?;
            items.extend(page.media_items);
            parameters.page_token = page.next_page_token;

            if parameters.page_token.is_none() {
                break;
            }
        }

        debug!("Fetched {} item(s) for album {}", items.len(), album_id);
        Ok(items)
    }

    /// Drop every cached album listing; called when a bulk import begins.
    pub async fn invalidate_all(&self) -> Result<(), StoreError> {
        self.album_items.clear().await
    }
}
