use crate::error::ServiceError;
use crate::models::Album;
use crate::persist::{PersistStore, StoreError};
use crate::photos::PhotosApi;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves album titles to remote albums, creating them when absent.
/// The full album list is fetched once per user and cached; any call that
/// begins a bulk import invalidates the cache first so albums created
/// outside this process become visible.
#[derive(Clone)]
pub struct AlbumDirectory {
    api: Arc<dyn PhotosApi>,
    albums: PersistStore,
    page_size: i32,
}

impl AlbumDirectory {
    pub fn new(api: Arc<dyn PhotosApi>, albums: PersistStore, page_size: i32) -> Self {
        AlbumDirectory {
            api,
            albums,
            page_size,
        }
    }

    /// The user's albums, from cache when fresh, otherwise fetched page by
    /// page and cached. A fetch failure clears the (possibly partial) cache
    /// entry before propagating.
    pub async fn list(&self, user_id: &str, token: &str) -> Result<Vec<Album>, ServiceError> {
        if let Some(cached) = self.albums.get::<Vec<Album>>(user_id).await? {
            debug!("Loaded albums for {} from cache", user_id);
            return Ok(cached);
        }

        debug!("Loading albums for {} from the API", user_id);
        let albums = match self.fetch_all(token).await {
            Ok(albums) => albums,
            Err(e) => {
                self.albums.remove(user_id).await?;
                return Err(e);
            }
        };

        self.albums.set(user_id, &albums).await?;
        Ok(albums)
    }

    async fn fetch_all(&self, token: &str) -> Result<Vec<Album>, ServiceError> {
        let mut albums = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .api
                .list_albums(token, self.page_size, page_token.as_deref())
                .await?;
            albums.extend(page.albums);
            page_token = page.next_page_token;

            if page_token.is_none() {
                break;
            }
        }

        info!("Loaded {} album(s)", albums.len());
        Ok(albums)
    }

    /// Find an album whose title matches exactly.
    pub async fn find_by_title(
        &self,
        user_id: &str,
        token: &str,
        title: &str,
    ) -> Result<Option<Album>, ServiceError> {
        let albums = self.list(user_id, token).await?;
        Ok(albums.into_iter().find(|a| a.title == title))
    }

    /// Look `title` up among the user's albums; create the album remotely
    /// if no title matches. The orchestrator resolves each distinct title
    /// once per run and reuses the result, so concurrent same-title
    /// creations don't race within a run.
    pub async fn resolve_or_create(
        &self,
        user_id: &str,
        token: &str,
        title: &str,
    ) -> Result<Album, ServiceError> {
        if let Some(album) = self.find_by_title(user_id, token, title).await? {
            info!("Reusing existing album {} ({})", title, album.id);
            return Ok(album);
        }

        info!("Creating album {}", title);
        let album = self.api.create_album(token, title).await?;
        Ok(album)
    }

    /// Drop the cached album list for this user.
    pub async fn invalidate(&self, user_id: &str) -> Result<(), StoreError> {
        self.albums.remove(user_id).await
    }
}
