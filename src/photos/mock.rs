//! In-memory stand-in for the remote photo library, used by tests.
//! Seedable with albums and items, injectable upload failures, and call
//! counters so tests can assert that no remote calls were made.

use crate::models::{Album, MediaItem, SearchParameters};
use crate::photos::{AlbumPage, ApiError, PhotosApi, SearchPage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

const MOCK_PAGE_SIZE: usize = 100;

#[derive(Default)]
struct MockState {
    albums: Vec<Album>,
    album_items: HashMap<String, Vec<MediaItem>>,
    library_items: Vec<MediaItem>,
    /// file name -> remaining injected failures
    failing_uploads: HashMap<String, usize>,
    /// file name -> how many times an upload of it has failed so far
    failure_counts: HashMap<String, usize>,
    /// remaining injected search failures
    failing_searches: usize,
    search_calls: usize,
    list_album_calls: usize,
    create_album_calls: usize,
    upload_calls: usize,
}

/// Mock implementation of [`PhotosApi`].
#[derive(Default)]
pub struct MockPhotosApi {
    state: Mutex<MockState>,
}

impl MockPhotosApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an album and return it.
    pub fn seed_album(&self, title: &str) -> Album {
        let mut state = self.state.lock().unwrap();
        let album = Album {
            id: format!("album-{}", state.albums.len() + 1),
            title: title.to_string(),
        };
        state.albums.push(album.clone());
        album
    }

    /// Add an existing media item to an album.
    pub fn seed_album_item(&self, album_id: &str, filename: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .album_items
            .entry(album_id.to_string())
            .or_default()
            .push(make_item(filename, "image/jpeg", None));
    }

    /// Populate the searchable library (used by filter searches).
    pub fn seed_library(&self, items: Vec<MediaItem>) {
        self.state.lock().unwrap().library_items = items;
    }

    /// Make the next `times` searches fail.
    pub fn fail_searches(&self, times: usize) {
        self.state.lock().unwrap().failing_searches = times;
    }

    /// Make the next `times` uploads of `file_name` fail.
    pub fn fail_uploads(&self, file_name: &str, times: usize) {
        self.state
            .lock()
            .unwrap()
            .failing_uploads
            .insert(file_name.to_string(), times);
    }

    pub fn albums(&self) -> Vec<Album> {
        self.state.lock().unwrap().albums.clone()
    }

    pub fn album_items(&self, album_id: &str) -> Vec<MediaItem> {
        self.state
            .lock()
            .unwrap()
            .album_items
            .get(album_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn search_call_count(&self) -> usize {
        self.state.lock().unwrap().search_calls
    }

    pub fn upload_call_count(&self) -> usize {
        self.state.lock().unwrap().upload_calls
    }

    pub fn create_album_call_count(&self) -> usize {
        self.state.lock().unwrap().create_album_calls
    }
}

fn make_item(filename: &str, mime_type: &str, description: Option<&str>) -> MediaItem {
    MediaItem {
        id: Uuid::new_v4().to_string(),
        filename: filename.to_string(),
        mime_type: mime_type.to_string(),
        description: description.map(|d| d.to_string()),
        base_url: None,
    }
}

/// Build a test media item with the given filename and mime type.
pub fn library_item(filename: &str, mime_type: &str) -> MediaItem {
    make_item(filename, mime_type, None)
}

fn paginate<T: Clone>(all: &[T], page_size: usize, page_token: Option<&str>) -> (Vec<T>, Option<String>) {
    let offset: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
    let end = (offset + page_size).min(all.len());
    let next = (end < all.len()).then(|| end.to_string());
    (all[offset..end].to_vec(), next)
}

#[async_trait]
impl PhotosApi for MockPhotosApi {
    async fn search_media_items(
        &self,
        _token: &str,
        parameters: &SearchParameters,
    ) -> Result<SearchPage, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.search_calls += 1;

        if state.failing_searches > 0 {
            state.failing_searches -= 1;
            return Err(ApiError {
                name: "MockSearchFailure".to_string(),
                code: 500,
                message: "injected search failure".to_string(),
            });
        }

        let page_size = parameters
            .page_size
            .map(|s| s as usize)
            .unwrap_or(MOCK_PAGE_SIZE);

        let source = match &parameters.album_id {
            Some(album_id) => state.album_items.get(album_id).cloned().unwrap_or_default(),
            None => state.library_items.clone(),
        };

        let (media_items, next_page_token) =
            paginate(&source, page_size, parameters.page_token.as_deref());
        Ok(SearchPage {
            media_items,
            next_page_token,
        })
    }

    async fn list_albums(
        &self,
        _token: &str,
        page_size: i32,
        page_token: Option<&str>,
    ) -> Result<AlbumPage, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.list_album_calls += 1;

        let (albums, next_page_token) = paginate(&state.albums, page_size as usize, page_token);
        Ok(AlbumPage {
            albums,
            next_page_token,
        })
    }

    async fn create_album(&self, _token: &str, title: &str) -> Result<Album, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.create_album_calls += 1;

        let album = Album {
            id: format!("album-{}", state.albums.len() + 1),
            title: title.to_string(),
        };
        state.albums.push(album.clone());
        Ok(album)
    }

    async fn upload_bytes(
        &self,
        _token: &str,
        file_name: &str,
        _bytes: Vec<u8>,
        _timeout: Duration,
    ) -> Result<String, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.upload_calls += 1;

        if let Some(remaining) = state.failing_uploads.get_mut(file_name) {
            if *remaining > 0 {
                *remaining -= 1;
                let attempt = state.failure_counts.entry(file_name.to_string()).or_insert(0);
                *attempt += 1;
                let attempt = *attempt;
                return Err(ApiError {
                    name: "MockUploadFailure".to_string(),
                    code: 500,
                    message: format!("injected failure {} for {}", attempt, file_name),
                });
            }
        }

        Ok(format!("upload-token-{}", file_name))
    }

    async fn create_media_item(
        &self,
        _token: &str,
        album_id: &str,
        file_name: &str,
        description: &str,
        _upload_token: &str,
        _timeout: Duration,
    ) -> Result<MediaItem, ApiError> {
        let mut state = self.state.lock().unwrap();
        let item = make_item(file_name, "image/jpeg", Some(description));
        state
            .album_items
            .entry(album_id.to_string())
            .or_default()
            .push(item.clone());
        Ok(item)
    }
}
