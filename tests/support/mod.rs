#![allow(dead_code)]

use photoframe::import::{
    AlbumDirectory, DeadLetterDrainer, DuplicateDetector, ImportConfig, ImportService,
    UploadExecutor,
};
use photoframe::persist::Stores;
use photoframe::photos::mock::MockPhotosApi;
use photoframe::photos::PhotosApi;
use photoframe::search::SearchService;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Shared fixture: an in-memory remote API plus a fresh set of stores in a
/// temp directory (kept alive by holding the TempDir).
pub struct TestEnv {
    pub api: Arc<MockPhotosApi>,
    pub stores: Stores,
    pub store_dir: TempDir,
}

pub async fn test_env() -> TestEnv {
    init_test_logging();
    let store_dir = TempDir::new().unwrap();
    let stores = Stores::open(store_dir.path()).await.unwrap();
    TestEnv {
        api: Arc::new(MockPhotosApi::new()),
        stores,
        store_dir,
    }
}

impl TestEnv {
    fn api_handle(&self) -> Arc<dyn PhotosApi> {
        self.api.clone()
    }

    pub fn uploader(&self) -> UploadExecutor {
        UploadExecutor::new(self.api_handle(), self.stores.deadletter.clone())
    }

    pub fn drainer(&self) -> DeadLetterDrainer {
        DeadLetterDrainer::new(self.stores.deadletter.clone(), self.uploader())
    }

    /// An import service with test-friendly pacing: no batch delays and a
    /// small item chunk so drain pacing stays short.
    pub fn import_service(&self) -> ImportService {
        let albums = AlbumDirectory::new(self.api_handle(), self.stores.albums.clone(), 50);
        let duplicates =
            DuplicateDetector::new(self.api_handle(), self.stores.album_items.clone(), 100);
        ImportService::new(
            albums,
            duplicates,
            self.uploader(),
            self.drainer(),
            self.stores.deadletter.clone(),
            ImportConfig {
                item_chunk_size: 2,
                batch_upload_delay: Duration::ZERO,
                ..ImportConfig::default()
            },
        )
    }

    pub fn search_service(&self, photos_to_load: usize, page_size: i32) -> SearchService {
        SearchService::new(
            self.api_handle(),
            self.stores.media_items.clone(),
            self.stores.storage.clone(),
            photos_to_load,
            page_size,
        )
    }
}
