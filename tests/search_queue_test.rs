//! Search accumulation and queue caching against the in-memory remote API.

mod support;

use photoframe::error::ServiceError;
use photoframe::models::SearchParameters;
use photoframe::persist::PersistStore;
use photoframe::photos::mock::library_item;
use photoframe::photos::PhotosApi;
use photoframe::search::SearchService;
use std::sync::Arc;
use support::test_env;
use tempfile::TempDir;

#[tokio::test]
async fn test_search_accumulates_until_threshold() {
    let env = test_env().await;
    let search = env.search_service(30, 10);

    env.api.seed_library(
        (0..100)
            .map(|i| library_item(&format!("p{i}.jpg"), "image/jpeg"))
            .collect(),
    );

    let queue = search
        .load_and_cache("user", "tok", SearchParameters::default())
        .await
        .unwrap();

    assert_eq!(queue.photos.len(), 30);
    assert_eq!(env.api.search_call_count(), 3);

    // Stored parameters have pagination stripped.
    let parameters = queue.parameters.unwrap();
    assert!(parameters.page_token.is_none());
    assert!(parameters.page_size.is_none());
}

#[tokio::test]
async fn test_search_keeps_only_images() {
    let env = test_env().await;
    let search = env.search_service(30, 10);

    env.api.seed_library(vec![
        library_item("a.jpg", "image/jpeg"),
        library_item("clip.mp4", "video/mp4"),
        library_item("b.png", "image/png"),
    ]);

    let queue = search
        .load_and_cache("user", "tok", SearchParameters::default())
        .await
        .unwrap();

    let names: Vec<&str> = queue.photos.iter().map(|p| p.filename.as_str()).collect();
    assert_eq!(names, vec!["a.jpg", "b.png"]);
}

#[tokio::test]
async fn test_search_stops_when_pages_run_out() {
    let env = test_env().await;
    let search = env.search_service(30, 10);

    env.api.seed_library(
        (0..7)
            .map(|i| library_item(&format!("p{i}.jpg"), "image/jpeg"))
            .collect(),
    );

    let queue = search
        .load_and_cache("user", "tok", SearchParameters::default())
        .await
        .unwrap();

    assert_eq!(queue.photos.len(), 7);
}

#[tokio::test]
async fn test_album_load_returns_album_parameters() {
    let env = test_env().await;
    let search = env.search_service(30, 10);

    let album = env.api.seed_album("Trip");
    env.api.seed_album_item(&album.id, "a.jpg");
    env.api.seed_album_item(&album.id, "b.jpg");

    let queue = search
        .load_and_cache("user", "tok", SearchParameters::for_album(&album.id))
        .await
        .unwrap();

    assert_eq!(queue.photos.len(), 2);
    assert_eq!(
        queue.parameters.unwrap().album_id.as_deref(),
        Some(album.id.as_str())
    );
}

#[tokio::test]
async fn test_get_queue_serves_cached_photos_without_remote_calls() {
    let env = test_env().await;
    let search = env.search_service(30, 10);

    env.api
        .seed_library(vec![library_item("a.jpg", "image/jpeg")]);
    search
        .load_and_cache("user", "tok", SearchParameters::default())
        .await
        .unwrap();
    let calls_after_load = env.api.search_call_count();

    let queue = search.get_queue("user", "tok").await.unwrap();

    assert_eq!(queue.photos.len(), 1);
    assert!(queue.parameters.is_some());
    assert_eq!(env.api.search_call_count(), calls_after_load);
}

#[tokio::test]
async fn test_get_queue_replays_stored_query_after_photo_cache_expiry() {
    let env = test_env().await;

    // A photo cache that expires immediately, alongside the normal storage
    // namespace for the stored query.
    let dir = TempDir::new().unwrap();
    let media_items = PersistStore::open(dir.path().join("media-items"), Some(std::time::Duration::ZERO))
        .await
        .unwrap();
    let storage = PersistStore::open(dir.path().join("storage"), None)
        .await
        .unwrap();
    let api: Arc<dyn PhotosApi> = env.api.clone();
    let search = SearchService::new(api, media_items, storage, 30, 10);

    let album = env.api.seed_album("Trip");
    env.api.seed_album_item(&album.id, "a.jpg");

    search
        .load_and_cache("user", "tok", SearchParameters::for_album(&album.id))
        .await
        .unwrap();
    let calls_after_load = env.api.search_call_count();

    let queue = search.get_queue("user", "tok").await.unwrap();

    assert_eq!(queue.photos.len(), 1);
    assert!(env.api.search_call_count() > calls_after_load);
    assert_eq!(
        queue.parameters.unwrap().album_id.as_deref(),
        Some(album.id.as_str())
    );
}

#[tokio::test]
async fn test_get_queue_without_history_is_empty() {
    let env = test_env().await;
    let search = env.search_service(30, 10);

    let queue = search.get_queue("user", "tok").await.unwrap();

    assert!(queue.photos.is_empty());
    assert!(queue.parameters.is_none());
    assert_eq!(env.api.search_call_count(), 0);
}

#[tokio::test]
async fn test_remote_failure_surfaces_and_caches_nothing() {
    let env = test_env().await;
    let search = env.search_service(30, 10);

    env.api
        .seed_library(vec![library_item("a.jpg", "image/jpeg")]);
    env.api.fail_searches(1);

    let result = search
        .load_and_cache("user", "tok", SearchParameters::default())
        .await;
    assert!(matches!(result, Err(ServiceError::Remote(_))));

    // Nothing was cached, so the next queue fetch has no history.
    let queue = search.get_queue("user", "tok").await.unwrap();
    assert!(queue.photos.is_empty());
    assert!(queue.parameters.is_none());
}
