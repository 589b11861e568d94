//! Dead-letter behavior: failed uploads are persisted, retried in chunks,
//! and gate subsequent imports until resolved.

mod support;

use photoframe::error::ServiceError;
use photoframe::import::UPLOAD_TIMEOUT;
use photoframe::models::{DeadLetterEntry, FolderSelection};
use std::fs::{self, File};
use std::path::Path;
use support::test_env;
use tempfile::TempDir;

fn trip_with(files: &[&str]) -> (TempDir, FolderSelection) {
    let photos = TempDir::new().unwrap();
    let trip = photos.path().join("Trip");
    fs::create_dir_all(&trip).unwrap();
    for file in files {
        File::create(trip.join(file)).unwrap();
    }
    let selection = FolderSelection {
        folder_name: "Trip".to_string(),
        full_path: trip,
    };
    (photos, selection)
}

#[tokio::test]
async fn test_failed_upload_is_persisted_with_latest_error() {
    let env = test_env().await;
    let imports = env.import_service();

    // Fails during the import and again during the postflight drain.
    env.api.fail_uploads("a.jpg", 10);
    let (_photos, selection) = trip_with(&["a.jpg"]);

    let report = imports
        .import_folders("user", "tok", &[selection])
        .await
        .unwrap();

    assert_eq!(report.deadletter_count, 1);

    // A retried failure replaces the entry rather than piling up, and the
    // stored error is the most recent one.
    let keys = env.stores.deadletter.keys().await;
    assert_eq!(keys.len(), 1);
    let entry: DeadLetterEntry = env
        .stores
        .deadletter
        .get(&keys[0])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.file_name, "a.jpg");
    assert!(
        entry.last_error.contains("injected failure 2"),
        "unexpected error: {}",
        entry.last_error
    );
}

#[tokio::test]
async fn test_drain_recovers_transient_failure() {
    let env = test_env().await;
    let uploader = env.uploader();
    let drainer = env.drainer();

    let album = env.api.seed_album("Trip");
    env.api.fail_uploads("a.jpg", 1);

    let (_photos, selection) = trip_with(&["a.jpg"]);
    let folder: &Path = &selection.full_path;

    // First attempt fails and is deferred.
    let uploaded = uploader
        .upload("tok", &album.id, "a.jpg", "Trip", folder, UPLOAD_TIMEOUT)
        .await
        .unwrap();
    assert!(uploaded.is_none());
    assert_eq!(env.stores.deadletter.keys().await.len(), 1);

    // The drain retries it successfully.
    let remaining = drainer.drain("tok", 1, 2).await.unwrap();
    assert_eq!(remaining, 0);
    assert!(env.stores.deadletter.keys().await.is_empty());

    let items = env.api.album_items(&album.id);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].filename, "a.jpg");
}

#[tokio::test]
async fn test_empty_drain_makes_no_remote_calls() {
    let env = test_env().await;
    let drainer = env.drainer();

    let remaining = drainer.drain("tok", 3, 2).await.unwrap();

    assert_eq!(remaining, 0);
    assert_eq!(env.api.upload_call_count(), 0);
    assert_eq!(env.api.search_call_count(), 0);
}

#[tokio::test]
async fn test_unresolved_deadletter_blocks_next_import() {
    let env = test_env().await;
    let imports = env.import_service();

    env.api.fail_uploads("a.jpg", 10);
    let (_photos, selection) = trip_with(&["a.jpg"]);

    let report = imports
        .import_folders("user", "tok", &[selection.clone()])
        .await
        .unwrap();
    assert_eq!(report.deadletter_count, 1);

    // The preflight drain retries once more, fails again, and the import is
    // rejected while the entry is still unresolved.
    let result = imports.import_folders("user", "tok", &[selection]).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
    assert_eq!(env.stores.deadletter.keys().await.len(), 1);
}

#[tokio::test]
async fn test_deadletter_survives_store_reopen() {
    let env = test_env().await;
    let uploader = env.uploader();

    env.api.fail_uploads("a.jpg", 1);
    let (_photos, selection) = trip_with(&["a.jpg"]);

    let album = env.api.seed_album("Trip");
    uploader
        .upload(
            "tok",
            &album.id,
            "a.jpg",
            "Trip",
            &selection.full_path,
            UPLOAD_TIMEOUT,
        )
        .await
        .unwrap();

    // Reopen the stores from the same directory, as a process restart would.
    let reopened = photoframe::persist::Stores::open(env.store_dir.path())
        .await
        .unwrap();
    let keys = reopened.deadletter.keys().await;
    assert_eq!(keys.len(), 1);
    let entry: DeadLetterEntry = reopened.deadletter.get(&keys[0]).await.unwrap().unwrap();
    assert_eq!(entry.file_name, "a.jpg");
    assert_eq!(entry.folder_path, selection.full_path);
}
