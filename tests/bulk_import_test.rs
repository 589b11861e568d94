//! End-to-end bulk import over a real temp folder tree and the in-memory
//! remote API.

mod support;

use photoframe::error::ServiceError;
use photoframe::models::FolderSelection;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use support::test_env;
use tempfile::TempDir;

fn selection(name: &str, path: &Path) -> FolderSelection {
    FolderSelection {
        folder_name: name.to_string(),
        full_path: path.to_path_buf(),
    }
}

fn touch(dir: &Path, name: &str) {
    File::create(dir.join(name)).unwrap();
}

#[tokio::test]
async fn test_import_creates_nested_albums_and_uploads() {
    let env = test_env().await;
    let imports = env.import_service();

    let photos = TempDir::new().unwrap();
    let trip = photos.path().join("Trip");
    let day1 = trip.join("Day1");
    fs::create_dir_all(&day1).unwrap();
    touch(&trip, "a.jpg");
    touch(&trip, "b.jpg");
    touch(&day1, "c.jpg");

    let report = imports
        .import_folders("user", "tok", &[selection("Trip", &trip)])
        .await
        .unwrap();

    assert_eq!(report.folders_result.len(), 1);
    assert_eq!(report.folders_result[0].items, 3);
    assert_eq!(report.deadletter_count, 0);

    let albums = env.api.albums();
    let titles: Vec<&str> = albums.iter().map(|a| a.title.as_str()).collect();
    assert!(titles.contains(&"Trip"));
    assert!(titles.contains(&"Trip - Day1"));

    let trip_album = albums.iter().find(|a| a.title == "Trip").unwrap();
    assert_eq!(env.api.album_items(&trip_album.id).len(), 2);

    let day_album = albums.iter().find(|a| a.title == "Trip - Day1").unwrap();
    let day_items = env.api.album_items(&day_album.id);
    assert_eq!(day_items.len(), 1);
    assert_eq!(day_items[0].filename, "c.jpg");
    // Description carries the folder name the file came from.
    assert_eq!(day_items[0].description.as_deref(), Some("Day1"));
}

#[tokio::test]
async fn test_all_sibling_subfolders_are_imported() {
    let env = test_env().await;
    let imports = env.import_service();

    let photos = TempDir::new().unwrap();
    let trip = photos.path().join("Trip");
    for sub in ["Alpha", "Beta", "Gamma"] {
        let dir = trip.join(sub);
        fs::create_dir_all(&dir).unwrap();
        touch(&dir, "pic.jpg");
    }

    let report = imports
        .import_folders("user", "tok", &[selection("Trip", &trip)])
        .await
        .unwrap();

    assert_eq!(report.folders_result[0].items, 3);
    let titles: Vec<String> = env.api.albums().into_iter().map(|a| a.title).collect();
    for expected in ["Trip - Alpha", "Trip - Beta", "Trip - Gamma"] {
        assert!(titles.contains(&expected.to_string()), "missing {expected}");
    }
    // No album for the empty parent folder itself.
    assert!(!titles.contains(&"Trip".to_string()));
}

#[tokio::test]
async fn test_invalid_and_hidden_files_are_skipped() {
    let env = test_env().await;
    let imports = env.import_service();

    let photos = TempDir::new().unwrap();
    let trip = photos.path().join("Trip");
    fs::create_dir_all(&trip).unwrap();
    touch(&trip, "a.jpg");
    touch(&trip, "notes.txt");
    touch(&trip, ".hidden.jpg");

    let report = imports
        .import_folders("user", "tok", &[selection("Trip", &trip)])
        .await
        .unwrap();

    assert_eq!(report.folders_result[0].items, 1);
    assert_eq!(env.api.upload_call_count(), 1);
}

#[tokio::test]
async fn test_empty_selection_is_rejected() {
    let env = test_env().await;
    let imports = env.import_service();

    let result = imports.import_folders("user", "tok", &[]).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
    assert_eq!(env.api.upload_call_count(), 0);
}

#[tokio::test]
async fn test_oversized_selection_is_rejected() {
    let env = test_env().await;
    let imports = env.import_service();

    let folders: Vec<FolderSelection> = (0..51)
        .map(|i| selection(&format!("f{i}"), &PathBuf::from(format!("/tmp/f{i}"))))
        .collect();

    let result = imports.import_folders("user", "tok", &folders).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
    assert_eq!(env.api.create_album_call_count(), 0);
}

#[tokio::test]
async fn test_existing_files_are_skipped_but_counted() {
    let env = test_env().await;
    let imports = env.import_service();

    let album = env.api.seed_album("Trip");
    env.api.seed_album_item(&album.id, "a.jpg");

    let photos = TempDir::new().unwrap();
    let trip = photos.path().join("Trip");
    fs::create_dir_all(&trip).unwrap();
    touch(&trip, "a.jpg");
    touch(&trip, "b.jpg");

    let report = imports
        .import_folders("user", "tok", &[selection("Trip", &trip)])
        .await
        .unwrap();

    // Both files count as processed, but only the new one was uploaded.
    assert_eq!(report.folders_result[0].items, 2);
    assert_eq!(env.api.upload_call_count(), 1);
    assert_eq!(env.api.album_items(&album.id).len(), 2);
    // The existing album was reused, not recreated.
    assert_eq!(env.api.create_album_call_count(), 0);
}

#[tokio::test]
async fn test_reimport_is_idempotent() {
    let env = test_env().await;
    let imports = env.import_service();

    let photos = TempDir::new().unwrap();
    let trip = photos.path().join("Trip");
    fs::create_dir_all(&trip).unwrap();
    touch(&trip, "a.jpg");
    touch(&trip, "b.jpg");

    let first = imports
        .import_folders("user", "tok", &[selection("Trip", &trip)])
        .await
        .unwrap();
    let uploads_after_first = env.api.upload_call_count();

    let second = imports
        .import_folders("user", "tok", &[selection("Trip", &trip)])
        .await
        .unwrap();

    assert_eq!(first.folders_result[0].items, 2);
    assert_eq!(second.folders_result[0].items, 2);
    // Second run found everything already present and uploaded nothing.
    assert_eq!(env.api.upload_call_count(), uploads_after_first);
    assert_eq!(env.api.albums().len(), 1);
}

#[tokio::test]
async fn test_missing_folder_contained_to_its_branch() {
    let env = test_env().await;
    let imports = env.import_service();

    let photos = TempDir::new().unwrap();
    let good = photos.path().join("Good");
    fs::create_dir_all(&good).unwrap();
    touch(&good, "a.jpg");
    let missing = photos.path().join("Missing");

    let report = imports
        .import_folders(
            "user",
            "tok",
            &[selection("Missing", &missing), selection("Good", &good)],
        )
        .await
        .unwrap();

    assert_eq!(report.folders_result.len(), 2);
    let by_name = |name: &str| {
        report
            .folders_result
            .iter()
            .find(|f| f.folder_name == name)
            .unwrap()
    };
    assert_eq!(by_name("Missing").items, 0);
    assert_eq!(by_name("Good").items, 1);
}
