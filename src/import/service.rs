// # Bulk Import Orchestrator
//
// Drives a folder-import request end to end:
//
// 1. Preflight: selection bounds, cache invalidation, dead-letter gate
// 2. Per-folder recursion: nested folders become `Parent - Child` album
//    titles; valid files are deduplicated against the album, else uploaded
// 3. Files go through fixed-size batches whose uploads run concurrently,
//    with a pacing delay after each batch
// 4. Postflight: one more dead-letter drain, then the summary report

use crate::error::ServiceError;
use crate::import::album_directory::AlbumDirectory;
use crate::import::deadletter::DeadLetterDrainer;
use crate::import::duplicates::DuplicateDetector;
use crate::import::uploader::{UploadExecutor, UPLOAD_TIMEOUT};
use crate::models::{Album, FolderResult, FolderSelection, ImportReport};
use crate::persist::PersistStore;
use crate::scanner;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Tunables for a bulk import run.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Most folders one request may select.
    pub max_folder_selection: usize,
    /// Top-level folders processed concurrently per chunk.
    pub folder_chunk_size: usize,
    /// Files uploaded concurrently per batch.
    pub item_chunk_size: usize,
    /// Pause after each batch of uploads.
    pub batch_upload_delay: Duration,
    /// Extension allow-list for upload candidates.
    pub valid_extensions: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            max_folder_selection: 50,
            folder_chunk_size: 3,
            item_chunk_size: 10,
            batch_upload_delay: Duration::from_secs(5),
            valid_extensions: ["JPG", "JPEG", "PNG", "GIF", "BMP", "WEBP"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

/// Orchestrates bulk imports over the album directory, duplicate detector,
/// upload executor, and dead-letter drainer.
#[derive(Clone)]
pub struct ImportService {
    albums: AlbumDirectory,
    duplicates: DuplicateDetector,
    uploader: UploadExecutor,
    drainer: DeadLetterDrainer,
    deadletter: PersistStore,
    config: Arc<ImportConfig>,
}

impl ImportService {
    pub fn new(
        albums: AlbumDirectory,
        duplicates: DuplicateDetector,
        uploader: UploadExecutor,
        drainer: DeadLetterDrainer,
        deadletter: PersistStore,
        config: ImportConfig,
    ) -> Self {
        ImportService {
            albums,
            duplicates,
            uploader,
            drainer,
            deadletter,
            config: Arc::new(config),
        }
    }

    /// The album directory backing this service.
    pub fn albums(&self) -> &AlbumDirectory {
        &self.albums
    }

    /// Import the selected folders into remote albums. Preflight violations
    /// abort the whole request before any work; per-folder failures are
    /// contained to their branch.
    pub async fn import_folders(
        &self,
        user_id: &str,
        token: &str,
        selection: &[FolderSelection],
    ) -> Result<ImportReport, ServiceError> {
        if selection.is_empty() {
            return Err(ServiceError::Conflict("no folder selected".to_string()));
        }
        if selection.len() > self.config.max_folder_selection {
            return Err(ServiceError::Conflict(format!(
                "too many folders selected ({} > {})",
                selection.len(),
                self.config.max_folder_selection
            )));
        }

        // Invalidate before listing anything: albums created outside this
        // run must be visible, and item listings must be current.
        self.albums.invalidate(user_id).await?;
        self.duplicates.invalidate_all().await?;

        let remaining = self
            .drainer
            .drain(token, 1, self.config.item_chunk_size)
            .await?;
        if remaining > 0 {
            return Err(ServiceError::Conflict(format!(
                "dead letter is not empty ({} entries); drain or clear it before importing",
                remaining
            )));
        }

        info!("Starting bulk import of {} folder(s)", selection.len());

        let mut folders_result = Vec::new();
        for chunk in selection.chunks(self.config.folder_chunk_size.max(1)) {
            let imports = chunk.iter().map(|folder| self.import_one(user_id, token, folder));
            folders_result.extend(join_all(imports).await);
            info!("Processed {} of {} folder(s)", folders_result.len(), selection.len());
        }

        self.drainer
            .drain(token, 1, self.config.item_chunk_size)
            .await?;

        Ok(ImportReport {
            folders_result,
            deadletter_count: self.deadletter.keys().await.len(),
        })
    }

    /// Retry everything in the dead letter; returns how many entries remain.
    pub async fn drain_deadletter(
        &self,
        token: &str,
        max_tries: usize,
    ) -> Result<usize, ServiceError> {
        self.drainer
            .drain(token, max_tries, self.config.item_chunk_size)
            .await
    }

    /// Import one selected top-level folder, containing any failure to this
    /// folder's branch.
    async fn import_one(
        &self,
        user_id: &str,
        token: &str,
        folder: &FolderSelection,
    ) -> FolderResult {
        let items = match self
            .import_folder_tree(user_id, token, &folder.full_path, &folder.folder_name, None)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                error!("Import of folder {} failed: {}", folder.folder_name, e);
                0
            }
        };

        FolderResult {
            folder_name: folder.folder_name.clone(),
            full_path: folder.full_path.clone(),
            items,
        }
    }

    /// Recursively import a directory. Every subdirectory is descended into
    /// and sibling iteration continues afterwards; a failing subtree is
    /// logged and skipped without aborting its siblings.
    fn import_folder_tree<'a>(
        &'a self,
        user_id: &'a str,
        token: &'a str,
        dir: &'a Path,
        folder_name: &'a str,
        parent_album: Option<&'a str>,
    ) -> BoxFuture<'a, Result<usize, ServiceError>> {
        async move {
            let album_title = match parent_album {
                Some(parent) => format!("{} - {}", parent, folder_name),
                None => folder_name.to_string(),
            };

            let entries = scanner::list_entries(dir)?;

            let mut files = Vec::new();
            let mut subdirs = Vec::new();
            for name in entries {
                if dir.join(&name).is_dir() {
                    subdirs.push(name);
                } else if scanner::is_valid_extension(&name, &self.config.valid_extensions) {
                    files.push(name);
                }
            }

            debug!(
                "Importing {:?} into album {} ({} file(s), {} subfolder(s))",
                dir,
                album_title,
                files.len(),
                subdirs.len()
            );

            let mut processed = 0;

            if !files.is_empty() {
                // Resolve the album once for the whole folder; every file in
                // it reuses the result.
                let album = self
                    .albums
                    .resolve_or_create(user_id, token, &album_title)
                    .await?;

                for batch in files.chunks(self.config.item_chunk_size.max(1)) {
                    let uploads = batch
                        .iter()
                        .map(|file| self.process_file(token, &album, file, folder_name, dir));
                    for result in join_all(uploads).await {
                        processed += result?;
                    }

                    tokio::time::sleep(self.config.batch_upload_delay).await;
                }
            }

            for subdir in subdirs {
                match self
                    .import_folder_tree(user_id, token, &dir.join(&subdir), &subdir, Some(&album_title))
                    .await
                {
                    Ok(count) => processed += count,
                    Err(e) => {
                        warn!(
                            "Import of subfolder {} failed, continuing with siblings: {}",
                            subdir, e
                        );
                    }
                }
            }

            Ok(processed)
        }
        .boxed()
    }

    /// Process one file: skip (but count) when the duplicate detector finds
    /// it in the album, upload otherwise. Upload failures are deferred to
    /// the dead letter by the executor and still count as processed.
    async fn process_file(
        &self,
        token: &str,
        album: &Album,
        file_name: &str,
        description: &str,
        dir: &Path,
    ) -> Result<usize, ServiceError> {
        if self.duplicates.exists(token, &album.id, file_name).await? {
            debug!("{} already present in album {}", file_name, album.id);
            return Ok(1);
        }

        self.uploader
            .upload(token, &album.id, file_name, description, dir, UPLOAD_TIMEOUT)
            .await?;
        Ok(1)
    }
}
