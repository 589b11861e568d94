use crate::models::{DeadLetterEntry, MediaItem};
use crate::persist::{PersistStore, StoreError};
use crate::photos::{ApiError, PhotosApi};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default timeout for a normal upload.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for dead-letter retries; those are assumed to be the harder
/// cases and get more patience.
pub const DEADLETTER_UPLOAD_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Uploads a single file's bytes and commits them into a target album.
/// Failures are contained, not raised: the attempt is persisted to the dead
/// letter and the bulk import continues with the next file. A single bad
/// file must not abort a multi-hundred-file import.
#[derive(Clone)]
pub struct UploadExecutor {
    api: Arc<dyn PhotosApi>,
    deadletter: PersistStore,
}

impl UploadExecutor {
    pub fn new(api: Arc<dyn PhotosApi>, deadletter: PersistStore) -> Self {
        UploadExecutor { api, deadletter }
    }

    /// Upload `file_name` from `folder_path` into `album_id`. Returns the
    /// created media item, or `None` if the attempt failed and was deferred
    /// to the dead letter.
    pub async fn upload(
        &self,
        token: &str,
        album_id: &str,
        file_name: &str,
        description: &str,
        folder_path: &Path,
        timeout: Duration,
    ) -> Result<Option<MediaItem>, StoreError> {
        debug!(
            "Uploading {} from {:?} into album {}",
            file_name, folder_path, album_id
        );

        match self
            .try_upload(token, album_id, file_name, description, folder_path, timeout)
            .await
        {
            Ok(item) => {
                debug!("Uploaded {} into album {} as {}", file_name, album_id, item.id);
                Ok(Some(item))
            }
            Err(e) => {
                warn!(
                    "Upload of {} into album {} failed, deferring to dead letter: {}",
                    file_name, album_id, e
                );
                self.enqueue_failure(album_id, file_name, description, folder_path, &e)
                    .await?;
                Ok(None)
            }
        }
    }

    async fn try_upload(
        &self,
        token: &str,
        album_id: &str,
        file_name: &str,
        description: &str,
        folder_path: &Path,
        timeout: Duration,
    ) -> Result<MediaItem, ApiError> {
        let file_path = folder_path.join(file_name);
        let bytes = tokio::fs::read(&file_path)
            .await
            .map_err(|e| ApiError::local("IoError", format!("{}: {}", file_path.display(), e)))?;

        let upload_token = self
            .api
            .upload_bytes(token, file_name, bytes, timeout)
            .await?;

        self.api
            .create_media_item(token, album_id, file_name, description, &upload_token, timeout)
            .await
    }

    async fn enqueue_failure(
        &self,
        album_id: &str,
        file_name: &str,
        description: &str,
        folder_path: &Path,
        error: &ApiError,
    ) -> Result<(), StoreError> {
        let entry = DeadLetterEntry {
            album_id: album_id.to_string(),
            file_name: file_name.to_string(),
            file_description: description.to_string(),
            folder_path: folder_path.to_path_buf(),
            last_error: error.to_string(),
            failed_at: Utc::now(),
        };

        // Random keys: two failures in the same instant must not collide.
        self.deadletter
            .set(&Uuid::new_v4().to_string(), &entry)
            .await
    }
}
