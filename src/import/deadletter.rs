use crate::error::ServiceError;
use crate::import::uploader::{UploadExecutor, DEADLETTER_UPLOAD_TIMEOUT};
use crate::models::DeadLetterEntry;
use crate::persist::PersistStore;
use futures::future::join_all;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Pacing after each retried chunk, scaled by chunk size.
const ITEM_UPLOAD_DELAY: Duration = Duration::from_millis(500);

/// Periodically retries all persisted failed uploads. Each entry is removed
/// when picked up for a retry; a retry that fails again re-enqueues a fresh
/// entry (via the executor's normal failure path) carrying the latest error.
#[derive(Clone)]
pub struct DeadLetterDrainer {
    deadletter: PersistStore,
    uploader: UploadExecutor,
}

impl DeadLetterDrainer {
    pub fn new(deadletter: PersistStore, uploader: UploadExecutor) -> Self {
        DeadLetterDrainer {
            deadletter,
            uploader,
        }
    }

    /// Run up to `max_tries` passes over the dead letter, retrying entries
    /// in concurrent chunks of `chunk_size` with a pacing delay between
    /// chunks. Returns the number of entries still present afterwards.
    /// An empty store short-circuits without any remote calls.
    pub async fn drain(
        &self,
        token: &str,
        max_tries: usize,
        chunk_size: usize,
    ) -> Result<usize, ServiceError> {
        let chunk_size = chunk_size.max(1);

        for attempt in 1..=max_tries {
            let keys = self.deadletter.keys().await;
            if keys.is_empty() {
                return Ok(0);
            }

            info!(
                "Draining dead letter (pass {}, {} entries)",
                attempt,
                keys.len()
            );

            for chunk in keys.chunks(chunk_size) {
                let retries = chunk.iter().map(|key| self.retry_entry(token, key));
                for result in join_all(retries).await {
                    if let Err(e) = result {
                        warn!("Dead letter retry bookkeeping failed: {}", e);
                    }
                }

                tokio::time::sleep(ITEM_UPLOAD_DELAY * chunk_size as u32 / 2).await;
            }
        }

        Ok(self.deadletter.keys().await.len())
    }

    /// Retry one entry. The entry is removed up front; the executor's
    /// failure path re-enqueues it (latest error message) if the retry
    /// fails too.
    async fn retry_entry(&self, token: &str, key: &str) -> Result<(), ServiceError> {
        let Some(entry) = self.deadletter.get::<DeadLetterEntry>(key).await? else {
            return Ok(());
        };
        self.deadletter.remove(key).await?;

        self.uploader
            .upload(
                token,
                &entry.album_id,
                &entry.file_name,
                &entry.file_description,
                Path::new(&entry.folder_path),
                DEADLETTER_UPLOAD_TIMEOUT,
            )
            .await?;
        Ok(())
    }
}
