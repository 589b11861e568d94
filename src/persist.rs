use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Time-to-live for cached search results (photo queue).
const MEDIA_ITEM_TTL: Duration = Duration::from_secs(55 * 60);
/// Time-to-live for the cached album list.
const ALBUM_TTL: Duration = Duration::from_secs(10 * 60);

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// On-disk envelope for one entry. The original key is stored inside so the
/// index can be rebuilt from the directory on startup.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    value: serde_json::Value,
}

#[derive(Debug, Clone)]
struct EntryMeta {
    file_path: PathBuf,
    expires_at: Option<DateTime<Utc>>,
}

/// A persistent key-value namespace: one JSON file per entry under a
/// directory, with an in-memory index loaded on open. Entries may carry a
/// TTL; expired entries are dropped lazily on read and listed as absent.
#[derive(Clone)]
pub struct PersistStore {
    dir: PathBuf,
    ttl: Option<Duration>,
    entries: Arc<RwLock<HashMap<String, EntryMeta>>>,
}

impl PersistStore {
    /// Open (or create) a store directory and load its existing entries.
    pub async fn open(dir: PathBuf, ttl: Option<Duration>) -> Result<Self, StoreError> {
        fs::create_dir_all(&dir).await?;

        let store = PersistStore {
            dir,
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        };
        store.load_existing_entries().await?;
        Ok(store)
    }

    /// Get and deserialize the value stored under `key`, if present and not
    /// expired. Expired or unreadable entries are removed.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let mut entries = self.entries.write().await;

        let Some(meta) = entries.get(key).cloned() else {
            return Ok(None);
        };

        if is_expired(&meta) {
            debug!("Store entry expired: {}", key);
            entries.remove(key);
            let _ = fs::remove_file(&meta.file_path).await;
            return Ok(None);
        }

        match fs::read(&meta.file_path).await {
            Ok(bytes) => {
                let envelope: Envelope = serde_json::from_slice(&bytes)?;
                Ok(Some(serde_json::from_value(envelope.value)?))
            }
            Err(e) => {
                // File vanished or can't be read; drop the index entry.
                warn!("Store entry {} unreadable, removing: {}", key, e);
                entries.remove(key);
                Ok(None)
            }
        }
    }

    /// Store `value` under `key`, replacing any previous entry. The store's
    /// TTL (if any) starts counting from now.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let expires_at = self
            .ttl
            .map(|ttl| {
                Utc::now()
                    + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero())
            });

        let envelope = Envelope {
            key: key.to_string(),
            expires_at,
            value: serde_json::to_value(value)?,
        };

        let file_path = self.dir.join(file_name_for(key));
        fs::write(&file_path, serde_json::to_vec(&envelope)?).await?;

        self.entries.write().await.insert(
            key.to_string(),
            EntryMeta {
                file_path,
                expires_at,
            },
        );
        Ok(())
    }

    /// Remove the entry stored under `key`, if any.
    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        if let Some(meta) = self.entries.write().await.remove(key) {
            let _ = fs::remove_file(&meta.file_path).await;
        }
        Ok(())
    }

    /// List the keys of all live (non-expired) entries.
    pub async fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|(_, meta)| !is_expired(meta))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Remove every entry in this namespace.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        for meta in entries.values() {
            if let Err(e) = fs::remove_file(&meta.file_path).await {
                warn!("Failed to remove store file {:?}: {}", meta.file_path, e);
            }
        }
        entries.clear();
        Ok(())
    }

    /// Rebuild the in-memory index from the store directory on startup.
    async fn load_existing_entries(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;

        let mut dir_entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir_entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            match fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice::<Envelope>(&bytes) {
                    Ok(envelope) => {
                        entries.insert(
                            envelope.key,
                            EntryMeta {
                                file_path: path,
                                expires_at: envelope.expires_at,
                            },
                        );
                    }
                    Err(e) => {
                        warn!("Skipping corrupt store file {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    warn!("Skipping unreadable store file {:?}: {}", path, e);
                }
            }
        }

        debug!("Loaded {} entries from {:?}", entries.len(), self.dir);
        Ok(())
    }
}

fn is_expired(meta: &EntryMeta) -> bool {
    meta.expires_at.is_some_and(|at| at <= Utc::now())
}

/// Encode a key into a safe, collision-free file name. Alphanumerics, `-`
/// and `_` pass through; every other byte becomes `%XX`.
fn file_name_for(key: &str) -> String {
    let mut name = String::with_capacity(key.len() + 5);
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => name.push(byte as char),
            _ => name.push_str(&format!("%{:02X}", byte)),
        }
    }
    name.push_str(".json");
    name
}

/// The five persistent namespaces used by the pipeline, opened under one
/// base directory.
#[derive(Clone)]
pub struct Stores {
    /// Cached search results per user (55 minute TTL).
    pub media_items: PersistStore,
    /// Cached album list per user (10 minute TTL).
    pub albums: PersistStore,
    /// Cached album item listings per album id (no TTL, invalidated per run).
    pub album_items: PersistStore,
    /// Generic per-user storage (last search parameters).
    pub storage: PersistStore,
    /// Failed uploads awaiting retry.
    pub deadletter: PersistStore,
}

impl Stores {
    /// Open all namespaces under `base_dir`, creating directories as needed.
    pub async fn open(base_dir: &Path) -> Result<Self, StoreError> {
        Ok(Stores {
            media_items: PersistStore::open(
                base_dir.join("media-items"),
                Some(MEDIA_ITEM_TTL),
            )
            .await?,
            albums: PersistStore::open(base_dir.join("albums"), Some(ALBUM_TTL)).await?,
            album_items: PersistStore::open(base_dir.join("album-items"), None).await?,
            storage: PersistStore::open(base_dir.join("storage"), None).await?,
            deadletter: PersistStore::open(base_dir.join("upload-deadletter"), None).await?,
        })
    }

    /// Drop everything cached for one user. The dead-letter store is not
    /// touched; its entries belong to the import pipeline, not the session.
    pub async fn clear_user(&self, user_id: &str) -> Result<(), StoreError> {
        self.media_items.remove(user_id).await?;
        self.albums.remove(user_id).await?;
        self.storage.remove(user_id).await?;
        Ok(())
    }
}
