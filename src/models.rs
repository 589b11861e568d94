use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A directory discovered under the configured root folder.
/// Read-only snapshot of the filesystem at scan time; not persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub folder_name: String,
    pub full_path: PathBuf,
    /// Recursive count of non-hidden files below this folder.
    pub item_count: usize,
}

/// A remote album. Identity is the remote-assigned id; the title is the
/// matching key this system uses (titles it creates are effectively unique).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Album {
    pub id: String,
    pub title: String,
}

/// A remote photo or video entry. Existence is checked, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Parameters for a `mediaItems:search` call. The filters object is passed
/// through opaquely; pagination fields are cleared before the parameters are
/// stored for later replay.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl SearchParameters {
    /// Parameters for listing a single album's contents.
    pub fn for_album(album_id: &str) -> Self {
        SearchParameters {
            album_id: Some(album_id.to_string()),
            ..Default::default()
        }
    }

    /// Drop pagination state so the parameters can be stored or resubmitted.
    pub fn clear_pagination(&mut self) {
        self.page_size = None;
        self.page_token = None;
    }
}

/// The last search parameters that produced a user's current queue, stored
/// so the query can be replayed after the photo cache expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedQuery {
    pub parameters: SearchParameters,
}

/// A durable record of a failed upload attempt, held for later retry.
/// Keyed in the dead-letter store by a random UUID.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterEntry {
    pub album_id: String,
    pub file_name: String,
    pub file_description: String,
    pub folder_path: PathBuf,
    pub last_error: String,
    pub failed_at: DateTime<Utc>,
}

/// A top-level folder picked for bulk import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSelection {
    pub folder_name: String,
    pub full_path: PathBuf,
}

/// Per-folder outcome of a bulk import: how many valid files were uploaded
/// or recognized as already present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderResult {
    pub folder_name: String,
    pub full_path: PathBuf,
    pub items: usize,
}

/// Summary returned by a bulk import run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub folders_result: Vec<FolderResult>,
    /// Entries still unresolved after the postflight drain.
    pub deadletter_count: usize,
}

/// Response for queue fetches and search submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueResponse {
    pub photos: Vec<MediaItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<SearchParameters>,
}

impl QueueResponse {
    /// Response for a user with no cached photos and no stored query.
    pub fn empty() -> Self {
        QueueResponse {
            photos: Vec::new(),
            parameters: None,
        }
    }
}
