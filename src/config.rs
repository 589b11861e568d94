use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Application configuration, read from environment variables.
/// In debug builds a `.env` file is loaded first when present.
#[derive(Clone, Debug)]
pub struct Config {
    /// Port the HTTP server listens on.
    pub port: u16,
    /// Root directory scanned for importable folders.
    pub root_folder: PathBuf,
    /// Base directory for the persistent key-value stores.
    pub store_dir: PathBuf,
    /// Base URL of the remote photo-library API.
    pub api_endpoint: String,
    /// Base URL of the remote OAuth token endpoint.
    pub auth_endpoint: String,
    pub oauth_client_id: String,
    pub oauth_client_secret: String,
    /// Bearer token age after which a refresh is required.
    pub token_lifetime: Duration,
    /// Minimum number of photos a search tries to accumulate.
    pub photos_to_load: usize,
    /// Page size for `mediaItems:search` requests.
    pub search_page_size: i32,
    /// Page size for album list requests.
    pub album_page_size: i32,
    /// Allow-listed file extensions for uploads (case-insensitive).
    pub valid_extensions: Vec<String>,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Self {
        #[cfg(debug_assertions)]
        if dotenvy::dotenv().is_ok() {
            info!("loaded .env file");
        }

        let store_dir = env_var("PHOTOFRAME_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home_dir = dirs::home_dir().expect("Failed to get home directory");
                home_dir.join(".photoframe")
            });

        Config {
            port: parse_var("PHOTOFRAME_PORT", 8080),
            root_folder: env_var("PHOTOFRAME_ROOT_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("photos")),
            store_dir,
            api_endpoint: env_var("PHOTOFRAME_API_ENDPOINT")
                .unwrap_or_else(|| "https://photoslibrary.googleapis.com".to_string()),
            auth_endpoint: env_var("PHOTOFRAME_AUTH_ENDPOINT")
                .unwrap_or_else(|| "https://oauth2.googleapis.com".to_string()),
            oauth_client_id: env_var("PHOTOFRAME_CLIENT_ID").unwrap_or_default(),
            oauth_client_secret: env_var("PHOTOFRAME_CLIENT_SECRET").unwrap_or_default(),
            token_lifetime: Duration::from_secs(parse_var(
                "PHOTOFRAME_TOKEN_LIFETIME_SECS",
                45 * 60,
            )),
            photos_to_load: parse_var("PHOTOFRAME_PHOTOS_TO_LOAD", 150),
            search_page_size: parse_var("PHOTOFRAME_SEARCH_PAGE_SIZE", 100),
            album_page_size: parse_var("PHOTOFRAME_ALBUM_PAGE_SIZE", 50),
            valid_extensions: env_var("PHOTOFRAME_VALID_EXTENSIONS")
                .map(|v| v.split(',').map(|e| e.trim().to_string()).collect())
                .unwrap_or_else(default_extensions),
        }
    }
}

fn default_extensions() -> Vec<String> {
    ["JPG", "JPEG", "PNG", "GIF", "BMP", "WEBP"]
        .iter()
        .map(|e| e.to_string())
        .collect()
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env_var(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
