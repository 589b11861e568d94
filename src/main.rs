use photoframe::auth::{AuthConfig, AuthManager};
use photoframe::config::Config;
use photoframe::import::{
    AlbumDirectory, DeadLetterDrainer, DuplicateDetector, ImportConfig, ImportService,
    UploadExecutor,
};
use photoframe::persist::Stores;
use photoframe::photos::{PhotosApi, PhotosClient};
use photoframe::search::SearchService;
use photoframe::server::{create_router, AppState};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Use RUST_LOG env var if set, otherwise default to info level
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    let config = Arc::new(Config::load());
    info!(
        "Starting photoframe on port {} with root folder {:?}",
        config.port, config.root_folder
    );

    let stores = match Stores::open(&config.store_dir).await {
        Ok(stores) => stores,
        Err(e) => {
            error!("Failed to open stores under {:?}: {}", config.store_dir, e);
            std::process::exit(1);
        }
    };

    let auth = AuthManager::new(AuthConfig {
        client_id: config.oauth_client_id.clone(),
        client_secret: config.oauth_client_secret.clone(),
        auth_endpoint: config.auth_endpoint.clone(),
        token_lifetime: config.token_lifetime,
    });

    let api: Arc<dyn PhotosApi> = Arc::new(PhotosClient::new(config.api_endpoint.clone()));

    let search = SearchService::new(
        api.clone(),
        stores.media_items.clone(),
        stores.storage.clone(),
        config.photos_to_load,
        config.search_page_size,
    );

    let albums = AlbumDirectory::new(api.clone(), stores.albums.clone(), config.album_page_size);
    let duplicates = DuplicateDetector::new(
        api.clone(),
        stores.album_items.clone(),
        config.search_page_size,
    );
    let uploader = UploadExecutor::new(api.clone(), stores.deadletter.clone());
    let drainer = DeadLetterDrainer::new(stores.deadletter.clone(), uploader.clone());
    let imports = ImportService::new(
        albums,
        duplicates,
        uploader,
        drainer,
        stores.deadletter.clone(),
        ImportConfig {
            valid_extensions: config.valid_extensions.clone(),
            ..ImportConfig::default()
        },
    );

    let app = create_router(AppState {
        config: config.clone(),
        auth,
        search,
        imports,
        stores,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Listening on {}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
