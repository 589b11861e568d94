//! HTTP surface for the photo frame.
//!
//! Thin handlers over the search, import, and album services; every route
//! except session setup requires an established credential and resolves a
//! fresh bearer token through the auth manager before touching the remote
//! API.

use crate::auth::{AuthError, AuthManager};
use crate::config::Config;
use crate::error::ServiceError;
use crate::import::ImportService;
use crate::models::{Album, Folder, FolderSelection, ImportReport, QueueResponse, SearchParameters};
use crate::persist::Stores;
use crate::scanner;
use crate::search::SearchService;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: AuthManager,
    pub search: SearchService,
    pub imports: ImportService,
    pub stores: Stores,
}

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/session", post(create_session))
        .route("/getFolders", get(get_folders))
        .route("/getAlbums", get(get_albums))
        .route("/getQueue", get(get_queue))
        .route("/loadFromSearch", post(load_from_search))
        .route("/loadFromAlbum", post(load_from_album))
        .route("/addAlbums", post(add_albums))
        .route("/drainDeadletter", post(drain_deadletter))
        .route("/logout", get(logout))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Resolve the current user and a usable bearer token, or fail with 401.
async fn authorized(state: &AppState) -> Result<(String, String), ServiceError> {
    let token = state.auth.bearer_token().await?;
    let user_id = state
        .auth
        .profile_id()
        .await
        .ok_or(AuthError::NoCredential)?;
    Ok((user_id, token))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest {
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    profile_id: String,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
}

/// Install the credential obtained from the OAuth login flow.
async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<SessionRequest>,
) -> Json<StatusResponse> {
    state
        .auth
        .establish(body.token, body.refresh_token, body.profile_id)
        .await;
    Json(StatusResponse { status: "ok" })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FoldersResponse {
    folders: Vec<Folder>,
}

/// List importable folders under the configured root, with recursive item
/// counts. Local-only; no credential required.
async fn get_folders(State(state): State<AppState>) -> Result<Json<FoldersResponse>, ServiceError> {
    let folders = scanner::list_folders(&state.config.root_folder)?;
    Ok(Json(FoldersResponse { folders }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AlbumsResponse {
    albums: Vec<Album>,
}

async fn get_albums(State(state): State<AppState>) -> Result<Json<AlbumsResponse>, ServiceError> {
    let (user_id, token) = authorized(&state).await?;
    let albums = state.imports.albums().list(&user_id, &token).await?;
    Ok(Json(AlbumsResponse { albums }))
}

async fn get_queue(State(state): State<AppState>) -> Result<Json<QueueResponse>, ServiceError> {
    let (user_id, token) = authorized(&state).await?;
    let queue = state.search.get_queue(&user_id, &token).await?;
    Ok(Json(queue))
}

async fn load_from_search(
    State(state): State<AppState>,
    Json(parameters): Json<SearchParameters>,
) -> Result<Json<QueueResponse>, ServiceError> {
    let (user_id, token) = authorized(&state).await?;
    let queue = state
        .search
        .load_and_cache(&user_id, &token, parameters)
        .await?;
    Ok(Json(queue))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadFromAlbumRequest {
    album_id: String,
}

async fn load_from_album(
    State(state): State<AppState>,
    Json(body): Json<LoadFromAlbumRequest>,
) -> Result<Json<QueueResponse>, ServiceError> {
    let (user_id, token) = authorized(&state).await?;
    let parameters = SearchParameters::for_album(&body.album_id);
    let queue = state
        .search
        .load_and_cache(&user_id, &token, parameters)
        .await?;
    Ok(Json(queue))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddAlbumsRequest {
    folders: Vec<FolderSelection>,
}

async fn add_albums(
    State(state): State<AppState>,
    Json(body): Json<AddAlbumsRequest>,
) -> Result<Json<ImportReport>, ServiceError> {
    let (user_id, token) = authorized(&state).await?;
    let report = state
        .imports
        .import_folders(&user_id, &token, &body.folders)
        .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct DrainRequest {
    max_tries: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DrainResponse {
    remaining: usize,
}

/// Body is optional; a bare POST runs a single drain pass.
async fn drain_deadletter(
    State(state): State<AppState>,
    body: Option<Json<DrainRequest>>,
) -> Result<Json<DrainResponse>, ServiceError> {
    let (_, token) = authorized(&state).await?;
    let max_tries = body
        .and_then(|Json(b)| b.max_tries)
        .unwrap_or(1)
        .max(1);
    let remaining = state.imports.drain_deadletter(&token, max_tries).await?;
    Ok(Json(DrainResponse { remaining }))
}

/// Drop the credential and every cache tied to the user. The dead letter is
/// deliberately untouched; failed uploads survive logout.
async fn logout(State(state): State<AppState>) -> Result<Json<StatusResponse>, ServiceError> {
    if let Some(user_id) = state.auth.profile_id().await {
        info!("Logging out {}", user_id);
        state.stores.clear_user(&user_id).await?;
    }
    state.auth.clear().await;
    Ok(Json(StatusResponse { status: "ok" }))
}
