use crate::photos::ApiError;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Errors from the token lifecycle
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("no credential established")]
    NoCredential,
    #[error("session is stale and no refresh token is available")]
    MissingRefreshToken,
    #[error("token refresh failed: {0}")]
    Refresh(#[from] ApiError),
}

/// The one active credential for this process. The deployment model is
/// single-user-per-process; see DESIGN.md.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub refresh_token: Option<String>,
    pub profile_id: String,
    issued_at: Instant,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Base URL of the remote auth service (token endpoint is `/token`).
    pub auth_endpoint: String,
    /// Token age beyond which a refresh is required.
    pub token_lifetime: Duration,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Tracks the bearer token and its expiry, refreshing it through the remote
/// auth endpoint when stale. Owned by the application state and passed to
/// every component that talks to the remote API, rather than living in
/// module-level mutable state.
#[derive(Clone)]
pub struct AuthManager {
    http: Client,
    config: Arc<AuthConfig>,
    session: Arc<RwLock<Option<AuthSession>>>,
}

impl AuthManager {
    pub fn new(config: AuthConfig) -> Self {
        AuthManager {
            http: Client::new(),
            config: Arc::new(config),
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Install the credential obtained at login.
    pub async fn establish(&self, token: String, refresh_token: Option<String>, profile_id: String) {
        info!("Credential established for {}", profile_id);
        *self.session.write().await = Some(AuthSession {
            token,
            refresh_token,
            profile_id,
            issued_at: Instant::now(),
        });
    }

    /// Drop the active credential; subsequent calls fail closed until a new
    /// one is established.
    pub async fn clear(&self) {
        info!("credential cleared");
        *self.session.write().await = None;
    }

    /// The profile id of the established session, if any.
    pub async fn profile_id(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.profile_id.clone())
    }

    /// Return a usable bearer token, refreshing it first if it has aged past
    /// the configured lifetime. Fails closed when no session was ever
    /// established or when a stale session has no refresh credential.
    pub async fn bearer_token(&self) -> Result<String, AuthError> {
        {
            let session = self.session.read().await;
            let session = session.as_ref().ok_or(AuthError::NoCredential)?;
            if session.issued_at.elapsed() < self.config.token_lifetime {
                return Ok(session.token.clone());
            }
        }
        self.refresh().await
    }

    /// Exchange the refresh credential for a new bearer token and reset the
    /// staleness clock. No-op returning the current token if another task
    /// refreshed while we waited for the write lock.
    async fn refresh(&self) -> Result<String, AuthError> {
        let mut session = self.session.write().await;
        let current = session.as_mut().ok_or(AuthError::NoCredential)?;

        if current.issued_at.elapsed() < self.config.token_lifetime {
            return Ok(current.token.clone());
        }

        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or(AuthError::MissingRefreshToken)?;

        info!("refreshing stale bearer token");

        let response = self
            .http
            .post(format!("{}/token", self.config.auth_endpoint))
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(ApiError::from)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Token refresh rejected with status {}", status);
            return Err(AuthError::Refresh(ApiError {
                name: "TokenRefreshError".to_string(),
                code: status.as_u16(),
                message: body,
            }));
        }

        let refreshed: TokenResponse = response.json().await.map_err(ApiError::from)?;
        current.token = refreshed.access_token.clone();
        current.issued_at = Instant::now();

        info!("bearer token refreshed");
        Ok(refreshed.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(lifetime: Duration) -> AuthManager {
        AuthManager::new(AuthConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            auth_endpoint: "http://localhost:0".to_string(),
            token_lifetime: lifetime,
        })
    }

    #[tokio::test]
    async fn test_no_credential_fails_closed() {
        let auth = manager(Duration::from_secs(60));
        assert!(matches!(
            auth.bearer_token().await,
            Err(AuthError::NoCredential)
        ));
    }

    #[tokio::test]
    async fn test_fresh_token_returned_without_refresh() {
        let auth = manager(Duration::from_secs(60));
        auth.establish("tok".to_string(), Some("refresh".to_string()), "user".to_string())
            .await;
        assert_eq!(auth.bearer_token().await.unwrap(), "tok");
    }

    #[tokio::test]
    async fn test_stale_without_refresh_token_fails() {
        let auth = manager(Duration::ZERO);
        auth.establish("tok".to_string(), None, "user".to_string())
            .await;
        assert!(matches!(
            auth.bearer_token().await,
            Err(AuthError::MissingRefreshToken)
        ));
    }
}
