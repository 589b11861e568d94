use crate::auth::AuthError;
use crate::persist::StoreError;
use crate::photos::ApiError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Top-level error taxonomy. Per-file upload failures never surface here
/// (they are deferred to the dead letter); everything that does reach a
/// caller is one of these.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),
    /// Preflight violations: empty/oversized selection, non-empty dead
    /// letter before an import.
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Remote(#[from] ApiError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    name: String,
    code: u16,
    message: String,
}

impl ServiceError {
    fn body(&self) -> ErrorBody {
        match self {
            ServiceError::Auth(e) => ErrorBody {
                name: "AuthError".to_string(),
                code: 401,
                message: e.to_string(),
            },
            ServiceError::Conflict(message) => ErrorBody {
                name: "ConflictError".to_string(),
                code: 409,
                message: message.clone(),
            },
            ServiceError::Remote(e) => ErrorBody {
                name: e.name.clone(),
                code: e.code,
                message: e.message.clone(),
            },
            ServiceError::Io(e) => ErrorBody {
                name: "IOError".to_string(),
                code: 500,
                message: e.to_string(),
            },
            ServiceError::Store(e) => ErrorBody {
                name: "StorageError".to_string(),
                code: 500,
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = self.body();
        let status =
            StatusCode::from_u16(body.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
