use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::{blob_store::StoreError, document_service::DocumentError};

/// User-facing message for any missing or foreign document.
pub const NOT_FOUND_MESSAGE: &str = "document not found";
/// User-facing message for any rendering failure.
pub const RENDER_FAILED_MESSAGE: &str = "could not generate document";

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found. The message never says whose document
    /// it was or whether it exists at all.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
    }

    /// Shortcut for 401 Unauthorized
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::NotFound(_) => AppError::not_found(),
            DocumentError::Render(err) => {
                tracing::warn!("render failed: {}", err);
                AppError::new(StatusCode::UNPROCESSABLE_ENTITY, RENDER_FAILED_MESSAGE)
            }
            DocumentError::Store(err) => err.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AppError::not_found(),
            StoreError::Connection(err) => {
                tracing::error!("storage backend unavailable: {}", err);
                AppError::new(StatusCode::SERVICE_UNAVAILABLE, "storage unavailable")
            }
            other => {
                tracing::error!("storage failure: {}", other);
                AppError::internal("storage failure")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn not_found_is_uniform() {
        let err: AppError = DocumentError::NotFound(Uuid::new_v4()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, NOT_FOUND_MESSAGE);
    }

    #[test]
    fn render_errors_map_to_generic_message() {
        let err: AppError =
            DocumentError::Render(crate::render::RenderError::Markup("bad".into())).into();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.message, RENDER_FAILED_MESSAGE);
    }

    #[test]
    fn connection_errors_are_unavailable() {
        let err: AppError = StoreError::Connection(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
