use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::OnceLock;
use thiserror::Error;

static EXPOSE_ERROR_DETAIL: OnceLock<bool> = OnceLock::new();

/// Echo internal error detail in 500 responses. Set once at startup; only
/// development environments should enable it. Unset means hidden.
pub fn expose_error_detail(enabled: bool) {
    if EXPOSE_ERROR_DETAIL.set(enabled).is_err() {
        tracing::warn!("Error detail exposure already configured");
    }
}

fn error_detail_exposed() -> bool {
    EXPOSE_ERROR_DETAIL.get().copied().unwrap_or(false)
}

fn server_error_body(detail: &str, expose: bool) -> Value {
    if expose {
        json!({ "success": false, "message": "Server error", "error": detail })
    } else {
        json!({ "success": false, "message": "Server error" })
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_)
            | AppError::ValidationError(_)
            | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            AppError::Internal(detail) | AppError::Database(detail) => {
                tracing::error!("Error: {}: {}", status, detail);
                server_error_body(detail, error_detail_exposed())
            }
            AppError::Auth(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::ValidationError(msg)
            | AppError::Conflict(msg) => {
                tracing::warn!("Request rejected: {}: {}", status, msg);
                json!({ "success": false, "message": msg })
            }
        };

        (status, Json(body)).into_response()
    }
}
