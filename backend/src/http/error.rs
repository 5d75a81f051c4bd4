//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;
use crate::db::repository::RepositoryError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// No usable credentials
    Unauthorized(String),
    /// Identified caller outside the allow-list
    Forbidden(String),
    /// Invalid request (validation error)
    BadRequest(String),
    /// Repository error
    Repository(RepositoryError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Repository(RepositoryError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Repository(RepositoryError::ValidationError { .. }) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::Unauthorized(msg) => ApiError::new("UNAUTHORIZED", msg),
            AppError::Forbidden(msg) => ApiError::new("FORBIDDEN", msg),
            AppError::BadRequest(msg) => ApiError::new("BAD_REQUEST", msg),
            AppError::Repository(e) => match &e {
                RepositoryError::NotFound { message, .. } => ApiError::new("NOT_FOUND", message),
                RepositoryError::ValidationError { message, .. } => {
                    ApiError::new("BAD_REQUEST", message)
                }
                _ => {
                    tracing::error!("Repository failure: {}", e);
                    let error = ApiError::new("REPOSITORY_ERROR", "Venue storage is unavailable");
                    match e.context().operation.as_deref() {
                        Some(operation) => error.with_details(format!("operation: {}", operation)),
                        None => error,
                    }
                }
            },
        };

        (status, Json(error)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden { .. } => AppError::Forbidden(err.to_string()),
            AuthError::VerifierUnavailable(_) => {
                tracing::warn!("Token verification failed: {}", err);
                AppError::Unauthorized("token could not be verified".to_string())
            }
            _ => AppError::Unauthorized(err.to_string()),
        }
    }
}
