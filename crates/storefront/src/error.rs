//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error response is JSON with a machine-checkable `error` kind:
//!
//! | kind                | status |
//! |---------------------|--------|
//! | `validation_error`  | 400    |
//! | `permission_denied` | 403    |
//! | `not_found`         | 404    |
//! | `conflict`          | 409    |
//! | `dependency_error`  | 500    |

use axum::{
    Json,
    extract::multipart::MultipartRejection,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use sillage_core::{TransactionStatus, UnknownStatus};

use crate::db::RepositoryError;
use crate::models::CartError;
use crate::services::images::ImageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown transaction status.
    #[error(transparent)]
    InvalidStatus(#[from] UnknownStatus),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller may not perform the operation.
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Uniqueness rule violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-checkable error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::InvalidStatus(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "permission_denied",
            Self::Conflict(_) => "conflict",
            Self::Database(_) | Self::Internal(_) => "dependency_error",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource".to_string()),
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Database(other),
        }
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::InvalidQuantity { .. } => Self::Validation(err.to_string()),
            CartError::LineNotFound(_) => Self::NotFound(err.to_string()),
        }
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Io(_) => Self::Internal(err.to_string()),
            _ => Self::Validation(err.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_statuses: Option<Vec<&'static str>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::InvalidStatus(err) => err.to_string(),
        };

        let valid_statuses = matches!(self, Self::InvalidStatus(_))
            .then(TransactionStatus::valid_values);

        let body = ErrorBody {
            error: self.kind(),
            message,
            valid_statuses,
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
