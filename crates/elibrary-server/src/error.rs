//! API error types with JSON responses.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use elibrary_core::DomainError;
use elibrary_store::StoreError;
use serde::Serialize;

/// API error that can be returned from handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Unauthorized (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500).
    #[error("internal error: {0}")]
    Internal(String),

    /// Validation or lending rule failure (400).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Store error.
    #[error("{0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Get the error code string for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Domain(e) => e.code(),
            Self::Store(e) => match e {
                StoreError::NotFound { .. } => "NOT_FOUND",
                StoreError::Conflict(_) => "CONFLICT",
                StoreError::Restricted(_) => "DELETE_RESTRICTED",
                StoreError::NoCopiesAvailable(_) => DomainError::NoCopiesAvailable.code(),
                StoreError::AlreadyReturned(_) => DomainError::AlreadyReturned.code(),
                StoreError::Domain(d) => d.code(),
                _ => "STORAGE_ERROR",
            },
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Domain(_) => StatusCode::BAD_REQUEST,
            Self::Store(e) => match e {
                StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                StoreError::Conflict(_) | StoreError::Restricted(_) => StatusCode::CONFLICT,
                StoreError::NoCopiesAvailable(_)
                | StoreError::AlreadyReturned(_)
                | StoreError::Domain(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Domain(DomainError::validation(message))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details.
    pub error: ErrorDetails,
}

/// Error details within the response.
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    /// Error code (e.g., "NOT_FOUND", "BORROW_LIMIT_REACHED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        // Storage internals stay in the log.
        let message = if status.is_server_error() {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code: self.code().to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_domain_errors_are_bad_requests_with_their_code() {
        let err = ApiError::from(DomainError::BorrowLimitReached { limit: 5 });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "BORROW_LIMIT_REACHED");
    }

    #[test]
    fn test_store_error_mapping() {
        let cases = [
            (StoreError::not_found("book", "x"), StatusCode::NOT_FOUND),
            (StoreError::Conflict("dup".into()), StatusCode::CONFLICT),
            (StoreError::Restricted("books".into()), StatusCode::CONFLICT),
            (
                StoreError::NoCopiesAvailable(Uuid::nil()),
                StatusCode::BAD_REQUEST,
            ),
            (
                StoreError::AlreadyReturned(Uuid::nil()),
                StatusCode::BAD_REQUEST,
            ),
            (
                StoreError::Domain(DomainError::NoCopiesAvailable),
                StatusCode::BAD_REQUEST,
            ),
            (
                StoreError::Migration("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_no_copies_code_matches_domain() {
        let err = ApiError::from(StoreError::NoCopiesAvailable(Uuid::nil()));
        assert_eq!(err.code(), "BOOK_UNAVAILABLE");
    }

    #[test]
    fn test_internal_message_hidden() {
        let response = ApiError::Internal("secret detail".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
