//! Application error types and error handling
//!
//! Storage errors are classified here: catalog-level failures (missing table
//! or column) become [`AppError::CatalogMissing`] so callers can degrade to
//! empty results instead of failing the request.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::middleware::request_id::RequestId;

/// Postgres error codes for a missing relation or column, as opposed to an
/// I/O or constraint failure.
const PG_UNDEFINED_TABLE: &str = "42P01";
const PG_UNDEFINED_COLUMN: &str = "42703";
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error on field '{field}': {message}")]
    ValidationError { field: String, message: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Missing table or column in storage catalog")]
    CatalogMissing,

    #[error("Internal error: {message}")]
    InternalError { message: String },

    #[error("Database error: {message}")]
    DatabaseError { message: String },
}

impl AppError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::ValidationError { .. } => "VALIDATION_ERROR",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Conflict { .. } => "CONFLICT",
            AppError::CatalogMissing => "CATALOG_MISSING",
            AppError::InternalError { .. } => "INTERNAL_ERROR",
            AppError::DatabaseError { .. } => "DATABASE_ERROR",
        }
    }

    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::InternalError {
            message: message.into(),
        }
    }

    /// True for errors the store layer converts into empty results.
    pub fn is_catalog_missing(&self) -> bool {
        matches!(self, AppError::CatalogMissing)
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
    pub meta: ErrorMeta,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error metadata
#[derive(Debug, Serialize)]
pub struct ErrorMeta {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::TokenExpired => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            // Catalog errors are absorbed by the store layer; one leaking
            // this far is an internal failure.
            AppError::CatalogMissing => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DatabaseError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let request_id = RequestId::new().0;

        let details = match self {
            AppError::ValidationError { field, .. } => {
                Some(serde_json::json!({ "field": field }))
            }
            _ => None,
        };

        let error_response = ErrorResponse {
            success: false,
            error: ErrorDetails {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details,
            },
            meta: ErrorMeta {
                request_id,
                timestamp: Utc::now(),
            },
        };

        HttpResponse::build(self.status_code()).json(error_response)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound {
                resource: "record".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    if code == PG_UNDEFINED_TABLE || code == PG_UNDEFINED_COLUMN {
                        return AppError::CatalogMissing;
                    }
                    if code == PG_UNIQUE_VIOLATION {
                        return AppError::Conflict {
                            message: "Resource already exists".to_string(),
                        };
                    }
                }
                tracing::error!(error = %db_err, "Database error");
                AppError::DatabaseError {
                    message: "A database error occurred".to_string(),
                }
            }
            _ => {
                tracing::error!(error = %err, "Database error");
                AppError::DatabaseError {
                    message: "A database error occurred".to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::validation("page", "must be >= 1").error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(AppError::Unauthorized.error_code(), "UNAUTHORIZED");
        assert_eq!(AppError::Forbidden.error_code(), "FORBIDDEN");
        assert_eq!(AppError::not_found("ban").error_code(), "NOT_FOUND");
        assert_eq!(AppError::CatalogMissing.error_code(), "CATALOG_MISSING");
        assert_eq!(AppError::internal("oops").error_code(), "INTERNAL_ERROR");
        assert_eq!(
            AppError::DatabaseError {
                message: "err".to_string()
            }
            .error_code(),
            "DATABASE_ERROR"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::validation("limit", "out of range").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::not_found("ban").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::CatalogMissing.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::internal("oops").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_catalog_missing_predicate() {
        assert!(AppError::CatalogMissing.is_catalog_missing());
        assert!(!AppError::Unauthorized.is_catalog_missing());
        assert!(!AppError::DatabaseError {
            message: "io".to_string()
        }
        .is_catalog_missing());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
