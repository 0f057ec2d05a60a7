//! Error handling for the depot ledger server
//!
//! Translates ledger conditions into consistent JSON error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::ledger::LedgerError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Ledger errors
    #[error("No stock record: {0}")]
    NoStockRecord(String),

    #[error("Insufficient stock: available {available_bags} bags, requested {requested_bags} bags")]
    InsufficientStock {
        available_bags: i64,
        requested_bags: i64,
    },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_bags: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_bags: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortfall_bags: Option<i64>,
}

impl ErrorDetail {
    fn new(code: &str, message: String) -> Self {
        Self {
            code: code.to_string(),
            message,
            field: None,
            available_bags: None,
            requested_bags: None,
            shortfall_bags: None,
        }
    }
}

impl AppError {
    /// HTTP status and response body for this error
    pub fn detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    field: Some(field.clone()),
                    ..ErrorDetail::new("VALIDATION_ERROR", message.clone())
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", msg.clone()),
            ),
            AppError::DuplicateEntry(what) => (
                StatusCode::CONFLICT,
                ErrorDetail::new("DUPLICATE_ENTRY", format!("A {} already exists", what)),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::NoStockRecord(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(
                    "NO_STOCK_RECORD",
                    format!("{}. Please add stock before recording sales.", msg),
                ),
            ),
            AppError::InsufficientStock {
                available_bags,
                requested_bags,
            } => {
                let shortfall = requested_bags - available_bags;
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorDetail {
                        available_bags: Some(*available_bags),
                        requested_bags: Some(*requested_bags),
                        shortfall_bags: Some(shortfall),
                        ..ErrorDetail::new(
                            "INSUFFICIENT_STOCK",
                            format!(
                                "Insufficient stock! Available: {} bags, Trying to sell: {} bags. Shortage: {} bags.",
                                available_bags, requested_bags, shortfall
                            ),
                        )
                    },
                )
            }
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred".to_string()),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            ),
        }
    }

    /// Map a unique-constraint violation to `DuplicateEntry`, passing other errors through
    pub fn from_unique_violation(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AppError::DuplicateEntry(what.to_string());
            }
        }
        err.into()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.detail();

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NoStockRecord { .. } => AppError::NoStockRecord(err.to_string()),
            LedgerError::InsufficientStock {
                available_bags,
                requested_bags,
            } => AppError::InsufficientStock {
                available_bags,
                requested_bags,
            },
            LedgerError::Validation { field, message } => AppError::Validation { field, message },
            LedgerError::DuplicateKey(what) => AppError::DuplicateEntry(what),
            LedgerError::NotFound(resource) => AppError::NotFound(resource),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        match errors.field_errors().into_iter().next() {
            Some((field, errs)) => AppError::Validation {
                field: field.to_string(),
                message: errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field)),
            },
            None => AppError::ValidationError(errors.to_string()),
        }
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
