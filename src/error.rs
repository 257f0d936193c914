// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A field of the caller's input failed validation.
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Caller is authenticated but does not own the resource.
    #[error("Not allowed: {0}")]
    Unauthorized(String),

    #[error("Notification already sent for this listing")]
    DuplicateNotification,

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<crate::services::CatalogError> for AppError {
    fn from(e: crate::services::CatalogError) -> Self {
        AppError::BackendUnavailable(format!("Card catalog: {}", e))
    }
}

impl From<validator::ValidationErrors> for AppError {
    /// Reports the first failing field (by name) so responses are stable.
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut failures: Vec<(String, String)> = errors
            .field_errors()
            .into_iter()
            .filter_map(|(field, errs)| {
                errs.first().map(|e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    (field.to_string(), message)
                })
            })
            .collect();
        failures.sort();

        match failures.into_iter().next() {
            Some((field, message)) => AppError::Validation { field, message },
            None => AppError::BadRequest(errors.to_string()),
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, field, details) = match &self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                Some(field.clone()),
                Some(message.clone()),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", None, Some(msg.clone()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", None, Some(msg.clone())),
            AppError::Unauthorized(msg) => {
                (StatusCode::FORBIDDEN, "unauthorized", None, Some(msg.clone()))
            }
            AppError::DuplicateNotification => (
                StatusCode::CONFLICT,
                "duplicate_notification",
                None,
                Some(self.to_string()),
            ),
            AppError::BackendUnavailable(msg) => {
                tracing::error!(error = %msg, "Backend unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "backend_unavailable",
                    None,
                    None,
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None, None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            field,
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
