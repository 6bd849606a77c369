// ABOUTME: Unified error types for the assistant request pipeline
// ABOUTME: Maps internal failures to the small typed error surface exposed to callers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # Error Handling
//!
//! Central error taxonomy for the assistant backend. Every fallible step of
//! the request pipeline returns [`AppError`], which carries an [`ErrorCode`]
//! that determines the HTTP status and the wire-level code the client sees.
//!
//! Completion-service failures (`CompletionTimeout`, `CompletionServiceError`)
//! are never surfaced to callers; the orchestrator converts them to fallback
//! replies. They exist here so the completion client can report them upward
//! with type information intact.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// No authenticated caller identity was supplied
    #[serde(rename = "UNAUTHENTICATED")]
    Unauthenticated,
    /// Message empty, over length, or otherwise malformed
    #[serde(rename = "INVALID_ARGUMENT")]
    InvalidArgument,
    /// Hourly or daily request quota exhausted
    #[serde(rename = "RESOURCE_EXHAUSTED")]
    ResourceExhausted,
    /// Completion call exceeded its deadline
    #[serde(rename = "DEADLINE_EXCEEDED")]
    DeadlineExceeded,
    /// Completion service returned an error
    #[serde(rename = "UNAVAILABLE")]
    Unavailable,
    /// Persistent store operation failed
    #[serde(rename = "STORAGE_ERROR")]
    StorageError,
    /// Programmer-error invariant violation or unexpected internal failure
    #[serde(rename = "INTERNAL")]
    Internal,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::InvalidArgument => 400,
            Self::ResourceExhausted => 429,
            Self::DeadlineExceeded => 504,
            Self::Unavailable => 503,
            Self::StorageError | Self::Internal => 500,
        }
    }

    /// Get a user-facing description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "Authentication is required",
            Self::InvalidArgument => "The provided input is invalid",
            Self::ResourceExhausted => "Request quota exceeded",
            Self::DeadlineExceeded => "The operation took too long to complete",
            Self::Unavailable => "A required service is currently unavailable",
            Self::StorageError => "Storage operation failed",
            Self::Internal => "An internal error occurred",
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
#[error("{}: {}", .code.description(), .message)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Milliseconds until the caller may retry (rate limiting only)
    pub retry_after_ms: Option<i64>,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retry_after_ms: None,
            source: None,
        }
    }

    /// Attach a source error for chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Missing or invalid caller identity
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthenticated, message)
    }

    /// Invalid request input
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    /// Quota exhausted, with a hint for when to retry
    #[must_use]
    pub fn rate_limited(retry_after_ms: i64) -> Self {
        let secs = (retry_after_ms / 1000).max(1);
        let mut err = Self::new(
            ErrorCode::ResourceExhausted,
            format!("Too many requests. Try again in ~{secs}s"),
        );
        err.retry_after_ms = Some(retry_after_ms);
        err
    }

    /// Completion call exceeded its deadline
    #[must_use]
    pub fn completion_timeout(deadline_secs: u64) -> Self {
        Self::new(
            ErrorCode::DeadlineExceeded,
            format!("Completion call exceeded {deadline_secs}s deadline"),
        )
    }

    /// Completion service failure
    pub fn completion_service(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unavailable, message)
    }

    /// Persistent store failure
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    /// Programmer-error invariant violation. Same wire code as `internal`,
    /// but logged loudly at the call site before the request aborts.
    pub fn invariant_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Whether the orchestrator must convert this error into a fallback reply
    /// rather than surface it to the caller
    #[must_use]
    pub const fn is_completion_failure(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::DeadlineExceeded | ErrorCode::Unavailable
        )
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorResponseDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<i64>,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message,
                retry_after_ms: error.retry_after_ms,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = http::StatusCode::from_u16(self.http_status())
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse::from(self);
        (status, Json(body)).into_response()
    }
}

/// Conversion from anyhow::Error for glue code at module seams
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(ErrorCode::Internal, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::Unauthenticated.http_status(), 401);
        assert_eq!(ErrorCode::InvalidArgument.http_status(), 400);
        assert_eq!(ErrorCode::ResourceExhausted.http_status(), 429);
        assert_eq!(ErrorCode::Internal.http_status(), 500);
    }

    #[test]
    fn test_rate_limited_carries_retry_hint() {
        let err = AppError::rate_limited(90_000);
        assert_eq!(err.code, ErrorCode::ResourceExhausted);
        assert_eq!(err.retry_after_ms, Some(90_000));
        assert!(err.message.contains("90s"));
    }

    #[test]
    fn test_completion_failures_are_internalized() {
        assert!(AppError::completion_timeout(8).is_completion_failure());
        assert!(AppError::completion_service("boom").is_completion_failure());
        assert!(!AppError::internal("boom").is_completion_failure());
    }

    #[test]
    fn test_error_response_serialization() {
        let err = AppError::rate_limited(5000);
        let response = ErrorResponse::from(err);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("RESOURCE_EXHAUSTED"));
        assert!(json.contains("retry_after_ms"));
    }
}
