//! Shared error handling for API endpoints.
//!
//! Every domain and validation failure is turned into a response here.
//! Authentication failures never get this far; the filter chain answers them.

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::account::AccountError;
use crate::auth::SessionError;
use crate::likes::LikeError;
use crate::mail::MailError;
use crate::verification::VerificationError;

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn db_err(self, msg: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::db_error(msg, e))
    }
}

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    /// Business rule violation
    BadRequest(String),
    /// Field-level payload problems, field name to message
    Validation(BTreeMap<String, String>),
    /// Valid request with nothing to show. Answered with 200.
    Empty(String),
    TooManyRequests(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn empty(msg: impl Into<String>) -> Self {
        Self::Empty(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn db_error(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Internal("Database error".into())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    status_code: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<BTreeMap<String, String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "Request validation failed".to_string(),
                Some(fields),
            ),
            ApiError::Empty(msg) => (StatusCode::OK, msg, None),
            ApiError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg, None),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };
        (
            status,
            Json(ErrorResponse {
                status_code: status.as_u16(),
                message,
                errors,
            }),
        )
            .into_response()
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<LikeError> for ApiError {
    fn from(e: LikeError) -> Self {
        match e {
            LikeError::Storage(e) => Self::db_error("Failed to toggle like", e),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<VerificationError> for ApiError {
    fn from(e: VerificationError) -> Self {
        match e {
            VerificationError::Storage(e) => Self::db_error("Verification code storage failed", e),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<MailError> for ApiError {
    fn from(e: MailError) -> Self {
        error!(error = %e, "Failed to send mail");
        Self::Internal("Failed to send mail".into())
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        error!(error = %e, "Failed to issue session");
        Self::Internal("Failed to issue tokens".into())
    }
}
