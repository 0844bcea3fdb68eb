//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Why a request could not be authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Protected route reached without any credentials
    NotAuthenticated,
    /// Access token is malformed, forged, or of the wrong type
    InvalidToken,
    /// Access token expired and no refresh token was supplied
    RefreshTokenMissing,
    /// Refresh token is malformed, expired, forged, or no longer the stored one
    InvalidRefreshToken,
    /// Token is on the revocation list
    TokenRevoked,
    /// Token subject does not match any user
    UserNotFound,
    /// Storage or signing failure
    Internal,
}

/// API authentication error. Rendered as `{"message": ...}`.
#[derive(Debug)]
pub struct ApiAuthError {
    kind: AuthErrorKind,
}

impl ApiAuthError {
    pub fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    fn status_code(&self) -> StatusCode {
        match self.kind {
            AuthErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotAuthenticated => "Not authenticated",
            AuthErrorKind::InvalidToken => "Invalid access token",
            AuthErrorKind::RefreshTokenMissing => "Access token expired and no refresh token was sent",
            AuthErrorKind::InvalidRefreshToken => "Invalid or expired refresh token",
            AuthErrorKind::TokenRevoked => "Token has been revoked",
            AuthErrorKind::UserNotFound => "User not found",
            AuthErrorKind::Internal => "Internal server error",
        }
    }
}

impl From<AuthErrorKind> for ApiAuthError {
    fn from(kind: AuthErrorKind) -> Self {
        Self::new(kind)
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                message: self.message(),
            }),
        )
            .into_response()
    }
}
