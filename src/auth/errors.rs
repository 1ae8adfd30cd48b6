//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Internal auth error kind used by the gate.
#[derive(Debug)]
pub enum AuthErrorKind {
    NotAuthenticated,
    InvalidToken,
    IdentityNotFound,
    InsufficientRole,
    StoreError,
}

/// Gate rejection, rendered as a JSON error body.
#[derive(Debug)]
pub struct AuthError {
    pub(super) kind: AuthErrorKind,
}

impl AuthError {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    fn status_code(&self) -> StatusCode {
        match self.kind {
            AuthErrorKind::NotAuthenticated
            | AuthErrorKind::InvalidToken
            | AuthErrorKind::IdentityNotFound => StatusCode::UNAUTHORIZED,
            // Role mismatch is a distinct Forbidden, not Unauthorized
            AuthErrorKind::InsufficientRole => StatusCode::FORBIDDEN,
            AuthErrorKind::StoreError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotAuthenticated => "Unauthorized request",
            AuthErrorKind::InvalidToken => "Invalid or expired token",
            AuthErrorKind::IdentityNotFound => "Invalid access token",
            AuthErrorKind::InsufficientRole => "You are not allowed to perform this action",
            AuthErrorKind::StoreError => "Database error",
        }
    }
}

impl From<AuthErrorKind> for AuthError {
    fn from(kind: AuthErrorKind) -> Self {
        Self::new(kind)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
