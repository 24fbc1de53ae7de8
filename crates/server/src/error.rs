//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-fault errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`; collaborator errors are mapped at the handler
//! boundary and nothing is allowed to crash the dispatcher.
//!
//! Every error response is a JSON envelope `{"message": ...}` with the
//! taxonomy status code: 400 validation, 401 unauthenticated/invalid token,
//! 403 forbidden, 404 not found, 409 conflict, 500 internal.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::images::ImageStoreError;
use crate::services::token::TokenError;

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session token verification failed.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Image storage collaborator failed.
    #[error("Image store error: {0}")]
    Image(#[from] ImageStoreError),

    /// Missing or malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No credentials presented.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Caller lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Referenced entity absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate unique key.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The HTTP status code this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
                AuthError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Token(err) => match err {
                TokenError::Invalid | TokenError::Expired => StatusCode::UNAUTHORIZED,
                TokenError::Creation => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Image(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The client-facing message. Internal details are never exposed.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidEmail(_) => "Invalid email address".to_owned(),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidCredentials => "Invalid credentials".to_owned(),
                AuthError::UserNotFound => "User does not exist".to_owned(),
                AuthError::UserAlreadyExists => "User already exists".to_owned(),
                AuthError::Repository(RepositoryError::NotFound) => "User not found".to_owned(),
                AuthError::Repository(RepositoryError::Conflict(_)) => {
                    "User already exists".to_owned()
                }
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    "Internal server error".to_owned()
                }
            },
            Self::Token(err) => match err {
                TokenError::Invalid | TokenError::Expired => "Invalid token".to_owned(),
                TokenError::Creation => "Internal server error".to_owned(),
            },
            Self::Database(RepositoryError::NotFound) => "Not found".to_owned(),
            Self::Database(RepositoryError::Conflict(_)) => "Conflict".to_owned(),
            Self::Database(_) | Self::Image(_) | Self::Internal(_) => {
                "Internal server error".to_owned()
            }
            Self::Validation(msg)
            | Self::Unauthenticated(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server faults to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = Json(serde_json::json!({ "message": self.message() }));
        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Validation("bad".to_owned()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthenticated("no token".to_owned()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("admin only".to_owned()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::NotFound("product".to_owned()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("email".to_owned()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Internal("boom".to_owned()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_error_mapping() {
        assert_eq!(
            AppError::Database(RepositoryError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Database(RepositoryError::Conflict("email".to_owned())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Database(RepositoryError::DataCorruption("bad".to_owned())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_mapping() {
        assert_eq!(
            AppError::Auth(AuthError::UserAlreadyExists).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Auth(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Auth(AuthError::UserNotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_token_errors_are_unauthorized() {
        assert_eq!(
            AppError::Token(TokenError::Invalid).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Token(TokenError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let err = AppError::Internal("connection pool exhausted".to_owned());
        assert_eq!(err.message(), "Internal server error");

        let err = AppError::Database(RepositoryError::DataCorruption("oops".to_owned()));
        assert_eq!(err.message(), "Internal server error");
    }

    #[test]
    fn test_client_messages_pass_through() {
        let err = AppError::Validation("All fields are required".to_owned());
        assert_eq!(err.message(), "All fields are required");

        let err = AppError::Forbidden("Admin access required".to_owned());
        assert_eq!(err.message(), "Admin access required");
    }
}
