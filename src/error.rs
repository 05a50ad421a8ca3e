/// Unified error types for the Schoolhub account service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Sign-in failure. A single variant with a fixed message covers both
    /// "no such account" and "wrong password", so the serialized bodies are
    /// byte-identical and the endpoint cannot be used to enumerate accounts.
    #[error("Email or password seems to be wrong, please try again with valid credentials.")]
    InvalidCredentials,

    /// Missing or invalid session token
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors (role or capability missing)
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate account (email already registered)
    #[error("Account with this email already exists.")]
    DuplicateAccount,

    /// Reset/invite token rejected by the store lookup or the signature check
    #[error("Token is invalid or has expired.")]
    InvalidOrExpiredToken,

    /// Signed account-id claim does not match the account holding the token
    #[error("Invalid token for this account.")]
    TokenMismatch,

    /// Invite token replayed after the password was already set
    #[error("Password has already been set for this account.")]
    AlreadySet,

    /// Operation not permitted in the account's current status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Captcha missing, rejected, or provider unreachable
    #[error("{0}")]
    Captcha(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Token signing errors (signer misconfigured)
    #[error("Token signing error: {0}")]
    Jwt(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert ApiError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "InvalidCredentials",
                self.to_string(),
            ),
            ApiError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationError",
                self.to_string(),
            ),
            ApiError::Authorization(_) => (
                StatusCode::FORBIDDEN,
                "AuthorizationError",
                self.to_string(),
            ),
            ApiError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "ValidationError",
                self.to_string(),
            ),
            ApiError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NotFound",
                self.to_string(),
            ),
            ApiError::DuplicateAccount => (
                StatusCode::CONFLICT,
                "DuplicateAccount",
                self.to_string(),
            ),
            ApiError::InvalidOrExpiredToken => (
                StatusCode::BAD_REQUEST,
                "InvalidOrExpiredToken",
                self.to_string(),
            ),
            ApiError::TokenMismatch => (
                StatusCode::BAD_REQUEST,
                "TokenMismatch",
                self.to_string(),
            ),
            ApiError::AlreadySet => (
                StatusCode::BAD_REQUEST,
                "AlreadySet",
                self.to_string(),
            ),
            ApiError::InvalidState(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidState",
                self.to_string(),
            ),
            ApiError::Captcha(_) => (
                StatusCode::FORBIDDEN,
                "CaptchaError",
                self.to_string(),
            ),
            ApiError::Database(_) | ApiError::Internal(_) | ApiError::Io(_) | ApiError::Jwt(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_credentials_message_is_fixed() {
        // Both sign-in failure paths produce this exact variant; the message
        // must not vary with the cause.
        let a = ApiError::InvalidCredentials.to_string();
        let b = ApiError::InvalidCredentials.to_string();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn server_errors_do_not_leak_detail() {
        let err = ApiError::Internal("secret connection string".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
