//! Identity Error Types
//!
//! The closed set of failures an identity flow can end in. Each variant maps
//! to exactly one HTTP status and one stable machine code, and is rendered
//! through the unified `kernel::error::AppError` problem format.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Identity-specific result type alias
pub type IdentityResult<T> = Result<T, IdentityError>;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Username already exists")]
    DuplicateUsername,

    /// Same message whether the email is unknown or the password is wrong
    #[error("Invalid email or password")]
    InvalidCredential,

    /// The account was created through federation and has no password yet
    #[error("This account uses Google sign-in")]
    FederatedAccount,

    #[error("Please verify your email before logging in")]
    AccountNotVerified,

    #[error("Account is banned")]
    AccountBanned,

    /// Verification / reset link is unknown, already used, or expired
    #[error("Token is invalid or has expired")]
    TokenInvalidOrExpired,

    /// The external identity assertion could not be accepted
    #[error("Google authentication failed: {0}")]
    FederationRejected(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(&'static str),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("User not found")]
    UserNotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Identity provider or other remote dependency failed
    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::Validation(_)
            | IdentityError::DuplicateEmail
            | IdentityError::DuplicateUsername
            | IdentityError::InvalidCredential
            | IdentityError::FederatedAccount
            | IdentityError::TokenInvalidOrExpired
            | IdentityError::FederationRejected(_) => ErrorKind::BadRequest,
            IdentityError::Unauthorized(_) => ErrorKind::Unauthorized,
            IdentityError::AccountNotVerified
            | IdentityError::AccountBanned
            | IdentityError::Forbidden(_) => ErrorKind::Forbidden,
            IdentityError::UserNotFound => ErrorKind::NotFound,
            IdentityError::Database(_) | IdentityError::Upstream(_) | IdentityError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Stable machine-readable code, sent as `code` in the problem body
    pub fn code(&self) -> &'static str {
        match self {
            IdentityError::Validation(_) => "VALIDATION_ERROR",
            IdentityError::DuplicateEmail => "DUPLICATE_EMAIL",
            IdentityError::DuplicateUsername => "DUPLICATE_USERNAME",
            IdentityError::InvalidCredential => "INVALID_CREDENTIAL",
            IdentityError::FederatedAccount => "USE_FEDERATED_LOGIN",
            IdentityError::AccountNotVerified => "ACCOUNT_NOT_VERIFIED",
            IdentityError::AccountBanned => "ACCOUNT_BANNED",
            IdentityError::TokenInvalidOrExpired => "TOKEN_INVALID_OR_EXPIRED",
            IdentityError::FederationRejected(_) => "FEDERATION_REJECTED",
            IdentityError::Unauthorized(_) => "UNAUTHORIZED",
            IdentityError::Forbidden(_) => "FORBIDDEN",
            IdentityError::UserNotFound => "USER_NOT_FOUND",
            IdentityError::Database(_) | IdentityError::Upstream(_) | IdentityError::Internal(_) => {
                "UPSTREAM_FAILURE"
            }
        }
    }

    /// Convert to AppError
    ///
    /// Server-side failures keep their detail in the logs only.
    pub fn to_app_error(self) -> AppError {
        let code = self.code();
        let app_error = match self {
            IdentityError::Database(e) => AppError::internal("Upstream service failure").with_source(e),
            IdentityError::Upstream(_) | IdentityError::Internal(_) => {
                AppError::internal("Upstream service failure")
            }
            IdentityError::FederatedAccount => AppError::new(self.kind(), self.to_string())
                .with_action("Log in with Google, then set a password from your account page"),
            IdentityError::AccountNotVerified => AppError::new(self.kind(), self.to_string())
                .with_action("Check your inbox or request a new verification email"),
            other => AppError::new(other.kind(), other.to_string()),
        };
        app_error.with_code(code)
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            IdentityError::Database(e) => {
                tracing::error!(error = %e, "Identity database error");
            }
            IdentityError::Upstream(msg) => {
                tracing::error!(message = %msg, "Identity upstream failure");
            }
            IdentityError::Internal(msg) => {
                tracing::error!(message = %msg, "Identity internal error");
            }
            IdentityError::InvalidCredential => {
                tracing::warn!("Invalid login attempt");
            }
            IdentityError::AccountBanned => {
                tracing::warn!("Access attempt on banned account");
            }
            IdentityError::FederationRejected(reason) => {
                tracing::warn!(reason = %reason, "Federated identity rejected");
            }
            e if e.kind().is_access_denial() => {
                tracing::warn!(error = %e, "Access denied");
            }
            _ => {
                tracing::debug!(error = %self, "Identity error");
            }
        }
    }
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

/// Malformed or missing JSON bodies are validation errors like any other.
impl From<JsonRejection> for IdentityError {
    fn from(rejection: JsonRejection) -> Self {
        IdentityError::Validation(rejection.body_text())
    }
}
