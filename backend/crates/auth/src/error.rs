//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use std::time::Duration;

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use serde_json::json;
use thiserror::Error;

use crate::domain::service::password_policy::PasswordRule;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed or missing input, attributed to a field
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// Password fails one or more strength rules (all violations listed)
    #[error("Password does not meet the strength requirements")]
    WeakPassword(Vec<PasswordRule>),

    #[error("Email is already registered")]
    EmailAlreadyRegistered,

    /// Wrong email or password. Never says which.
    #[error("Invalid email or password")]
    InvalidCredentials { attempts_left: Option<u32> },

    #[error("Account is temporarily locked")]
    AccountLocked { retry_after: Duration },

    #[error("Account is not active")]
    AccountNotActive,

    #[error("Password was used recently")]
    PasswordReused,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token is invalid")]
    TokenInvalid,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Insufficient privileges")]
    Forbidden,

    #[error("System roles cannot be modified or deleted")]
    SystemRoleProtected,

    #[error("{0}")]
    Conflict(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Shorthand for a field-attributed validation error
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AuthError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation { .. } | AuthError::WeakPassword(_) | AuthError::PasswordReused => {
                ErrorKind::BadRequest
            }
            AuthError::EmailAlreadyRegistered | AuthError::Conflict(_) => ErrorKind::Conflict,
            AuthError::InvalidCredentials { .. }
            | AuthError::TokenExpired
            | AuthError::TokenInvalid => ErrorKind::Unauthorized,
            AuthError::AccountLocked { .. } => ErrorKind::Locked,
            AuthError::AccountNotActive
            | AuthError::Forbidden
            | AuthError::SystemRoleProtected => ErrorKind::Forbidden,
            AuthError::NotFound(_) => ErrorKind::NotFound,
            AuthError::Database(_) | AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation { .. } => "VALIDATION_ERROR",
            AuthError::WeakPassword(_) => "WEAK_PASSWORD",
            AuthError::EmailAlreadyRegistered => "EMAIL_ALREADY_REGISTERED",
            AuthError::InvalidCredentials { .. } => "INVALID_CREDENTIALS",
            AuthError::AccountLocked { .. } => "ACCOUNT_LOCKED",
            AuthError::AccountNotActive => "ACCOUNT_NOT_ACTIVE",
            AuthError::PasswordReused => "PASSWORD_REUSED",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
            AuthError::TokenInvalid => "TOKEN_INVALID",
            AuthError::NotFound(_) => "NOT_FOUND",
            AuthError::Forbidden => "FORBIDDEN",
            AuthError::SystemRoleProtected => "SYSTEM_ROLE_PROTECTED",
            AuthError::Conflict(_) => "CONFLICT",
            AuthError::Database(_) | AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to AppError
    ///
    /// Infrastructure errors are rendered with a generic message; their
    /// detail only reaches the log.
    pub fn to_app_error(&self) -> AppError {
        if self.kind().is_server_error() {
            return AppError::new(self.kind(), "An unexpected error occurred")
                .with_details(json!({ "code": self.code() }));
        }

        let mut details = json!({ "code": self.code() });
        let mut err = AppError::new(self.kind(), self.to_string());

        match self {
            AuthError::Validation { field, message } => {
                err = AppError::bad_request(message.clone()).with_field(*field);
            }
            AuthError::WeakPassword(rules) => {
                details["reasons"] = rules.iter().map(|r| r.code()).collect();
                let messages: Vec<&str> = rules.iter().map(|r| r.message()).collect();
                details["messages"] = json!(messages);
                err = err.with_field("password");
            }
            AuthError::InvalidCredentials {
                attempts_left: Some(left),
            } => {
                details["attemptsLeft"] = json!(left);
            }
            AuthError::AccountLocked { retry_after } => {
                let minutes = retry_after.as_secs().div_ceil(60);
                details["retryAfterSeconds"] = json!(retry_after.as_secs());
                err = AppError::locked(format!(
                    "Account is temporarily locked. Try again in {} minute(s)",
                    minutes.max(1)
                ))
                .with_action("Wait for the lock to expire or contact an administrator");
            }
            AuthError::PasswordReused => {
                err = err
                    .with_field("newPassword")
                    .with_action("Choose a password you have not used recently");
            }
            AuthError::TokenExpired => {
                err = err.with_action("Sign in again or request a new link");
            }
            _ => {}
        }

        err.with_details(details)
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials { attempts_left } => {
                tracing::warn!(attempts_left = ?attempts_left, "Invalid login attempt");
            }
            AuthError::AccountLocked { retry_after } => {
                tracing::warn!(
                    retry_after_secs = retry_after.as_secs(),
                    "Login attempt on locked account"
                );
            }
            AuthError::Forbidden | AuthError::SystemRoleProtected => {
                tracing::warn!(error = %self, "Rejected privileged operation");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        let retry_after = match &self {
            AuthError::AccountLocked { retry_after } => Some(retry_after.as_secs().max(1)),
            _ => None,
        };

        let mut response = self.to_app_error().into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<platform::password::PasswordHashError> for AuthError {
    fn from(err: platform::password::PasswordHashError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<platform::crypto::CryptoError> for AuthError {
    fn from(err: platform::crypto::CryptoError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
