//! Canonical error model exposed to the transport layer.

use thiserror::Error;

/// Result type used across the service layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Service-level error.
///
/// Each variant is one of the canonical kinds the HTTP layer maps to a status
/// code. `Display` is user-safe; `Internal` keeps the lower-layer cause for logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Username or password is incorrect")]
    InvalidCredentials,

    #[error("Your account has been blocked and may not login")]
    UserBlocked,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// The caller's role is not granted the action on the resource.
    #[error("You are not allowed to perform this action")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    /// A value failed validation; `field` names the offending input.
    #[error("{message}")]
    Validation { field: String, message: String },

    /// A uniqueness rule was violated.
    #[error("{0}")]
    Conflict(String),

    #[error("Incorrect old password")]
    IncorrectPassword,

    /// The request was cancelled or ran past its deadline.
    #[error("request cancelled")]
    Cancelled,

    #[error("{context}")]
    Internal { context: String, cause: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(context: impl Into<String>, cause: impl core::fmt::Display) -> Self {
        Self::Internal {
            context: context.into(),
            cause: cause.to_string(),
        }
    }

    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::UserBlocked => "USER_BLOCKED",
            Self::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::IncorrectPassword => "INCORRECT_PASSWORD",
            Self::Cancelled => "CANCELLED",
            Self::Internal { .. } => "INTERNAL",
        }
    }
}
