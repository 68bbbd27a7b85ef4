//! Consistent JSON error responses.
//!
//! Body shape: `{"error": CODE, "message": text}` plus `"field"` for
//! validation failures.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use adminhub_core::DomainError;

/// Service error carried to the HTTP boundary.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(DomainError::validation("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(DomainError::validation("query", rejection.body_text()))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub fn status_of(err: &DomainError) -> StatusCode {
    match err {
        DomainError::InvalidCredentials
        | DomainError::UserBlocked
        | DomainError::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
        DomainError::Forbidden => StatusCode::FORBIDDEN,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Validation { .. } | DomainError::IncorrectPassword => StatusCode::BAD_REQUEST,
        DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = status_of(&err);
        match &err {
            DomainError::Validation { field, message } => (
                status,
                axum::Json(json!({
                    "error": err.code(),
                    "message": message,
                    "field": field,
                })),
            )
                .into_response(),
            DomainError::Internal { context, cause } => {
                tracing::error!(%cause, "{context}");
                json_error(status, err.code(), context.clone())
            }
            _ => json_error(status, err.code(), err.to_string()),
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
