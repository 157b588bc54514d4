//! Application error types.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use backoffice_core::auth::{AuthError, TokenError};
use backoffice_core::models::FieldErrors;
use backoffice_core::store::StoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
///
/// Every authentication failure renders the same body regardless of cause.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Forbidden field: {0}")]
    ForbiddenField(String),

    #[error("CSRF token missing or invalid")]
    CsrfInvalid,

    #[error("Not found")]
    NotFound,

    #[error("Validation error")]
    Validation(FieldErrors),

    #[error("Too many requests")]
    RateLimited,

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Validation failure on a single field.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut details = FieldErrors::new();
        details.insert(field.to_string(), vec![message.into()]);
        AppError::Validation(details)
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::ForbiddenField(_) => (StatusCode::FORBIDDEN, "FORBIDDEN_FIELD"),
            AppError::CsrfInvalid => (StatusCode::FORBIDDEN, "CSRF_INVALID"),
            AppError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            AppError::Internal(detail) => {
                error!(%detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR")
            }
        };
        let body = ErrorBody {
            error: code,
            field: match &self {
                AppError::ForbiddenField(f) => Some(f.as_str()),
                _ => None,
            },
            details: match &self {
                AppError::Validation(d) => Some(d),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::invalid("body", e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::invalid("query", e.body_text())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::InvalidSignature | TokenError::Expired => AppError::Unauthenticated,
            TokenError::Encode(msg) | TokenError::Config(msg) => AppError::Internal(msg),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::CredentialError => AppError::InvalidCredentials,
            AuthError::Unauthenticated => AppError::Unauthenticated,
            AuthError::UserNotFound => AppError::NotFound,
            AuthError::TokenError(e) => AppError::from(e),
            AuthError::StoreError(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
