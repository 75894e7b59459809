//! Unified error handling for bazaard.
//!
//! Every HTTP handler returns [`ApiError`] on failure. Lower layers keep
//! their own enums ([`crate::db::DbError`], [`crate::moderation::ModerationError`],
//! [`crate::mail::MailError`]) and are mapped here, at the edge, to a status
//! code, a stable machine-readable code and a message that never carries
//! internal detail.

use crate::db::DbError;
use crate::moderation::ModerationError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Errors returned to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Capability token failed validation, whatever the cause.
    #[error("invalid or expired link")]
    InvalidLink,

    /// Valid link for a listing that has since been removed.
    #[error("this listing no longer exists")]
    AlreadyHandled,

    /// Legacy deletion request that did not prove ownership.
    #[error("ownership could not be verified")]
    OwnershipNotVerified,

    /// Legacy deletion request while that path is disabled.
    #[error("a deletion link is required")]
    TokenRequired,

    /// Missing or invalid admin session.
    #[error("authentication required")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    /// Client input rejected by validation. The message is shown verbatim.
    #[error("{0}")]
    BadRequest(String),

    /// Request body that is not the JSON the endpoint takes.
    #[error("{detail}")]
    InvalidBody { status: StatusCode, detail: String },

    /// Anything else. Logged, never shown.
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: &'a str,
}

impl ApiError {
    /// Get a static error code string for metrics labeling and response bodies.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidLink => "invalid_link",
            Self::AlreadyHandled => "already_handled",
            Self::OwnershipNotVerified => "ownership_not_verified",
            Self::TokenRequired => "token_required",
            Self::Unauthorized => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::BadRequest(_) => "bad_request",
            Self::InvalidBody { .. } => "invalid_body",
            Self::Internal(_) => "internal_error",
        }
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidLink | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::AlreadyHandled => StatusCode::GONE,
            Self::OwnershipNotVerified => StatusCode::FORBIDDEN,
            Self::TokenRequired | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InvalidBody { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        crate::metrics::record_api_error(code);

        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: code,
            message: &message,
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<ModerationError> for ApiError {
    fn from(err: ModerationError) -> Self {
        match err {
            ModerationError::InvalidLink(_) => ApiError::InvalidLink,
            ModerationError::AlreadyHandled => ApiError::AlreadyHandled,
            ModerationError::OwnershipNotVerified => ApiError::OwnershipNotVerified,
            ModerationError::LegacyDisabled => ApiError::TokenRequired,
            ModerationError::ProductNotFound(_) => ApiError::NotFound("listing"),
            ModerationError::RequestNotFound(_) => ApiError::NotFound("deletion request"),
            ModerationError::Conflict(msg) => ApiError::Conflict(msg),
            ModerationError::InvalidSubmission(e) => ApiError::BadRequest(e.to_string()),
            ModerationError::Db(e) => e.into(),
        }
    }
}

/// Result type for HTTP handlers.
pub type ApiResult<T> = Result<T, ApiError>;
