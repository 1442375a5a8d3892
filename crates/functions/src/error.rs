//! Error type for the function handlers.
//!
//! Every failure is answered with the JSON envelope
//! `{"success": false, "error": "..."}` and a matching status code. Server
//! errors are captured to Sentry; clients only ever see a generic message
//! for them.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use drone_backend::{BackendError, Envelope, ErrorKind, UploadError};
use drone_core::payment::PaymentFormError;
use thiserror::Error;

/// Errors returned by function handlers.
#[derive(Debug, Error)]
pub enum FunctionError {
    /// Missing or invalid request fields.
    #[error("{0}")]
    BadRequest(String),

    /// No bearer token, or the token was rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// The caller may not perform this action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested row or object does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The path exists but not for this method.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// A backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Anything else that went wrong on our side.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PaymentFormError> for FunctionError {
    fn from(err: PaymentFormError) -> Self {
        match err {
            PaymentFormError::MissingTransactionHash => {
                Self::BadRequest("Transaction hash is required".to_string())
            }
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<UploadError> for FunctionError {
    fn from(err: UploadError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl FunctionError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Backend(BackendError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Backend(err @ BackendError::Api { .. }) if err.kind() == ErrorKind::Validation => {
                StatusCode::BAD_REQUEST
            }
            Self::Backend(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Forbidden(_) => "Forbidden".to_string(),
            Self::Backend(BackendError::NotFound(_)) => "Not found".to_string(),
            Self::Backend(err @ BackendError::Api { .. }) if err.kind() == ErrorKind::Validation => {
                err.user_message()
            }
            Self::Backend(_) | Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for FunctionError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Function error"
            );
        } else if let Self::Forbidden(reason) = &self {
            tracing::warn!(%reason, "Forbidden function call");
        }

        (status, Json(Envelope::<()>::error(self.client_message()))).into_response()
    }
}

/// Result type alias for `FunctionError`.
pub type Result<T> = std::result::Result<T, FunctionError>;
