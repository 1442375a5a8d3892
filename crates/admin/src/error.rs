//! Errors that end an admin request.
//!
//! List pages degrade to an inline banner when the backend fails; handlers
//! only return `AppError` when there is nothing useful left to render.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use drone_backend::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A record or stored object the request named does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Backend(BackendError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the operator. Backend and session details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Backend(BackendError::NotFound(_)) => "Not found".to_string(),
            Self::Backend(_) => "The backend did not respond as expected".to_string(),
            Self::Session(_) => "Internal server error".to_string(),
            Self::NotFound(_) => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Admin request failed");
        }
        (status, self.public_message()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Tag Sentry events with the signed-in operator.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| scope.set_user(None));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_by_variant() {
        let cases = [
            (AppError::NotFound("contract".to_string()), StatusCode::NOT_FOUND),
            (
                AppError::Backend(BackendError::NotFound("object".to_string())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Backend(BackendError::Api {
                    status: 500,
                    message: "boom".to_string(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_backend_details_are_hidden() {
        let err = AppError::Backend(BackendError::Api {
            status: 500,
            message: "relation \"profiles\" does not exist".to_string(),
        });
        assert!(!err.public_message().contains("profiles"));
        assert_eq!(
            AppError::NotFound("contract".to_string()).public_message(),
            "Not found: contract"
        );
    }
}
