//! Backend client errors.

use thiserror::Error;

/// Errors returned by [`crate::BackendClient`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an error status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The presented credentials were rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The row, object, or function does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The response body did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A service-role request was made without a configured service key.
    #[error("Service key is not configured")]
    MissingServiceKey,

    /// An update or delete was issued without any filter.
    #[error("Refusing to {0} without a filter")]
    UnfilteredWrite(&'static str),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Coarse classification used to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connectivity or timeout; worth retrying.
    Network,
    /// The request was understood and rejected.
    Validation,
    /// Anything else.
    Unknown,
}

impl BackendError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                ErrorKind::Network
            }
            Self::Api { status, .. } if (400..500).contains(status) => ErrorKind::Validation,
            Self::Unauthorized(_) | Self::NotFound(_) | Self::UnfilteredWrite(_) => {
                ErrorKind::Validation
            }
            _ => ErrorKind::Unknown,
        }
    }

    /// HTTP status reported by the backend, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized(_) => Some(401),
            Self::NotFound(_) => Some(404),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Message safe to show to an end user.
    ///
    /// Validation messages come from the backend and are passed through;
    /// everything else is replaced with a generic sentence.
    #[must_use]
    pub fn user_message(&self) -> String {
        match (self.kind(), self) {
            (ErrorKind::Validation, Self::Api { message, .. } | Self::Unauthorized(message)) => {
                message.clone()
            }
            (ErrorKind::Validation, Self::NotFound(_)) => "Not found.".to_string(),
            (ErrorKind::Network, _) => {
                "We couldn't reach the server. Please try again in a moment.".to_string()
            }
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}
