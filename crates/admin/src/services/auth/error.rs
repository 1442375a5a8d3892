//! Admin authentication error types.

use thiserror::Error;

/// Why a login step was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdminAuthError {
    /// Email or password did not match the configured pair.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Step two was attempted without a step-one login in the session.
    #[error("no login in progress")]
    NoPendingLogin,

    /// Step one happened too long ago.
    #[error("login attempt expired")]
    PendingLoginExpired,

    /// The six-digit code did not match.
    #[error("invalid verification code")]
    InvalidCode,

    /// Too many wrong codes for this login.
    #[error("too many verification attempts")]
    TooManyAttempts,
}

impl AdminAuthError {
    /// Query-string key for the login pages' message lookup.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "credentials",
            Self::NoPendingLogin | Self::PendingLoginExpired => "expired",
            Self::InvalidCode => "code",
            Self::TooManyAttempts => "attempts",
        }
    }
}
