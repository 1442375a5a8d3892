//! Session-related types for admin authentication.
//!
//! Types stored in the session for authentication state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use drone_core::Email;

/// How long step one of the login stays valid while waiting for the code.
pub const PENDING_LOGIN_TTL_MINUTES: i64 = 5;

/// Wrong codes allowed before the login has to start over from step one.
pub const MAX_CODE_ATTEMPTS: u8 = 5;

/// Session-stored admin identity.
///
/// Written once step two succeeds. `expires_at` is checked on every
/// request; an expired session is cleared and the admin signs in again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// The configured admin email, as entered at login.
    pub email: Email,
    pub signed_in_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CurrentAdmin {
    #[must_use]
    pub fn new(email: Email, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            email,
            signed_in_at: now,
            expires_at: now + ttl,
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A login that passed step one and is waiting for the six-digit code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingLogin {
    pub email: Email,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub failed_attempts: u8,
}

impl PendingLogin {
    #[must_use]
    pub const fn new(email: Email, now: DateTime<Utc>) -> Self {
        Self {
            email,
            started_at: now,
            failed_attempts: 0,
        }
    }

    /// Count a wrong code. Returns `true` once no attempts remain.
    pub const fn record_failure(&mut self) -> bool {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        self.failed_attempts >= MAX_CODE_ATTEMPTS
    }

    /// Whether the code may still be entered for this login.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.started_at <= Duration::minutes(PENDING_LOGIN_TTL_MINUTES)
    }
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Key for a login waiting on its second step.
    pub const PENDING_LOGIN: &str = "pending_login";
}
