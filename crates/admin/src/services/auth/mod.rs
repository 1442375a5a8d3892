//! Admin authentication service.
//!
//! Two steps against fixed, configured values: an email/password pair, then
//! a six-digit code. There is no user table behind the back-office.

mod error;

pub use error::AdminAuthError;

use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;

use crate::config::LoginCredentials;
use crate::models::{CurrentAdmin, MAX_CODE_ATTEMPTS, PendingLogin};

/// Checks both login steps against the configured credentials.
#[derive(Debug, Clone)]
pub struct AdminAuthenticator {
    credentials: LoginCredentials,
    session_ttl: Duration,
}

impl AdminAuthenticator {
    #[must_use]
    pub const fn new(credentials: LoginCredentials, session_ttl: Duration) -> Self {
        Self {
            credentials,
            session_ttl,
        }
    }

    /// Step one: email (case-insensitive) and password (exact).
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidCredentials` if either does not match.
    pub fn verify_password(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<PendingLogin, AdminAuthError> {
        let email_matches = self.credentials.email.matches(email);
        let password_matches = password == self.credentials.password.expose_secret();

        if email_matches && password_matches {
            Ok(PendingLogin::new(self.credentials.email.clone(), now))
        } else {
            Err(AdminAuthError::InvalidCredentials)
        }
    }

    /// Step two: the six-digit code, for a step-one login that is still fresh.
    ///
    /// # Errors
    ///
    /// Returns `NoPendingLogin` without a step-one login,
    /// `PendingLoginExpired` if it is older than five minutes, and
    /// `InvalidCode` if the code does not match. A wrong code is counted on
    /// `pending`; the last allowed one returns `TooManyAttempts` instead.
    pub fn verify_code(
        &self,
        pending: Option<&mut PendingLogin>,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<CurrentAdmin, AdminAuthError> {
        let pending = pending.ok_or(AdminAuthError::NoPendingLogin)?;
        if !pending.is_fresh(now) {
            return Err(AdminAuthError::PendingLoginExpired);
        }
        if pending.failed_attempts >= MAX_CODE_ATTEMPTS {
            return Err(AdminAuthError::TooManyAttempts);
        }
        if code.trim() != self.credentials.code.expose_secret() {
            return Err(if pending.record_failure() {
                AdminAuthError::TooManyAttempts
            } else {
                AdminAuthError::InvalidCode
            });
        }

        Ok(CurrentAdmin::new(pending.email.clone(), now, self.session_ttl))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use drone_core::Email;
    use secrecy::SecretString;

    use super::*;

    fn authenticator() -> AdminAuthenticator {
        AdminAuthenticator::new(
            LoginCredentials {
                email: Email::parse("ops@dronecapital.io").unwrap(),
                password: SecretString::from("k7#Qv9!mZ2pL"),
                code: SecretString::from("042917"),
            },
            Duration::minutes(60),
        )
    }

    #[test]
    fn test_step_one_requires_matching_pair() {
        let auth = authenticator();
        let now = Utc::now();

        assert!(auth.verify_password("ops@dronecapital.io", "k7#Qv9!mZ2pL", now).is_ok());
        assert!(auth.verify_password(" OPS@DroneCapital.io ", "k7#Qv9!mZ2pL", now).is_ok());
        assert_eq!(
            auth.verify_password("ops@dronecapital.io", "k7#qv9!mz2pl", now).unwrap_err(),
            AdminAuthError::InvalidCredentials
        );
        assert_eq!(
            auth.verify_password("other@dronecapital.io", "k7#Qv9!mZ2pL", now).unwrap_err(),
            AdminAuthError::InvalidCredentials
        );
        assert_eq!(
            auth.verify_password("", "", now).unwrap_err(),
            AdminAuthError::InvalidCredentials
        );
    }

    #[test]
    fn test_step_two_requires_pending_login_and_code() {
        let auth = authenticator();
        let now = Utc::now();
        let mut pending = auth.verify_password("ops@dronecapital.io", "k7#Qv9!mZ2pL", now).unwrap();

        assert_eq!(
            auth.verify_code(None, "042917", now).unwrap_err(),
            AdminAuthError::NoPendingLogin
        );
        assert_eq!(
            auth.verify_code(Some(&mut pending), "123456", now).unwrap_err(),
            AdminAuthError::InvalidCode
        );
        assert_eq!(pending.failed_attempts, 1);

        let admin = auth.verify_code(Some(&mut pending), " 042917 ", now).unwrap();
        assert_eq!(admin.email.as_str(), "ops@dronecapital.io");
        assert_eq!(admin.expires_at, now + Duration::minutes(60));
    }

    #[test]
    fn test_step_two_rejects_stale_login() {
        let auth = authenticator();
        let started = Utc::now();
        let mut pending = auth
            .verify_password("ops@dronecapital.io", "k7#Qv9!mZ2pL", started)
            .unwrap();

        let later = started + Duration::minutes(6);
        assert_eq!(
            auth.verify_code(Some(&mut pending), "042917", later).unwrap_err(),
            AdminAuthError::PendingLoginExpired
        );
    }

    #[test]
    fn test_step_two_locks_after_repeated_wrong_codes() {
        let auth = authenticator();
        let now = Utc::now();
        let mut pending = auth.verify_password("ops@dronecapital.io", "k7#Qv9!mZ2pL", now).unwrap();

        for _ in 1..MAX_CODE_ATTEMPTS {
            assert_eq!(
                auth.verify_code(Some(&mut pending), "000000", now).unwrap_err(),
                AdminAuthError::InvalidCode
            );
        }
        assert_eq!(
            auth.verify_code(Some(&mut pending), "000000", now).unwrap_err(),
            AdminAuthError::TooManyAttempts
        );

        // The right code no longer helps this login.
        assert_eq!(
            auth.verify_code(Some(&mut pending), "042917", now).unwrap_err(),
            AdminAuthError::TooManyAttempts
        );
    }
}
