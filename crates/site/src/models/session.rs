//! Session-related types.

use chrono::{DateTime, Duration, Utc};
use drone_backend::AuthSession;
use drone_core::UserId;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Tokens are refreshed when they expire within this window.
pub const REFRESH_MARGIN_SECONDS: i64 = 60;

/// The signed-in investor.
///
/// Tokens are kept server-side in the session store; only the session id
/// travels in the cookie.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentInvestor {
    pub user_id: UserId,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(with = "secret")]
    pub access_token: SecretString,
    #[serde(with = "secret")]
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for CurrentInvestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentInvestor")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CurrentInvestor {
    /// Build from a fresh backend session.
    #[must_use]
    pub fn from_session(session: AuthSession) -> Self {
        let full_name = session.user.full_name().map(str::to_string);
        Self {
            user_id: session.user.id,
            email: session.user.email.unwrap_or_default(),
            full_name,
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_at: session.expires_at,
        }
    }

    /// Whether the access token should be refreshed before use.
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.expires_at - Utc::now() <= Duration::seconds(REFRESH_MARGIN_SECONDS)
    }

    /// Name for the portal header.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the signed-in investor.
    pub const CURRENT_INVESTOR: &str = "current_investor";
    /// Key for the deposit quote shown between the invest and verify steps.
    pub const PENDING_CRYPTO: &str = "pending_crypto";
}

mod secret {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn investor(expires_in: Duration) -> CurrentInvestor {
        CurrentInvestor {
            user_id: UserId::generate(),
            email: "ada@example.com".to_string(),
            full_name: None,
            access_token: SecretString::from("acc-9f2e"),
            refresh_token: SecretString::from("ref-41b7"),
            expires_at: Utc::now() + expires_in,
        }
    }

    #[test]
    fn test_needs_refresh_near_expiry() {
        assert!(investor(Duration::seconds(30)).needs_refresh());
        assert!(investor(Duration::seconds(-5)).needs_refresh());
        assert!(!investor(Duration::minutes(30)).needs_refresh());
    }

    #[test]
    fn test_session_roundtrip_keeps_tokens() {
        let original = investor(Duration::minutes(10));
        let json = serde_json::to_string(&original).unwrap();
        let restored: CurrentInvestor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.access_token.expose_secret(), "acc-9f2e");
        assert_eq!(restored.refresh_token.expose_secret(), "ref-41b7");
        assert_eq!(restored.display_name(), "ada@example.com");
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug = format!("{:?}", investor(Duration::minutes(10)));
        assert!(!debug.contains("acc-9f2e"));
        assert!(!debug.contains("ref-41b7"));
        assert!(debug.contains("[REDACTED]"));
    }
}
