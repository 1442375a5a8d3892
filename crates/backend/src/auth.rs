//! Email/password authentication against the backend's auth API.

use chrono::{DateTime, Duration, Utc};
use drone_core::UserId;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::client::{BackendClient, Credential, check_status, read_json};
use crate::error::BackendError;

/// The user record returned by the auth API.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    /// Full name captured at sign-up, if any.
    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        self.user_metadata
            .get("full_name")
            .and_then(serde_json::Value::as_str)
            .filter(|name| !name.trim().is_empty())
    }
}

/// A signed-in session.
///
/// Implements `Debug` manually to redact tokens.
#[derive(Clone)]
pub struct AuthSession {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

impl AuthSession {
    /// Whether the access token expires within `margin`.
    #[must_use]
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires_at - margin <= Utc::now()
    }
}

/// Result of a sign-up.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The account is usable immediately.
    SignedIn(AuthSession),
    /// The account exists but the email address must be confirmed first.
    ConfirmationRequired(AuthUser),
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl From<TokenResponse> for AuthSession {
    fn from(response: TokenResponse) -> Self {
        let expires_at = response
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(|| Utc::now() + Duration::seconds(response.expires_in));
        Self {
            access_token: SecretString::from(response.access_token),
            refresh_token: SecretString::from(response.refresh_token),
            expires_at,
            user: response.user,
        }
    }
}

impl BackendClient {
    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] for bad credentials, otherwise
    /// any request or decode failure.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        let mut url = self.endpoint(&["auth", "v1", "token"])?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .request(Method::POST, url, Credential::Anon)?
            .json(&json!({ "email": email, "password": password.expose_secret() }))
            .send()
            .await?;

        let token: TokenResponse = read_json(response).await.map_err(bad_grant_is_unauthorized)?;
        Ok(token.into())
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the sign-up (e.g. email taken,
    /// weak password) or the response cannot be decoded.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        full_name: Option<&str>,
    ) -> Result<SignUpOutcome, BackendError> {
        let url = self.endpoint(&["auth", "v1", "signup"])?;
        let response = self
            .request(Method::POST, url, Credential::Anon)?
            .json(&json!({
                "email": email,
                "password": password.expose_secret(),
                "data": { "full_name": full_name.unwrap_or_default() },
            }))
            .send()
            .await?;

        let body: serde_json::Value = read_json(response).await?;
        if body.get("access_token").is_some() {
            let token: TokenResponse =
                serde_json::from_value(body).map_err(|e| BackendError::Parse(e.to_string()))?;
            return Ok(SignUpOutcome::SignedIn(token.into()));
        }

        let user = body.get("user").cloned().unwrap_or(body);
        let user: AuthUser =
            serde_json::from_value(user).map_err(|e| BackendError::Parse(e.to_string()))?;
        Ok(SignUpOutcome::ConfirmationRequired(user))
    }

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] if the refresh token is no
    /// longer valid.
    #[instrument(skip_all)]
    pub async fn refresh_session(
        &self,
        refresh_token: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        let mut url = self.endpoint(&["auth", "v1", "token"])?;
        url.query_pairs_mut().append_pair("grant_type", "refresh_token");

        let response = self
            .request(Method::POST, url, Credential::Anon)?
            .json(&json!({ "refresh_token": refresh_token.expose_secret() }))
            .send()
            .await?;

        let token: TokenResponse = read_json(response).await.map_err(bad_grant_is_unauthorized)?;
        Ok(token.into())
    }

    /// Revoke the session behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails. An already-expired token is not
    /// an error.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &SecretString) -> Result<(), BackendError> {
        let url = self.endpoint(&["auth", "v1", "logout"])?;
        let response = self
            .request(Method::POST, url, Credential::User(access_token))?
            .send()
            .await?;
        match check_status(response).await {
            Ok(_) | Err(BackendError::Unauthorized(_) | BackendError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Resolve the user an access token belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] if the token is invalid or expired.
    #[instrument(skip_all)]
    pub async fn get_user(&self, access_token: &SecretString) -> Result<AuthUser, BackendError> {
        let url = self.endpoint(&["auth", "v1", "user"])?;
        let response = self
            .request(Method::GET, url, Credential::User(access_token))?
            .send()
            .await?;
        read_json(response).await.map_err(|e| match e {
            BackendError::Api { status: 403, message } => BackendError::Unauthorized(message),
            other => other,
        })
    }
}

/// The auth API answers bad credentials with 400 `invalid_grant`.
fn bad_grant_is_unauthorized(error: BackendError) -> BackendError {
    match error {
        BackendError::Api { status: 400, message } => BackendError::Unauthorized(message),
        other => other,
    }
}
