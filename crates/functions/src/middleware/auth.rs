//! Bearer-token caller resolution.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use drone_backend::{AuthUser, BackendError, Credential, TableQuery};
use drone_core::models::{Profile, tables};
use drone_core::{AccountStatus, UserId};
use secrecy::SecretString;

use crate::error::FunctionError;
use crate::state::AppState;

/// The authenticated user behind the request's bearer token.
///
/// Rejects with 401 when the header is missing or the backend does not
/// recognise the token.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: AuthUser,
    pub token: SecretString,
}

impl Caller {
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.user.id
    }

    /// Email for audit rows.
    #[must_use]
    pub fn email(&self) -> &str {
        self.user.email.as_deref().unwrap_or("unknown")
    }

    /// Load the caller's profile with the service key.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if the caller has no profile, or the backend error.
    pub async fn profile(&self, state: &AppState) -> Result<Profile, FunctionError> {
        state
            .backend()
            .select_optional::<Profile>(
                tables::PROFILES,
                &TableQuery::new().eq("id", self.id()),
                Credential::Service,
            )
            .await?
            .ok_or_else(|| FunctionError::Forbidden(format!("no profile for {}", self.id())))
    }

    /// Whether the caller is an active admin.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the profile lookup fails.
    pub async fn is_admin(&self, state: &AppState) -> Result<bool, FunctionError> {
        match self.profile(state).await {
            Ok(profile) => Ok(profile.is_admin() && profile.status == AccountStatus::Active),
            Err(FunctionError::Forbidden(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Fail with 403 unless the caller is an active admin.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-admins, or the backend error.
    pub async fn require_admin(&self, state: &AppState) -> Result<(), FunctionError> {
        if self.is_admin(state).await? {
            Ok(())
        } else {
            Err(FunctionError::Forbidden(format!(
                "{} is not an admin",
                self.id()
            )))
        }
    }

    /// Fail with 403 unless the caller is `owner` or an admin.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` when neither holds, or the backend error.
    pub async fn require_self_or_admin(
        &self,
        state: &AppState,
        owner: UserId,
    ) -> Result<(), FunctionError> {
        if owner == self.id() {
            return Ok(());
        }
        self.require_admin(state).await
    }
}

fn bearer_token(parts: &Parts) -> Option<SecretString> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty())
        .then(|| SecretString::from(token.to_string()))
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = FunctionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(FunctionError::Unauthorized)?;

        let user = state.backend().get_user(&token).await.map_err(|e| match e {
            BackendError::Unauthorized(_) | BackendError::NotFound(_) => {
                FunctionError::Unauthorized
            }
            other => FunctionError::Backend(other),
        })?;

        sentry::configure_scope(|scope| {
            scope.set_user(Some(sentry::User {
                id: Some(user.id.to_string()),
                email: user.email.clone(),
                ..Default::default()
            }));
        });

        Ok(Self { user, token })
    }
}
