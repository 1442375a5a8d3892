//! Investor authentication extractors.
//!
//! The signed-in investor lives in the session. [`RequireInvestor`] refreshes
//! the access token once when it is about to expire; if the refresh fails the
//! session is cleared and the investor is sent back to the login page.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentInvestor, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in investor.
///
/// ```rust,ignore
/// async fn dashboard(RequireInvestor(investor): RequireInvestor) -> impl IntoResponse {
///     format!("Welcome back, {}", investor.display_name())
/// }
/// ```
pub struct RequireInvestor(pub CurrentInvestor);

/// Why an investor-only request was turned away.
#[derive(Debug)]
pub enum AuthRejection {
    /// Nobody is signed in.
    RedirectToLogin,
    /// The token could not be refreshed and the session was cleared.
    SessionExpired,
    /// The session layer is not installed.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::SessionExpired => Redirect::to("/auth/login?error=expired").into_response(),
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireInvestor {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::MissingSession)?;

        let investor: CurrentInvestor = session
            .get(session_keys::CURRENT_INVESTOR)
            .await
            .ok()
            .flatten()
            .ok_or(AuthRejection::RedirectToLogin)?;

        if !investor.needs_refresh() {
            return Ok(Self(investor));
        }

        match state.backend().refresh_session(&investor.refresh_token).await {
            Ok(fresh) => {
                let mut refreshed = CurrentInvestor::from_session(fresh);
                if refreshed.full_name.is_none() {
                    refreshed.full_name = investor.full_name;
                }
                if let Err(e) = set_current_investor(&session, &refreshed).await {
                    tracing::error!(error = %e, "Failed to store refreshed session");
                }
                tracing::debug!(user_id = %refreshed.user_id, "Access token refreshed");
                Ok(Self(refreshed))
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %investor.user_id,
                    error = %e,
                    "Token refresh failed, signing out"
                );
                if let Err(e) = clear_current_investor(&session).await {
                    tracing::error!(error = %e, "Failed to clear session");
                }
                Err(AuthRejection::SessionExpired)
            }
        }
    }
}

/// Extractor that reads the investor if one is signed in.
///
/// Never refreshes; public pages only use it to pick the header links.
pub struct OptionalInvestor(pub Option<CurrentInvestor>);

impl<S> FromRequestParts<S> for OptionalInvestor
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let investor = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentInvestor>(session_keys::CURRENT_INVESTOR)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(investor))
    }
}

/// Store the signed-in investor.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_investor(
    session: &Session,
    investor: &CurrentInvestor,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::CURRENT_INVESTOR, investor)
        .await
}

/// Forget the signed-in investor and any pending payment.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_investor(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentInvestor>(session_keys::CURRENT_INVESTOR)
        .await?;
    session
        .remove::<serde_json::Value>(session_keys::PENDING_CRYPTO)
        .await?;
    Ok(())
}
