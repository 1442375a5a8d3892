//! Authentication extractor for admin.
//!
//! Every page except the login steps and health checks takes
//! [`RequireAdminAuth`].

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;

use crate::models::{CurrentAdmin, PendingLogin, session_keys};

/// Extractor that requires a signed-in, unexpired admin.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAdminAuth(admin): RequireAdminAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", admin.email)
/// }
/// ```
pub struct RequireAdminAuth(pub CurrentAdmin);

/// Error returned when admin authentication is required.
pub enum AdminAuthRejection {
    /// Not signed in.
    RedirectToLogin,
    /// Signed in, but the session is past `expires_at`.
    SessionExpired,
    /// The session layer is missing from the stack.
    MissingSession,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::SessionExpired => Redirect::to("/auth/login?error=expired").into_response(),
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAdminAuth
where
    S: Send + Sync,
{
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AdminAuthRejection::MissingSession)?;

        let admin: CurrentAdmin = session
            .get(session_keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten()
            .ok_or(AdminAuthRejection::RedirectToLogin)?;

        if admin.is_expired(Utc::now()) {
            tracing::info!(email = %admin.email, "Admin session expired");
            if let Err(e) = clear_current_admin(&session).await {
                tracing::warn!(error = %e, "Failed to clear expired admin session");
            }
            return Err(AdminAuthRejection::SessionExpired);
        }

        sentry::configure_scope(|scope| {
            scope.set_tag("admin_email", admin.email.as_str());
        });

        Ok(Self(admin))
    }
}

/// Store the signed-in admin, dropping any pending step-one login.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentAdmin,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<PendingLogin>(session_keys::PENDING_LOGIN)
        .await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Clear all admin authentication state from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await?;
    session
        .remove::<PendingLogin>(session_keys::PENDING_LOGIN)
        .await?;
    Ok(())
}
