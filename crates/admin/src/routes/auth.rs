//! Two-step admin sign-in and sign-out.
//!
//! Step one checks the email and password and stores a [`PendingLogin`].
//! Step two checks the six-digit code against that pending login and only
//! then stores the [`CurrentAdmin`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_current_admin, set_current_admin};
use crate::models::{CurrentAdmin, PendingLogin, session_keys};
use crate::services::auth::AdminAuthError;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login_page).post(login))
        .route("/auth/verify", get(verify_page).post(verify))
        .route("/auth/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyForm {
    pub code: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/verify.html")]
pub struct VerifyTemplate {
    pub email: String,
    pub error: Option<String>,
}

fn error_message(code: &str) -> &'static str {
    match code {
        "credentials" => "Invalid email or password.",
        "code" => "That code is not correct.",
        "expired" => "Your sign-in has expired. Please start again.",
        "attempts" => "Too many incorrect codes. Please sign in again.",
        _ => "Something went wrong. Please try again.",
    }
}

/// GET /auth/login
async fn login_page(session: Session, Query(query): Query<MessageQuery>) -> Response {
    let signed_in = session
        .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await
        .ok()
        .flatten()
        .is_some_and(|admin| !admin.is_expired(Utc::now()));
    if signed_in {
        return Redirect::to("/").into_response();
    }

    LoginTemplate {
        error: query.error.as_deref().map(|c| error_message(c).to_string()),
        success: query
            .success
            .filter(|c| c == "logout")
            .map(|_| "You have been signed out.".to_string()),
    }
    .into_response()
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Redirect {
    let pending = match state
        .authenticator()
        .verify_password(&form.email, &form.password, Utc::now())
    {
        Ok(pending) => pending,
        Err(e) => {
            tracing::warn!(email = %form.email.trim(), "Admin password rejected");
            return Redirect::to(&format!("/auth/login?error={}", e.code()));
        }
    };

    if let Err(e) = session.insert(session_keys::PENDING_LOGIN, &pending).await {
        tracing::error!(error = %e, "Failed to store pending login");
        return Redirect::to("/auth/login?error=session");
    }
    Redirect::to("/auth/verify")
}

/// GET /auth/verify
async fn verify_page(session: Session, Query(query): Query<MessageQuery>) -> Response {
    let pending: Option<PendingLogin> = session
        .get(session_keys::PENDING_LOGIN)
        .await
        .ok()
        .flatten();
    match pending {
        Some(pending) if pending.is_fresh(Utc::now()) => VerifyTemplate {
            email: pending.email.to_string(),
            error: query.error.as_deref().map(|c| error_message(c).to_string()),
        }
        .into_response(),
        Some(_) => Redirect::to("/auth/login?error=expired").into_response(),
        None => Redirect::to("/auth/login").into_response(),
    }
}

/// POST /auth/verify
async fn verify(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<VerifyForm>,
) -> Redirect {
    let mut pending: Option<PendingLogin> = session
        .get(session_keys::PENDING_LOGIN)
        .await
        .ok()
        .flatten();

    let admin = match state
        .authenticator()
        .verify_code(pending.as_mut(), &form.code, Utc::now())
    {
        Ok(admin) => admin,
        Err(AdminAuthError::InvalidCode) => {
            if let Some(pending) = &pending {
                tracing::warn!(attempts = pending.failed_attempts, "Admin login code rejected");
                if let Err(e) = session.insert(session_keys::PENDING_LOGIN, pending).await {
                    tracing::error!(error = %e, "Failed to store pending login");
                    return Redirect::to("/auth/login?error=session");
                }
            }
            return Redirect::to("/auth/verify?error=code");
        }
        Err(e) => {
            if e == AdminAuthError::TooManyAttempts {
                tracing::warn!("Admin login abandoned after too many wrong codes");
            }
            if let Err(err) = clear_current_admin(&session).await {
                tracing::warn!(error = %err, "Failed to clear pending login");
            }
            return Redirect::to(&format!("/auth/login?error={}", e.code()));
        }
    };

    if let Err(e) = session.cycle_id().await {
        tracing::error!(error = %e, "Failed to cycle session id");
        return Redirect::to("/auth/login?error=session");
    }
    if let Err(e) = set_current_admin(&session, &admin).await {
        tracing::error!(error = %e, "Failed to set session");
        return Redirect::to("/auth/login?error=session");
    }

    set_sentry_user(admin.email.as_str());
    tracing::info!(email = %admin.email, expires_at = %admin.expires_at, "Admin signed in");
    Redirect::to("/")
}

/// POST /auth/logout
async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_current_admin(&session).await {
        tracing::warn!(error = %e, "Failed to clear admin session");
    }
    if let Err(e) = session.flush().await {
        tracing::warn!(error = %e, "Failed to flush admin session");
    }
    clear_sentry_user();
    Redirect::to("/auth/login?success=logout")
}
