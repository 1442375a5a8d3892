//! Investor sign-in, registration, and sign-out.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use drone_backend::{BackendError, SignUpOutcome};
use drone_core::Email;
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalInvestor, clear_current_investor, set_current_investor};
use crate::models::CurrentInvestor;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Status codes carried back to the login page.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub signed_in: bool,
    pub error: Option<String>,
    pub success: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub signed_in: bool,
    pub error: Option<String>,
    pub email: String,
    pub full_name: String,
}

fn error_message(code: &str) -> &'static str {
    match code {
        "credentials" => "Invalid email or password.",
        "expired" => "Your session has expired. Please sign in again.",
        "unavailable" => "We couldn't reach the server. Please try again in a moment.",
        _ => "Something went wrong. Please try again.",
    }
}

fn success_message(code: &str) -> &'static str {
    match code {
        "confirm" => "Check your email to confirm your account, then sign in.",
        "logout" => "You have been signed out.",
        _ => "Done.",
    }
}

/// Store the investor under a fresh session id.
async fn start_session(session: &Session, investor: &CurrentInvestor) -> Response {
    if let Err(e) = session.cycle_id().await {
        tracing::error!(error = %e, "Failed to cycle session id");
        return Redirect::to("/auth/login?error=session").into_response();
    }
    if let Err(e) = set_current_investor(session, investor).await {
        tracing::error!(error = %e, "Failed to set session");
        return Redirect::to("/auth/login?error=session").into_response();
    }
    set_sentry_user(&investor.user_id, Some(&investor.email));
    tracing::info!(user_id = %investor.user_id, "Investor signed in");
    Redirect::to("/portal").into_response()
}

// =============================================================================
// Login
// =============================================================================

pub async fn login_page(
    OptionalInvestor(investor): OptionalInvestor,
    Query(query): Query<MessageQuery>,
) -> Response {
    if investor.is_some() {
        return Redirect::to("/portal").into_response();
    }
    LoginTemplate {
        signed_in: false,
        error: query.error.as_deref().map(|c| error_message(c).to_string()),
        success: query.success.as_deref().map(|c| success_message(c).to_string()),
    }
    .into_response()
}

/// Sign in with email and password.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let password = SecretString::from(form.password);
    match state.backend().sign_in(form.email.trim(), &password).await {
        Ok(auth) => start_session(&session, &CurrentInvestor::from_session(auth)).await,
        Err(BackendError::Unauthorized(_)) => {
            tracing::info!("Login rejected");
            Redirect::to("/auth/login?error=credentials").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            Redirect::to("/auth/login?error=unavailable").into_response()
        }
    }
}

// =============================================================================
// Registration
// =============================================================================

pub async fn register_page(OptionalInvestor(investor): OptionalInvestor) -> Response {
    if investor.is_some() {
        return Redirect::to("/portal").into_response();
    }
    RegisterTemplate {
        signed_in: false,
        error: None,
        email: String::new(),
        full_name: String::new(),
    }
    .into_response()
}

fn validate_registration(form: &RegisterForm) -> Result<Email, String> {
    let email = Email::parse(form.email.trim()).map_err(|e| format!("Invalid email: {e}"))?;
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        ));
    }
    if form.password != form.password_confirm {
        return Err("Passwords do not match.".to_string());
    }
    Ok(email)
}

/// Create an account. Signs the investor in when the backend does not
/// require email confirmation.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    let full_name = form
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    let rerender = |error: String| {
        RegisterTemplate {
            signed_in: false,
            error: Some(error),
            email: form.email.trim().to_string(),
            full_name: full_name.clone().unwrap_or_default(),
        }
        .into_response()
    };

    let email = match validate_registration(&form) {
        Ok(email) => email,
        Err(message) => return rerender(message),
    };

    let password = SecretString::from(form.password.clone());
    match state
        .backend()
        .sign_up(email.as_str(), &password, full_name.as_deref())
        .await
    {
        Ok(SignUpOutcome::SignedIn(auth)) => {
            start_session(&session, &CurrentInvestor::from_session(auth)).await
        }
        Ok(SignUpOutcome::ConfirmationRequired(user)) => {
            tracing::info!(user_id = %user.id, "Registration awaiting confirmation");
            Redirect::to("/auth/login?success=confirm").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            rerender(e.user_message())
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out locally and revoke the backend session.
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalInvestor(investor): OptionalInvestor,
) -> Response {
    if let Some(investor) = investor {
        if let Err(e) = state.backend().sign_out(&investor.access_token).await {
            tracing::warn!(error = %e, "Failed to revoke backend session");
        }
    }
    if let Err(e) = clear_current_investor(&session).await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "Failed to flush session");
    }
    clear_sentry_user();
    Redirect::to("/auth/login?success=logout").into_response()
}
