//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (two steps: password, then six-digit code)
//! GET  /auth/login                 - Step one form
//! POST /auth/login                 - Check email and password
//! GET  /auth/verify                - Step two form
//! POST /auth/verify                - Check the code, start the session
//! POST /auth/logout                - Logout
//!
//! # Dashboard
//! GET  /                           - Platform figures
//!
//! # Users
//! GET  /users                      - Profiles (?q=, ?filter=role, ?sort=, ?dir=)
//! GET  /users/export.csv           - Same list as CSV
//! POST /users/{id}/role            - Change role
//! POST /users/{id}/status          - Activate or suspend
//! POST /users/{id}/delete          - Delete profile
//!
//! # Audit log
//! GET  /audit-logs                 - Latest entries (?filter=action)
//! GET  /audit-logs/export.csv      - Same list as CSV
//!
//! # Documents
//! GET  /documents                  - Library
//! POST /documents                  - Upload (multipart)
//! POST /documents/{id}/delete      - Remove object and row
//! GET  /documents/{id}/download    - Signed download redirect
//!
//! # Verification
//! GET  /kyc                        - Submitted sessions
//! POST /kyc/{id}/approve           - Approve
//! POST /kyc/{id}/reject            - Reject
//!
//! # Tokens
//! GET  /tokens                     - Holders and balances
//! POST /tokens/adjust              - Credit or debit a balance
//!
//! # Contracts
//! GET  /contracts                  - Agreements
//! POST /contracts/{id}/status      - Set status
//! GET  /contracts/{id}/download    - Signed download redirect
//! ```

pub mod audit_logs;
pub mod auth;
pub mod contracts;
pub mod dashboard;
pub mod documents;
pub mod kyc;
pub mod tokens;
pub mod users;


use std::collections::HashMap;

use axum::{
    Router,
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use drone_backend::{BackendClient, BackendError, Credential, TableQuery};
use drone_core::UserId;
use drone_core::models::{Profile, tables};

use crate::models::CurrentAdmin;
use crate::state::AppState;

/// Create all routes for admin.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(users::router())
        .merge(audit_logs::router())
        .merge(documents::router())
        .merge(kyc::router())
        .merge(tokens::router())
        .merge(contracts::router())
}

/// Signed-in admin for templates.
#[derive(Debug, Clone)]
pub struct AdminView {
    pub email: String,
}

impl From<&CurrentAdmin> for AdminView {
    fn from(admin: &CurrentAdmin) -> Self {
        Self {
            email: admin.email.to_string(),
        }
    }
}

/// Banner text for a `?success=` code.
#[must_use]
pub fn success_message(code: &str) -> &'static str {
    match code {
        "role" => "Role updated.",
        "status" => "Account status updated.",
        "deleted" => "Deleted.",
        "uploaded" => "Document uploaded.",
        "approved" => "Verification approved.",
        "rejected" => "Verification rejected.",
        "adjusted" => "Token balance adjusted.",
        "contract" => "Contract status updated.",
        _ => "Done.",
    }
}

/// Banner text for an `?error=` code.
#[must_use]
pub fn error_message(code: &str) -> &'static str {
    match code {
        "missing" => "That record no longer exists.",
        "invalid" => "Check the form and try again.",
        "file" => "Choose a file of at most 25 MB.",
        "owner" => "Private documents need an owner.",
        "delta" => "Enter a non-zero amount.",
        "reason" => "Give a reason for the adjustment.",
        "backend" => "The change could not be saved. Please try again.",
        _ => "Something went wrong. Please try again.",
    }
}

/// `(success, error)` banners for a list page.
#[must_use]
pub fn banners(success: Option<&str>, error: Option<&str>) -> (Option<String>, Option<String>) {
    (
        success.map(|c| success_message(c).to_string()),
        error.map(|c| error_message(c).to_string()),
    )
}

/// Post/redirect/get back to `path` with an outcome code.
#[must_use]
pub fn redirect_with(path: &str, key: &str, code: &str) -> Redirect {
    Redirect::to(&format!("{path}?{key}={code}"))
}

/// Serve `body` as a CSV download.
#[must_use]
pub fn csv_response(file_name: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// Email for every profile, keyed by user id.
///
/// # Errors
///
/// Returns error if the profiles cannot be read.
pub async fn emails_by_user(backend: &BackendClient) -> Result<HashMap<UserId, String>, BackendError> {
    let profiles: Vec<Profile> = backend
        .select(tables::PROFILES, &TableQuery::new(), Credential::Service)
        .await?;
    Ok(profiles.into_iter().map(|p| (p.id, p.email)).collect())
}
