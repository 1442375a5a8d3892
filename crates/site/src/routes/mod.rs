//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                  - Landing page
//! GET  /faq                               - FAQ
//! GET  /{slug}                            - Content page (about, terms, privacy, risk, whitepaper)
//!
//! # Auth (rate limited)
//! GET  /auth/login                        - Login page
//! POST /auth/login                        - Login action
//! GET  /auth/register                     - Register page
//! POST /auth/register                     - Register action
//! POST /auth/logout                       - Logout action
//!
//! # Portal (requires sign-in)
//! GET  /portal                            - Dashboard
//! GET  /portal/documents                  - Document library (?q=, ?sort=, ?dir=)
//! GET  /portal/documents/{id}/download    - Signed download redirect
//! GET  /portal/contracts                  - Contract agreements
//! POST /portal/contracts/{id}/upload      - Upload a signed agreement (multipart)
//! GET  /portal/contracts/{id}/download    - Signed download redirect
//! GET  /portal/kyc                        - Verification status
//! POST /portal/kyc                        - Submit identity details
//! GET  /portal/invest                     - Investment form
//! POST /portal/invest                     - Card checkout redirect or crypto quote
//! POST /portal/invest/crypto/verify       - Confirm a crypto transfer
//! GET  /portal/invest/complete            - Card checkout return page
//! ```

pub mod auth;
pub mod home;
pub mod pages;
pub mod portal;

#[cfg(test)]
mod tests;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create all routes for the site.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/faq", get(pages::faq))
        .route("/{slug}", get(pages::show))
        .nest("/auth", auth_routes())
        .nest("/portal", portal::routes())
}
