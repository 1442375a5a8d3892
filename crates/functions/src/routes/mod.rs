//! HTTP routes for the functions service.
//!
//! # Route Structure
//!
//! ```text
//! # contract-manager
//! POST /contract-manager/create        - Create a pending agreement
//! POST /contract-manager/upload        - Upload a signed agreement (multipart)
//! GET  /contract-manager/download      - Signed download URL (?contract_id=)
//! GET  /contract-manager/list          - Agreements (?user_id=, ?all=true for admins)
//! POST /contract-manager/status        - Set agreement status (admin)
//!
//! # kyc-api
//! POST /kyc-api/submit                 - Submit identity details
//! GET  /kyc-api/status                 - Latest verification state
//! POST /kyc-api/upload                 - Upload an identity document (multipart)
//! POST /kyc-api/review                 - Approve or reject a session (admin)
//!
//! # payment-api
//! POST /payment-api/checkout           - Hosted card checkout URL
//! POST /payment-api/crypto/address     - Placeholder deposit address
//! POST /payment-api/crypto/verify      - Confirm a crypto transfer
//! POST /payment-api/webhook            - Card processor notification (signed)
//!
//! # token-api
//! GET  /token-api/balance              - Caller's balance
//! GET  /token-api/transactions         - Caller's transactions
//! GET  /token-api/price                - Current DRN price
//! POST /token-api/adjust               - Manual balance adjustment (admin)
//! ```
//!
//! Unknown paths answer 404 and known paths with the wrong method answer
//! 405, both in the JSON envelope.

pub mod contract_manager;
pub mod kyc_api;
pub mod payment_api;
pub mod token_api;

#[cfg(test)]
mod tests;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

use crate::error::FunctionError;
use crate::state::AppState;

/// Largest accepted contract or identity document.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Room for the multipart framing around the file.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

/// Build the function routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        // contract-manager
        .route("/contract-manager/create", post(contract_manager::create))
        .route(
            "/contract-manager/upload",
            post(contract_manager::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/contract-manager/download", get(contract_manager::download))
        .route("/contract-manager/list", get(contract_manager::list))
        .route("/contract-manager/status", post(contract_manager::set_status))
        // kyc-api
        .route("/kyc-api/submit", post(kyc_api::submit))
        .route("/kyc-api/status", get(kyc_api::status))
        .route(
            "/kyc-api/upload",
            post(kyc_api::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/kyc-api/review", post(kyc_api::review))
        // payment-api
        .route("/payment-api/checkout", post(payment_api::checkout))
        .route("/payment-api/crypto/address", post(payment_api::crypto_address))
        .route("/payment-api/crypto/verify", post(payment_api::crypto_verify))
        .route("/payment-api/webhook", post(payment_api::webhook))
        // token-api
        .route("/token-api/balance", get(token_api::balance))
        .route("/token-api/transactions", get(token_api::transactions))
        .route("/token-api/price", get(token_api::price))
        .route("/token-api/adjust", post(token_api::adjust))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
}

async fn method_not_allowed() -> FunctionError {
    FunctionError::MethodNotAllowed
}

async fn not_found() -> FunctionError {
    FunctionError::NotFound("Not found".to_string())
}
