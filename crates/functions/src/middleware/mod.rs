//! Middleware for the functions service.
//!
//! Applied outermost first:
//! 1. Sentry hub and HTTP transaction
//! 2. `TraceLayer` request span
//! 3. Request ID (recorded into the span and Sentry scope)
//!
//! The [`Caller`] extractor resolves the bearer token per handler.

pub mod auth;
pub mod request_id;

pub use auth::Caller;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
