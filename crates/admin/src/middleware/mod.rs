//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry hub and HTTP transaction
//! 2. `TraceLayer` (request span)
//! 3. Request ID
//! 4. Security headers (stricter than the site)
//! 5. Session layer (tower-sessions, in-memory store, SameSite=Strict)
//!
//! [`RequireAdminAuth`] checks the session, including its expiry, per handler.

pub mod auth;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{RequireAdminAuth, clear_current_admin, set_current_admin};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
