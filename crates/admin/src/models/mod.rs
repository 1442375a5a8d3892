//! Domain models for admin.
//!
//! Rows shown in the back-office come from `drone_core::models`; only the
//! session state is defined here.

pub mod session;

pub use session::{CurrentAdmin, MAX_CODE_ATTEMPTS, PendingLogin, keys as session_keys};
