//! Types stored in the session.

pub mod session;

pub use session::{CurrentInvestor, keys as session_keys};
