//! Business logic behind the admin pages.

pub mod audit;
pub mod auth;
pub mod dashboard;
