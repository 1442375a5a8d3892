//! Drone Capital Core - Shared types library.
//!
//! This crate provides common types used across all Drone Capital components:
//! - `site` - Public marketing site and investor portal
//! - `admin` - Internal back-office
//! - `functions` - Serverless handlers (contracts, KYC, payments, tokens)
//! - `cli` - Operator command-line tools
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, amounts, emails, and statuses
//! - [`models`] - Shapes of the rows stored in the backend
//! - [`listing`] - Search, sort, and CSV export over in-memory lists
//! - [`payment`] - Payment form validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod listing;
pub mod models;
pub mod payment;
pub mod types;

pub use types::*;

// Re-exported so `define_id!` works in downstream crates without a direct uuid dependency.
#[doc(hidden)]
pub use uuid;
