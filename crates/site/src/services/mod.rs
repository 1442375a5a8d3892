//! Calls the site makes on behalf of visitors and investors.
//!
//! - `stats` - public platform figures for the landing page (cached)
//! - `portal` - an investor's balance, documents, contracts, KYC, and payments

pub mod portal;
pub mod stats;

pub use portal::PortalClient;
pub use stats::platform_stats;
