//! Core types for Drone Capital.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod amount;
pub mod email;
pub mod id;
pub mod status;

pub use amount::{AmountError, TokenAmount, TokenPrice, UsdAmount};
pub use email::{Email, EmailError};
pub use id::*;
pub use status::*;
