//! Work shared by several handlers.

pub mod purchases;
pub mod webhook;
