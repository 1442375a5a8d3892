//! Drone Capital backend client.
//!
//! A thin typed client over the hosted backend the platform runs on:
//!
//! - [`auth`] - email/password sessions
//! - [`rest`] - table reads and writes, database functions
//! - [`storage`] - object upload, download, and signed URLs
//! - [`functions`] - serverless function calls and their response envelope
//! - [`upload`] - multipart upload forms handed on to storage
//! - [`audit`] - the admin audit trail
//! - [`telemetry`] - tracing subscriber, Sentry, and shutdown for the binaries
//!
//! Requests are made with a [`Credential`]: the anon key, a user's access
//! token, or the service-role key. Row-level security in the backend decides
//! what anon and user requests may see.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod audit;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod functions;
pub mod rest;
pub mod storage;
pub mod telemetry;
pub mod upload;

pub use auth::{AuthSession, AuthUser, SignUpOutcome};
pub use client::{BackendClient, Credential};
pub use config::{BackendConfig, ConfigError, SentryConfig};
pub use error::{BackendError, ErrorKind};
pub use functions::Envelope;
pub use rest::TableQuery;
pub use upload::{UploadError, UploadForm, UploadedFile};
