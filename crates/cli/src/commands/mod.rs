//! Command implementations.

pub mod audit;
pub mod stats;

use std::io::Write;

use drone_backend::{BackendClient, BackendConfig, BackendError, ConfigError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Environment configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Writing the output failed.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build a service-key client from the environment.
///
/// # Errors
///
/// Returns `CliError::Config` if the backend variables or the service key
/// are missing.
pub fn connect() -> Result<BackendClient, CliError> {
    let config = BackendConfig::from_env()?.require_service_key()?;
    Ok(BackendClient::new(&config)?)
}

/// `drone-cli ping`
///
/// # Errors
///
/// Returns `CliError::Backend` if the backend is unreachable or rejects the
/// service key.
pub async fn ping(backend: &BackendClient) -> Result<(), CliError> {
    backend.ping().await?;
    writeln!(std::io::stdout().lock(), "ok: {}", backend.base_url())?;
    Ok(())
}
