//! Application state shared across handlers.

use std::sync::Arc;

use drone_backend::{BackendClient, BackendError};
use drone_core::models::DashboardStats;
use moka::future::Cache;

use crate::config::AdminConfig;
use crate::services::auth::AdminAuthenticator;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    backend: BackendClient,
    authenticator: AdminAuthenticator,
    dashboard: Cache<(), DashboardStats>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: AdminConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend)?;
        let authenticator = AdminAuthenticator::new(config.login.clone(), config.session_ttl);
        // No TTL: the entry is the last stats that loaded, kept until replaced.
        let dashboard = Cache::builder().max_capacity(1).build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                authenticator,
                dashboard,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Backend client; admin requests use the service key.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    #[must_use]
    pub fn authenticator(&self) -> &AdminAuthenticator {
        &self.inner.authenticator
    }

    /// Last dashboard stats that loaded successfully.
    #[must_use]
    pub fn dashboard_cache(&self) -> &Cache<(), DashboardStats> {
        &self.inner.dashboard
    }
}
