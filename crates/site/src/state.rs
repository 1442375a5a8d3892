//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use drone_backend::{BackendClient, BackendError};
use drone_core::models::PlatformStats;
use moka::future::Cache;

use crate::config::SiteConfig;
use crate::content::ContentStore;

/// How long landing-page stats are reused.
const STATS_TTL: Duration = Duration::from_secs(300);

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    backend: BackendClient,
    content: ContentStore,
    stats: Cache<(), PlatformStats>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: SiteConfig, content: ContentStore) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend)?;
        let stats = Cache::builder()
            .max_capacity(1)
            .time_to_live(STATS_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                content,
                stats,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    /// Get a reference to the backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.inner.content
    }

    /// Cache for the public platform stats.
    #[must_use]
    pub fn stats_cache(&self) -> &Cache<(), PlatformStats> {
        &self.inner.stats
    }
}
