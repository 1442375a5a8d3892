//! Dashboard stats with a deadline and a last-known-good fallback.

use drone_backend::Credential;
use drone_core::models::{DashboardStats, rpc};
use serde_json::json;
use tracing::instrument;

use crate::state::AppState;

/// What the dashboard can show right now.
#[derive(Debug, Clone)]
pub enum DashboardSnapshot {
    /// Loaded just now.
    Fresh(DashboardStats),
    /// The refresh failed; these are the last stats that loaded.
    Stale(DashboardStats),
    /// The refresh failed and nothing has ever loaded.
    Unavailable,
}

impl DashboardSnapshot {
    /// Stats to render; zeros when unavailable.
    #[must_use]
    pub fn stats(&self) -> DashboardStats {
        match self {
            Self::Fresh(stats) | Self::Stale(stats) => stats.clone(),
            Self::Unavailable => DashboardStats::default(),
        }
    }

    /// Warning shown above the stats.
    #[must_use]
    pub const fn warning(&self) -> Option<&'static str> {
        match self {
            Self::Fresh(_) => None,
            Self::Stale(_) => Some("Live figures could not be loaded. Showing the last known values."),
            Self::Unavailable => Some("Dashboard figures could not be loaded."),
        }
    }
}

/// Load the dashboard stats under the configured timeout.
///
/// Success replaces the cached entry; a failure or timeout falls back to it.
#[instrument(skip(state))]
pub async fn load(state: &AppState) -> DashboardSnapshot {
    let params = json!({});
    let call = state
        .backend()
        .rpc::<_, DashboardStats>(rpc::DASHBOARD_STATS, &params, Credential::Service);

    let failure = match tokio::time::timeout(state.config().dashboard_timeout, call).await {
        Ok(Ok(stats)) => {
            state.dashboard_cache().insert((), stats.clone()).await;
            return DashboardSnapshot::Fresh(stats);
        }
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!(
            "timed out after {}s",
            state.config().dashboard_timeout.as_secs()
        ),
    };

    tracing::warn!(error = %failure, "Failed to load dashboard stats");
    match state.dashboard_cache().get(&()).await {
        Some(stats) => DashboardSnapshot::Stale(stats),
        None => DashboardSnapshot::Unavailable,
    }
}
