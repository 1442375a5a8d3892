//! Landing-page platform stats.

use drone_backend::Credential;
use drone_core::models::{PlatformStats, rpc};
use serde_json::json;

use crate::state::AppState;

/// Public stats, served from the cache when fresh.
///
/// A backend failure renders zeros and is not cached, so the next visitor
/// tries again.
pub async fn platform_stats(state: &AppState) -> PlatformStats {
    if let Some(stats) = state.stats_cache().get(&()).await {
        return stats;
    }

    match state
        .backend()
        .rpc::<_, PlatformStats>(rpc::PLATFORM_STATS, &json!({}), Credential::Anon)
        .await
    {
        Ok(stats) => {
            state.stats_cache().insert((), stats.clone()).await;
            stats
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load platform stats");
            PlatformStats::default()
        }
    }
}
