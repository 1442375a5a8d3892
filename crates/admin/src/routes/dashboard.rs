//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Router, extract::State, routing::get};
use drone_core::models::DashboardStats;
use tracing::instrument;

use super::AdminView;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::services::dashboard;
use crate::state::AppState;

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub admin: AdminView,
    pub current_path: &'static str,
    pub stats: DashboardStats,
    /// Shown when the figures are stale or missing.
    pub warning: Option<&'static str>,
}

/// GET /
#[instrument(skip(state, admin))]
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> DashboardTemplate {
    let snapshot = dashboard::load(&state).await;

    DashboardTemplate {
        admin: AdminView::from(&admin),
        current_path: "/",
        stats: snapshot.stats(),
        warning: snapshot.warning(),
    }
}
