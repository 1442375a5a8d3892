//! Landing page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use drone_core::models::PlatformStats;
use drone_core::{TokenPrice, UsdAmount};

use crate::filters;
use crate::middleware::OptionalInvestor;
use crate::services::platform_stats;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub signed_in: bool,
    pub stats: PlatformStats,
    pub token_price: TokenPrice,
    pub min_investment: UsdAmount,
}

/// Landing page with the public platform figures.
pub async fn home(
    State(state): State<AppState>,
    OptionalInvestor(investor): OptionalInvestor,
) -> impl IntoResponse {
    let stats = platform_stats(&state).await;
    HomeTemplate {
        signed_in: investor.is_some(),
        stats,
        token_price: state.config().token_price,
        min_investment: state.config().min_investment,
    }
}
