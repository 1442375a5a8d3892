//! Investor dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use drone_core::KycStatus;
use drone_core::models::{Investment, TokenHolder, WalletTransaction};

use crate::filters;
use crate::middleware::RequireInvestor;
use crate::services::PortalClient;
use crate::state::AppState;

/// Rows shown in each dashboard table.
const RECENT_ROWS: usize = 10;

#[derive(Template, WebTemplate)]
#[template(path = "portal/dashboard.html")]
pub struct DashboardTemplate {
    pub investor_name: String,
    pub holder: TokenHolder,
    pub investments: Vec<Investment>,
    pub transactions: Vec<WalletTransaction>,
    pub kyc_status: KycStatus,
    pub error: Option<String>,
}

/// Balance, recent investments and transactions, and verification state.
///
/// Each panel loads independently; a failure renders an empty panel and a
/// banner rather than failing the page.
pub async fn show(
    State(state): State<AppState>,
    RequireInvestor(investor): RequireInvestor,
) -> impl IntoResponse {
    let portal = PortalClient::new(state.backend(), &investor);
    let (holder, investments, transactions, kyc) = tokio::join!(
        portal.balance(),
        portal.investments(),
        portal.transactions(),
        portal.kyc_status(),
    );

    let mut failed = false;
    let mut note = |what: &str, e: &dyn std::fmt::Display| {
        tracing::warn!(user_id = %investor.user_id, error = %e, "Failed to load {what}");
        failed = true;
    };

    let holder = holder.unwrap_or_else(|e| {
        note("balance", &e);
        TokenHolder::empty(investor.user_id)
    });
    let mut investments = investments.unwrap_or_else(|e| {
        note("investments", &e);
        Vec::new()
    });
    let mut transactions = transactions.unwrap_or_else(|e| {
        note("transactions", &e);
        Vec::new()
    });
    let kyc_status = kyc.map_or_else(
        |e| {
            note("KYC status", &e);
            KycStatus::NotStarted
        },
        |overview| overview.status,
    );

    investments.truncate(RECENT_ROWS);
    transactions.truncate(RECENT_ROWS);

    DashboardTemplate {
        investor_name: investor.display_name().to_string(),
        holder,
        investments,
        transactions,
        kyc_status,
        error: failed.then(|| "Some of your account details could not be loaded.".to_string()),
    }
}
