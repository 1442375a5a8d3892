//! Dashboard figures on the command line.

use std::io::Write;

use drone_backend::{BackendClient, Credential};
use drone_core::models::{DashboardStats, rpc};
use serde_json::json;

use super::CliError;

/// One `label: value` line per figure.
#[must_use]
pub fn format(stats: &DashboardStats) -> String {
    let rows = [
        ("Users", stats.total_users.to_string()),
        ("Active investors", stats.active_investors.to_string()),
        ("Pending KYC", stats.pending_kyc.to_string()),
        ("Pending contracts", stats.pending_contracts.to_string()),
        ("Raised", stats.total_raised_usd.to_string()),
        ("Tokens issued", stats.tokens_issued.to_string()),
        ("Documents", stats.documents.to_string()),
    ];
    rows.iter()
        .map(|(label, value)| format!("{label:<18}{value}\n"))
        .collect()
}

/// `drone-cli stats`
///
/// # Errors
///
/// Returns an error if the RPC fails or stdout cannot be written.
pub async fn print(backend: &BackendClient) -> Result<(), CliError> {
    let stats: DashboardStats = backend
        .rpc(rpc::DASHBOARD_STATS, &json!({}), Credential::Service)
        .await?;
    std::io::stdout().lock().write_all(format(&stats).as_bytes())?;
    Ok(())
}
