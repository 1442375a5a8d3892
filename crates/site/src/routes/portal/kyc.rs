//! Identity verification.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use drone_core::KycStatus;
use drone_core::models::KycSession;
use serde::Deserialize;

use crate::filters;
use crate::middleware::RequireInvestor;
use crate::services::PortalClient;
use crate::services::portal::KycSubmission;
use crate::state::AppState;

/// Document types offered on the form.
pub const DOCUMENT_TYPES: [(&str, &str); 3] = [
    ("passport", "Passport"),
    ("national_id", "National ID card"),
    ("drivers_license", "Driver's license"),
];

#[derive(Debug, Deserialize)]
pub struct KycForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub document_type: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct KycQuery {
    pub submitted: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "portal/kyc.html")]
pub struct KycTemplate {
    pub investor_name: String,
    pub status: KycStatus,
    pub session: Option<KycSession>,
    pub document_types: &'static [(&'static str, &'static str)],
    pub full_name: String,
    pub country: String,
    pub success: Option<String>,
    pub error: Option<String>,
}

impl KycTemplate {
    /// The form is hidden once verification is pending or done.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        matches!(self.status, KycStatus::NotStarted | KycStatus::Rejected)
    }
}

pub async fn show(
    State(state): State<AppState>,
    RequireInvestor(investor): RequireInvestor,
    Query(query): Query<KycQuery>,
) -> impl IntoResponse {
    let (status, session, error) = match PortalClient::new(state.backend(), &investor)
        .kyc_status()
        .await
    {
        Ok(overview) => (overview.status, overview.session, None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load KYC status");
            (KycStatus::NotStarted, None, Some(e.user_message()))
        }
    };

    KycTemplate {
        investor_name: investor.display_name().to_string(),
        status,
        session,
        document_types: &DOCUMENT_TYPES,
        full_name: investor.full_name.clone().unwrap_or_default(),
        country: String::new(),
        success: query
            .submitted
            .map(|_| "Thank you. Your identity has been verified.".to_string()),
        error,
    }
}

/// Submit identity details to the verification provider.
pub async fn submit(
    State(state): State<AppState>,
    RequireInvestor(investor): RequireInvestor,
    Form(form): Form<KycForm>,
) -> Response {
    let submission = KycSubmission {
        full_name: form.full_name.trim().to_string(),
        country: form.country.trim().to_string(),
        document_type: form.document_type.trim().to_string(),
    };

    match PortalClient::new(state.backend(), &investor)
        .submit_kyc(&submission)
        .await
    {
        Ok(session) => {
            tracing::info!(session_id = %session.id, status = %session.status, "KYC submitted");
            Redirect::to("/portal/kyc?submitted=1").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "KYC submission failed");
            KycTemplate {
                investor_name: investor.display_name().to_string(),
                status: KycStatus::NotStarted,
                session: None,
                document_types: &DOCUMENT_TYPES,
                full_name: submission.full_name,
                country: submission.country,
                success: None,
                error: Some(e.user_message()),
            }
            .into_response()
        }
    }
}
