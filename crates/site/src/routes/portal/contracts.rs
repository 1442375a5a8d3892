//! Contract agreements: list, upload a signed copy, download.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use drone_backend::UploadForm;
use drone_core::ContractId;
use drone_core::models::ContractAgreement;
use serde::Deserialize;

use super::MAX_UPLOAD_BYTES;
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireInvestor;
use crate::models::CurrentInvestor;
use crate::services::PortalClient;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ContractsQuery {
    pub uploaded: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "portal/contracts.html")]
pub struct ContractsTemplate {
    pub investor_name: String,
    pub contracts: Vec<ContractAgreement>,
    pub success: Option<String>,
    pub error: Option<String>,
}

async fn render(
    state: &AppState,
    investor: &CurrentInvestor,
    success: Option<String>,
    error: Option<String>,
) -> ContractsTemplate {
    let (contracts, load_error) = match PortalClient::new(state.backend(), investor)
        .contracts()
        .await
    {
        Ok(contracts) => (contracts, None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load contracts");
            (Vec::new(), Some(e.user_message()))
        }
    };

    ContractsTemplate {
        investor_name: investor.display_name().to_string(),
        contracts,
        success,
        error: error.or(load_error),
    }
}

pub async fn index(
    State(state): State<AppState>,
    RequireInvestor(investor): RequireInvestor,
    Query(query): Query<ContractsQuery>,
) -> impl IntoResponse {
    let success = query
        .uploaded
        .map(|_| "Your signed contract was uploaded.".to_string());
    render(&state, &investor, success, None).await
}

/// Forward a signed agreement to the contract manager.
pub async fn upload(
    State(state): State<AppState>,
    RequireInvestor(investor): RequireInvestor,
    Path(id): Path<ContractId>,
    multipart: Multipart,
) -> Response {
    let file = match UploadForm::read(multipart, MAX_UPLOAD_BYTES)
        .await
        .and_then(|mut form| form.take_file())
    {
        Ok(file) => file,
        Err(e) => {
            return render(&state, &investor, None, Some(e.to_string()))
                .await
                .into_response();
        }
    };

    match PortalClient::new(state.backend(), &investor)
        .upload_contract(id, file)
        .await
    {
        Ok(agreement) => {
            tracing::info!(contract_id = %agreement.id, "Contract uploaded");
            Redirect::to("/portal/contracts?uploaded=1").into_response()
        }
        Err(e) => {
            tracing::warn!(contract_id = %id, error = %e, "Contract upload failed");
            render(&state, &investor, None, Some(e.user_message()))
                .await
                .into_response()
        }
    }
}

/// Redirect to a short-lived signed URL for the uploaded copy.
pub async fn download(
    State(state): State<AppState>,
    RequireInvestor(investor): RequireInvestor,
    Path(id): Path<ContractId>,
) -> Result<Redirect> {
    let url = PortalClient::new(state.backend(), &investor)
        .contract_url(id)
        .await?;
    Ok(Redirect::to(&url))
}
