//! Contract agreements: create, upload, download, list, and status changes.

use std::time::Duration;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use chrono::Utc;
use drone_backend::storage::object_path;
use drone_backend::{Credential, Envelope, TableQuery, UploadForm, audit};
use drone_core::listing::SortDirection;
use drone_core::models::{AuditEntry, ContractAgreement, buckets, rpc, tables};
use drone_core::{ContractId, ContractStatus, UserId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use super::MAX_UPLOAD_BYTES;
use crate::error::{FunctionError, Result};
use crate::extract::{JsonBody, QueryParams, required};
use crate::middleware::Caller;
use crate::state::AppState;

/// How long a download link stays valid.
const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(60 * 60);

async fn load(state: &AppState, id: ContractId) -> Result<ContractAgreement> {
    state
        .backend()
        .select_optional(
            tables::CONTRACT_AGREEMENTS,
            &TableQuery::new().eq("id", id),
            Credential::Service,
        )
        .await?
        .ok_or_else(|| FunctionError::NotFound("Contract not found".to_string()))
}

fn parse_contract_id(raw: &str) -> Result<ContractId> {
    raw.parse()
        .map_err(|_| FunctionError::BadRequest("contract_id is not a valid id".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    contract_type: Option<String>,
    user_id: Option<UserId>,
}

#[derive(Serialize)]
struct NewAgreement<'a> {
    user_id: UserId,
    contract_type: &'a str,
    status: ContractStatus,
}

/// Create a pending agreement for the caller, or for another user (admin).
#[instrument(skip(state, caller, body), fields(user_id = %caller.id()))]
pub async fn create(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<CreateRequest>,
) -> Result<(StatusCode, Json<Envelope<ContractAgreement>>)> {
    let contract_type = required(body.contract_type.as_deref(), "contract_type")?;
    let owner = body.user_id.unwrap_or_else(|| caller.id());
    caller.require_self_or_admin(&state, owner).await?;

    let agreement: ContractAgreement = state
        .backend()
        .insert(
            tables::CONTRACT_AGREEMENTS,
            &NewAgreement {
                user_id: owner,
                contract_type,
                status: ContractStatus::Pending,
            },
            Credential::Service,
        )
        .await?;

    tracing::info!(contract_id = %agreement.id, "Contract agreement created");
    Ok((StatusCode::CREATED, Json(Envelope::ok(agreement))))
}

/// Store a signed agreement and mark it uploaded.
///
/// The file lands at `contracts/{user_id}/{contract_id}/{file_name}`. If the
/// row update fails the object is removed again.
#[instrument(skip(state, caller, multipart), fields(user_id = %caller.id()))]
pub async fn upload(
    State(state): State<AppState>,
    caller: Caller,
    multipart: Multipart,
) -> Result<Json<Envelope<ContractAgreement>>> {
    let mut form = UploadForm::read(multipart, MAX_UPLOAD_BYTES).await?;
    let contract_id = parse_contract_id(form.require("contract_id")?)?;
    let file = form.take_file()?;

    let agreement = load(&state, contract_id).await?;
    caller.require_self_or_admin(&state, agreement.user_id).await?;

    let owner = agreement.user_id.to_string();
    let contract = contract_id.to_string();
    let path = object_path(&[&owner, &contract, &file.file_name]);
    let backend = state.backend();

    backend
        .upload_object(
            buckets::CONTRACTS,
            &path,
            file.bytes,
            &file.content_type,
            true,
            Credential::Service,
        )
        .await?;

    let updated = backend
        .update::<_, ContractAgreement>(
            tables::CONTRACT_AGREEMENTS,
            &TableQuery::new().eq("id", contract_id),
            &json!({
                "status": ContractStatus::Uploaded,
                "storage_path": path,
                "file_name": file.file_name,
                "updated_at": Utc::now(),
            }),
            Credential::Service,
        )
        .await
        .map_err(FunctionError::from)
        .and_then(|rows| {
            rows.into_iter()
                .next()
                .ok_or_else(|| FunctionError::NotFound("Contract not found".to_string()))
        });

    match updated {
        Ok(agreement) => {
            tracing::info!(%contract_id, %path, "Contract uploaded");
            Ok(Json(Envelope::ok_with_message(agreement, "Contract uploaded")))
        }
        Err(e) => {
            if let Err(cleanup) = backend
                .remove_objects(buckets::CONTRACTS, &[path.as_str()], Credential::Service)
                .await
            {
                tracing::warn!(error = %cleanup, %path, "Failed to remove orphaned contract upload");
            }
            Err(e)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    contract_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadLink {
    url: String,
    expires_in: u64,
}

/// A signed URL for an uploaded agreement, valid for one hour.
#[instrument(skip(state, caller, query), fields(user_id = %caller.id()))]
pub async fn download(
    State(state): State<AppState>,
    caller: Caller,
    QueryParams(query): QueryParams<DownloadQuery>,
) -> Result<Json<Envelope<DownloadLink>>> {
    let contract_id = parse_contract_id(required(query.contract_id.as_deref(), "contract_id")?)?;
    let agreement = load(&state, contract_id).await?;
    caller.require_self_or_admin(&state, agreement.user_id).await?;

    let path = agreement
        .storage_path
        .ok_or_else(|| FunctionError::NotFound("No file has been uploaded".to_string()))?;
    let url = state
        .backend()
        .create_signed_url(buckets::CONTRACTS, &path, DOWNLOAD_URL_TTL, Credential::Service)
        .await?;

    Ok(Json(Envelope::ok(DownloadLink {
        url,
        expires_in: DOWNLOAD_URL_TTL.as_secs(),
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    user_id: Option<UserId>,
    #[serde(default)]
    all: bool,
}

/// The caller's agreements; admins may ask for another user or everyone.
#[instrument(skip(state, caller, query), fields(user_id = %caller.id()))]
pub async fn list(
    State(state): State<AppState>,
    caller: Caller,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Envelope<Vec<ContractAgreement>>>> {
    let mut filter = TableQuery::new().order("created_at", SortDirection::Desc);
    if query.all {
        caller.require_admin(&state).await?;
    } else {
        let owner = query.user_id.unwrap_or_else(|| caller.id());
        caller.require_self_or_admin(&state, owner).await?;
        filter = filter.eq("user_id", owner);
    }

    let agreements = state
        .backend()
        .select(tables::CONTRACT_AGREEMENTS, &filter, Credential::Service)
        .await?;
    Ok(Json(Envelope::ok(agreements)))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    contract_id: ContractId,
    status: ContractStatus,
}

#[derive(Debug, Serialize)]
pub struct StatusChange {
    contract_id: ContractId,
    status: ContractStatus,
}

/// Move an agreement to a new status (admin).
#[instrument(skip(state, caller, body), fields(user_id = %caller.id()))]
pub async fn set_status(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<StatusRequest>,
) -> Result<Json<Envelope<StatusChange>>> {
    caller.require_admin(&state).await?;

    state
        .backend()
        .rpc_void(
            rpc::UPDATE_CONTRACT_STATUS,
            &json!({ "p_contract_id": body.contract_id, "p_status": body.status }),
            Credential::Service,
        )
        .await?;

    audit::record(
        state.backend(),
        AuditEntry::new(caller.email(), "update_contract_status", "contract")
            .target(body.contract_id)
            .details(json!({ "status": body.status })),
    )
    .await;

    Ok(Json(Envelope::ok(StatusChange {
        contract_id: body.contract_id,
        status: body.status,
    })))
}
