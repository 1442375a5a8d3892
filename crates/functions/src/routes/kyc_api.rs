//! Identity verification.
//!
//! There is no verification provider: a submission is approved on the spot.

use axum::Json;
use axum::extract::{Multipart, State};
use chrono::Utc;
use drone_backend::storage::object_path;
use drone_backend::{Credential, Envelope, TableQuery, UploadForm, audit};
use drone_core::listing::SortDirection;
use drone_core::models::{AuditEntry, KycSession, buckets, tables};
use drone_core::{KycSessionId, KycStatus, UserId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use super::MAX_UPLOAD_BYTES;
use crate::error::{FunctionError, Result};
use crate::extract::{JsonBody, required};
use crate::middleware::Caller;
use crate::state::AppState;

async fn latest_session(state: &AppState, user_id: UserId) -> Result<Option<KycSession>> {
    Ok(state
        .backend()
        .select_optional(
            tables::KYC_SESSIONS,
            &TableQuery::new()
                .eq("user_id", user_id)
                .order("submitted_at", SortDirection::Desc),
            Credential::Service,
        )
        .await?)
}

async fn set_profile_status(state: &AppState, user_id: UserId, status: KycStatus) -> Result<()> {
    state
        .backend()
        .update::<_, serde_json::Value>(
            tables::PROFILES,
            &TableQuery::new().eq("id", user_id),
            &json!({ "kyc_status": status }),
            Credential::Service,
        )
        .await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    full_name: Option<String>,
    country: Option<String>,
    document_type: Option<String>,
}

#[derive(Serialize)]
struct NewSession<'a> {
    user_id: UserId,
    status: KycStatus,
    full_name: &'a str,
    country: &'a str,
    document_type: &'a str,
    submitted_at: chrono::DateTime<Utc>,
    reviewed_at: chrono::DateTime<Utc>,
}

/// Record the caller's details and approve them.
#[instrument(skip(state, caller, body), fields(user_id = %caller.id()))]
pub async fn submit(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<SubmitRequest>,
) -> Result<Json<Envelope<KycSession>>> {
    let full_name = required(body.full_name.as_deref(), "full_name")?;
    let country = required(body.country.as_deref(), "country")?;
    let document_type = required(body.document_type.as_deref(), "document_type")?;

    let now = Utc::now();
    let session: KycSession = state
        .backend()
        .insert(
            tables::KYC_SESSIONS,
            &NewSession {
                user_id: caller.id(),
                status: KycStatus::Approved,
                full_name,
                country,
                document_type,
                submitted_at: now,
                reviewed_at: now,
            },
            Credential::Service,
        )
        .await?;

    set_profile_status(&state, caller.id(), KycStatus::Approved).await?;

    tracing::info!(session_id = %session.id, "KYC session approved");
    Ok(Json(Envelope::ok_with_message(session, "Verification approved")))
}

#[derive(Debug, Serialize)]
pub struct StatusView {
    status: KycStatus,
    session: Option<KycSession>,
}

/// The caller's latest verification state.
#[instrument(skip(state, caller), fields(user_id = %caller.id()))]
pub async fn status(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Envelope<StatusView>>> {
    let session = latest_session(&state, caller.id()).await?;
    Ok(Json(Envelope::ok(StatusView {
        status: session.as_ref().map_or(KycStatus::NotStarted, |s| s.status),
        session,
    })))
}

/// Attach an identity document to the caller's latest session.
#[instrument(skip(state, caller, multipart), fields(user_id = %caller.id()))]
pub async fn upload(
    State(state): State<AppState>,
    caller: Caller,
    multipart: Multipart,
) -> Result<Json<Envelope<KycSession>>> {
    let mut form = UploadForm::read(multipart, MAX_UPLOAD_BYTES).await?;
    let file = form.take_file()?;

    let session = latest_session(&state, caller.id()).await?.ok_or_else(|| {
        FunctionError::BadRequest("Submit your details before uploading a document".to_string())
    })?;

    let owner = caller.id().to_string();
    let path = object_path(&[&owner, &file.file_name]);
    let backend = state.backend();

    backend
        .upload_object(
            buckets::KYC_DOCUMENTS,
            &path,
            file.bytes,
            &file.content_type,
            true,
            Credential::Service,
        )
        .await?;

    let updated = backend
        .update::<_, KycSession>(
            tables::KYC_SESSIONS,
            &TableQuery::new().eq("id", session.id),
            &json!({ "document_path": path }),
            Credential::Service,
        )
        .await
        .map_err(FunctionError::from)
        .and_then(|rows| {
            rows.into_iter()
                .next()
                .ok_or_else(|| FunctionError::NotFound("Verification session not found".to_string()))
        });

    match updated {
        Ok(session) => {
            tracing::info!(session_id = %session.id, %path, "KYC document uploaded");
            Ok(Json(Envelope::ok_with_message(session, "Document uploaded")))
        }
        Err(e) => {
            if let Err(cleanup) = backend
                .remove_objects(buckets::KYC_DOCUMENTS, &[path.as_str()], Credential::Service)
                .await
            {
                tracing::warn!(error = %cleanup, %path, "Failed to remove orphaned KYC upload");
            }
            Err(e)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    session_id: KycSessionId,
    decision: KycStatus,
}

/// Approve or reject a session (admin).
#[instrument(skip(state, caller, body), fields(user_id = %caller.id()))]
pub async fn review(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<ReviewRequest>,
) -> Result<Json<Envelope<KycSession>>> {
    caller.require_admin(&state).await?;

    if !matches!(body.decision, KycStatus::Approved | KycStatus::Rejected) {
        return Err(FunctionError::BadRequest(
            "decision must be approved or rejected".to_string(),
        ));
    }

    let session = state
        .backend()
        .update::<_, KycSession>(
            tables::KYC_SESSIONS,
            &TableQuery::new().eq("id", body.session_id),
            &json!({ "status": body.decision, "reviewed_at": Utc::now() }),
            Credential::Service,
        )
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| FunctionError::NotFound("KYC session not found".to_string()))?;

    set_profile_status(&state, session.user_id, body.decision).await?;

    audit::record(
        state.backend(),
        AuditEntry::new(caller.email(), "review_kyc", "kyc_session")
            .target(session.id)
            .details(json!({ "decision": body.decision, "user_id": session.user_id })),
    )
    .await;

    Ok(Json(Envelope::ok(session)))
}
