//! Identity verification review.

use std::sync::LazyLock;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Path, Query, State},
    response::Redirect,
    routing::{get, post},
};
use chrono::Utc;
use drone_backend::{BackendError, Credential, TableQuery};
use drone_core::listing::{SortDirection, SortState, compare_text, filter_by_search, sort_items};
use drone_core::models::{KycSession, Profile, tables};
use drone_core::{KycSessionId, KycStatus};
use serde_json::json;

use super::{AdminView, banners, emails_by_user, redirect_with};
use crate::components::{DataTableConfig, FilterOption, ListQuery, TableColumn, TableFilter, TableView};
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::models::CurrentAdmin;
use crate::services::audit;
use crate::state::AppState;

const BASE: &str = "/kyc";

/// Build the verification router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(BASE, get(index))
        .route("/kyc/{id}/approve", post(approve))
        .route("/kyc/{id}/reject", post(reject))
}

static TABLE: LazyLock<DataTableConfig> = LazyLock::new(|| {
    DataTableConfig::new(BASE)
        .column(TableColumn::sortable("full_name", "Name"))
        .column(TableColumn::new("email", "Email"))
        .column(TableColumn::sortable("country", "Country"))
        .column(TableColumn::new("document_type", "Document"))
        .column(TableColumn::sortable("status", "Status"))
        .column(TableColumn::sortable("submitted_at", "Submitted"))
        .column(TableColumn::new("actions", ""))
        .filter(TableFilter::select(
            "statuses",
            KycStatus::ALL
                .iter()
                .map(|s| FilterOption::new(s.as_str(), s.label()))
                .collect(),
        ))
        .search_placeholder("Search name, country...")
        .default_sort("submitted_at", SortDirection::Desc)
});

/// A session with the submitter's email.
#[derive(Debug, Clone)]
pub struct KycRow {
    pub session: KycSession,
    pub email: String,
}

impl KycRow {
    /// Only sessions awaiting review can be approved or rejected.
    #[must_use]
    pub fn is_reviewable(&self) -> bool {
        self.session.status == KycStatus::Pending
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "kyc.html")]
pub struct KycTemplate {
    pub admin: AdminView,
    pub current_path: &'static str,
    pub rows: Vec<KycRow>,
    pub table: TableView,
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Search, filter by status, then sort.
fn arrange(sessions: Vec<KycSession>, query: &ListQuery, sort: &SortState) -> Vec<KycSession> {
    let status = query.filter().and_then(|f| f.parse::<KycStatus>().ok());
    let mut sessions: Vec<KycSession> = filter_by_search(sessions, query.search())
        .into_iter()
        .filter(|s| status.is_none_or(|st| s.status == st))
        .collect();
    sort_items(&mut sessions, sort.direction, |a, b| match sort.column.as_str() {
        "full_name" => compare_text(&a.full_name, &b.full_name),
        "country" => compare_text(&a.country, &b.country),
        "status" => a.status.as_str().cmp(b.status.as_str()),
        _ => a.submitted_at.cmp(&b.submitted_at),
    });
    sessions
}

/// GET /kyc
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(query): Query<ListQuery>,
) -> KycTemplate {
    let sort = TABLE.sort_state(&query);
    let (success, mut error) = banners(query.success.as_deref(), query.error.as_deref());

    let newest_first = TableQuery::new().order("submitted_at", SortDirection::Desc);
    let (sessions, emails) = tokio::join!(
        state.backend().select::<KycSession>(
            tables::KYC_SESSIONS,
            &newest_first,
            Credential::Service,
        ),
        emails_by_user(state.backend()),
    );
    let emails = emails.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load emails for KYC sessions");
        Default::default()
    });

    let (rows, total) = match sessions {
        Ok(sessions) => {
            let total = sessions.len();
            let rows = arrange(sessions, &query, &sort)
                .into_iter()
                .map(|session| KycRow {
                    email: emails.get(&session.user_id).cloned().unwrap_or_default(),
                    session,
                })
                .collect();
            (rows, total)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load KYC sessions");
            error = Some(e.user_message());
            (Vec::new(), 0)
        }
    };

    KycTemplate {
        admin: AdminView::from(&admin),
        current_path: BASE,
        table: TABLE.view(&query, &sort, rows.len(), total),
        rows,
        success,
        error,
    }
}

/// Set the session's decision and mirror it onto the profile.
///
/// Returns `Ok(None)` when no session has `id`.
async fn decide(
    state: &AppState,
    id: KycSessionId,
    status: KycStatus,
) -> Result<Option<KycSession>, BackendError> {
    let updated: Vec<KycSession> = state
        .backend()
        .update(
            tables::KYC_SESSIONS,
            &TableQuery::new().eq("id", id),
            &json!({ "status": status, "reviewed_at": Utc::now() }),
            Credential::Service,
        )
        .await?;
    let Some(session) = updated.into_iter().next() else {
        return Ok(None);
    };

    let _: Vec<Profile> = state
        .backend()
        .update(
            tables::PROFILES,
            &TableQuery::new().eq("id", session.user_id),
            &json!({ "kyc_status": status }),
            Credential::Service,
        )
        .await?;
    Ok(Some(session))
}

async fn review(
    state: &AppState,
    admin: &CurrentAdmin,
    id: KycSessionId,
    status: KycStatus,
) -> Redirect {
    let (action, code) = if status == KycStatus::Approved {
        ("approve_kyc", "approved")
    } else {
        ("reject_kyc", "rejected")
    };

    match decide(state, id, status).await {
        Ok(Some(session)) => {
            audit::record(
                state.backend(),
                audit::entry(admin, action, "kyc_session")
                    .target(id)
                    .details(json!({ "user_id": session.user_id })),
            )
            .await;
            tracing::info!(kyc_session_id = %id, %status, "KYC reviewed");
            redirect_with(BASE, "success", code)
        }
        Ok(None) => redirect_with(BASE, "error", "missing"),
        Err(e) => {
            tracing::error!(error = %e, kyc_session_id = %id, "Failed to review KYC session");
            redirect_with(BASE, "error", "backend")
        }
    }
}

/// POST /kyc/{id}/approve
async fn approve(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<KycSessionId>,
) -> Redirect {
    review(&state, &admin, id, KycStatus::Approved).await
}

/// POST /kyc/{id}/reject
async fn reject(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<KycSessionId>,
) -> Redirect {
    review(&state, &admin, id, KycStatus::Rejected).await
}
