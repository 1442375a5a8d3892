//! Contract agreements: review status and download signed copies.

use std::sync::LazyLock;
use std::time::Duration;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::Redirect,
    routing::{get, post},
};
use drone_backend::{Credential, TableQuery};
use drone_core::listing::{SortDirection, SortState, compare_text, filter_by_search, sort_items};
use drone_core::models::{ContractAgreement, buckets, rpc, tables};
use drone_core::{ContractId, ContractStatus};
use serde::Deserialize;
use serde_json::json;

use super::{AdminView, banners, emails_by_user, redirect_with};
use crate::components::{DataTableConfig, FilterOption, ListQuery, TableColumn, TableFilter, TableView};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::services::audit;
use crate::state::AppState;

const BASE: &str = "/contracts";

const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Build the contracts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(BASE, get(index))
        .route("/contracts/{id}/status", post(update_status))
        .route("/contracts/{id}/download", get(download))
}

static TABLE: LazyLock<DataTableConfig> = LazyLock::new(|| {
    DataTableConfig::new(BASE)
        .column(TableColumn::new("email", "Investor"))
        .column(TableColumn::sortable("contract_type", "Type"))
        .column(TableColumn::sortable("status", "Status"))
        .column(TableColumn::new("file", "File"))
        .column(TableColumn::sortable("updated_at", "Updated"))
        .column(TableColumn::new("actions", ""))
        .filter(TableFilter::select(
            "statuses",
            ContractStatus::ALL
                .iter()
                .map(|s| FilterOption::new(s.as_str(), s.label()))
                .collect(),
        ))
        .search_placeholder("Search type, status...")
        .default_sort("updated_at", SortDirection::Desc)
});

/// An agreement with the investor's email.
#[derive(Debug, Clone)]
pub struct ContractRow {
    pub contract: ContractAgreement,
    pub email: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "contracts.html")]
pub struct ContractsTemplate {
    pub admin: AdminView,
    pub current_path: &'static str,
    pub rows: Vec<ContractRow>,
    pub statuses: &'static [ContractStatus],
    pub table: TableView,
    pub success: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

fn arrange(
    contracts: Vec<ContractAgreement>,
    query: &ListQuery,
    sort: &SortState,
) -> Vec<ContractAgreement> {
    let status = query.filter().and_then(|f| f.parse::<ContractStatus>().ok());
    let mut contracts: Vec<ContractAgreement> = filter_by_search(contracts, query.search())
        .into_iter()
        .filter(|c| status.is_none_or(|s| c.status == s))
        .collect();
    sort_items(&mut contracts, sort.direction, |a, b| match sort.column.as_str() {
        "contract_type" => compare_text(&a.contract_type, &b.contract_type),
        "status" => a.status.as_str().cmp(b.status.as_str()),
        _ => a.updated_at.cmp(&b.updated_at),
    });
    contracts
}

/// GET /contracts
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(query): Query<ListQuery>,
) -> ContractsTemplate {
    let sort = TABLE.sort_state(&query);
    let (success, mut error) = banners(query.success.as_deref(), query.error.as_deref());

    let newest_first = TableQuery::new().order("updated_at", SortDirection::Desc);
    let (contracts, emails) = tokio::join!(
        state.backend().select::<ContractAgreement>(
            tables::CONTRACT_AGREEMENTS,
            &newest_first,
            Credential::Service,
        ),
        emails_by_user(state.backend()),
    );
    let emails = emails.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load emails for contracts");
        Default::default()
    });

    let (rows, total) = match contracts {
        Ok(contracts) => {
            let total = contracts.len();
            let rows = arrange(contracts, &query, &sort)
                .into_iter()
                .map(|contract| ContractRow {
                    email: emails.get(&contract.user_id).cloned().unwrap_or_default(),
                    contract,
                })
                .collect();
            (rows, total)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load contracts");
            error = Some(e.user_message());
            (Vec::new(), 0)
        }
    };

    ContractsTemplate {
        admin: AdminView::from(&admin),
        current_path: BASE,
        table: TABLE.view(&query, &sort, rows.len(), total),
        rows,
        statuses: ContractStatus::ALL,
        success,
        error,
    }
}

/// POST /contracts/{id}/status
async fn update_status(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<ContractId>,
    Form(form): Form<StatusForm>,
) -> Redirect {
    let Ok(status) = form.status.parse::<ContractStatus>() else {
        return redirect_with(BASE, "error", "invalid");
    };

    let params = json!({ "p_contract_id": id, "p_status": status });
    if let Err(e) = state
        .backend()
        .rpc_void(rpc::UPDATE_CONTRACT_STATUS, &params, Credential::Service)
        .await
    {
        tracing::error!(error = %e, contract_id = %id, "Failed to update contract status");
        return redirect_with(BASE, "error", "backend");
    }

    audit::record(
        state.backend(),
        audit::entry(&admin, "update_contract_status", "contract")
            .target(id)
            .details(json!({ "status": status })),
    )
    .await;
    redirect_with(BASE, "success", "contract")
}

/// GET /contracts/{id}/download
async fn download(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<ContractId>,
) -> Result<Redirect> {
    let contract: ContractAgreement = state
        .backend()
        .select_optional(
            tables::CONTRACT_AGREEMENTS,
            &TableQuery::new().eq("id", id),
            Credential::Service,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("contract {id}")))?;
    let path = contract
        .storage_path
        .ok_or_else(|| AppError::NotFound(format!("signed copy of contract {id}")))?;

    let url = state
        .backend()
        .create_signed_url(buckets::CONTRACTS, &path, SIGNED_URL_TTL, Credential::Service)
        .await?;
    Ok(Redirect::to(&url))
}
