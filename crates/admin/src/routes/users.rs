//! Investor accounts: list, export, role and status changes, deletion.

use std::sync::LazyLock;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Redirect, Response},
    routing::{get, post},
};
use drone_backend::{BackendError, Credential, TableQuery};
use drone_core::listing::{SortDirection, SortState, compare_text, filter_by_search, sort_items, to_csv};
use drone_core::models::{Profile, tables};
use drone_core::{AccountStatus, UserId, UserRole};
use serde::Deserialize;
use serde_json::json;

use super::{AdminView, banners, csv_response, redirect_with};
use crate::components::{DataTableConfig, FilterOption, ListQuery, TableColumn, TableFilter, TableView};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::services::audit;
use crate::state::AppState;

const BASE: &str = "/users";

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(BASE, get(index))
        .route("/users/export.csv", get(export))
        .route("/users/{id}/role", post(update_role))
        .route("/users/{id}/status", post(update_status))
        .route("/users/{id}/delete", post(delete))
}

static TABLE: LazyLock<DataTableConfig> = LazyLock::new(|| {
    DataTableConfig::new(BASE)
        .column(TableColumn::sortable("email", "Email"))
        .column(TableColumn::sortable("name", "Name"))
        .column(TableColumn::sortable("role", "Role"))
        .column(TableColumn::sortable("status", "Status"))
        .column(TableColumn::sortable("kyc_status", "Verification"))
        .column(TableColumn::sortable("created_at", "Joined"))
        .column(TableColumn::new("actions", ""))
        .filter(TableFilter::select(
            "roles",
            UserRole::ALL
                .iter()
                .map(|r| FilterOption::new(r.as_str(), r.label()))
                .collect(),
        ))
        .search_placeholder("Search email, name, role...")
        .export("/users/export.csv")
        .default_sort("created_at", SortDirection::Desc)
});

#[derive(Template, WebTemplate)]
#[template(path = "users.html")]
pub struct UsersTemplate {
    pub admin: AdminView,
    pub current_path: &'static str,
    pub users: Vec<Profile>,
    pub table: TableView,
    pub roles: &'static [UserRole],
    pub statuses: &'static [AccountStatus],
    pub success: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Search, filter by role, then sort.
fn arrange(profiles: Vec<Profile>, query: &ListQuery, sort: &SortState) -> Vec<Profile> {
    let role = query.filter().and_then(|f| f.parse::<UserRole>().ok());
    let mut profiles: Vec<Profile> = filter_by_search(profiles, query.search())
        .into_iter()
        .filter(|p| role.is_none_or(|r| p.role == r))
        .collect();
    sort_items(&mut profiles, sort.direction, |a, b| match sort.column.as_str() {
        "email" => compare_text(&a.email, &b.email),
        "name" => compare_text(a.display_name(), b.display_name()),
        "role" => a.role.as_str().cmp(b.role.as_str()),
        "status" => a.status.as_str().cmp(b.status.as_str()),
        "kyc_status" => a.kyc_status.as_str().cmp(b.kyc_status.as_str()),
        _ => a.created_at.cmp(&b.created_at),
    });
    profiles
}

async fn load(state: &AppState) -> std::result::Result<Vec<Profile>, BackendError> {
    state
        .backend()
        .select(
            tables::PROFILES,
            &TableQuery::new().order("created_at", SortDirection::Desc),
            Credential::Service,
        )
        .await
}

/// GET /users
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(query): Query<ListQuery>,
) -> UsersTemplate {
    let sort = TABLE.sort_state(&query);
    let (success, mut error) = banners(query.success.as_deref(), query.error.as_deref());

    let (users, total) = match load(&state).await {
        Ok(profiles) => {
            let total = profiles.len();
            (arrange(profiles, &query, &sort), total)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load users");
            error = Some(e.user_message());
            (Vec::new(), 0)
        }
    };

    UsersTemplate {
        admin: AdminView::from(&admin),
        current_path: BASE,
        table: TABLE.view(&query, &sort, users.len(), total),
        users,
        roles: UserRole::ALL,
        statuses: AccountStatus::ALL,
        success,
        error,
    }
}

/// GET /users/export.csv
async fn export(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let sort = TABLE.sort_state(&query);
    let users = arrange(load(&state).await?, &query, &sort);
    tracing::info!(admin = %admin.email, rows = users.len(), "Exported users");
    Ok(csv_response("users.csv", to_csv(&users)))
}

/// Patch one profile; `Ok(false)` when no row matched.
async fn patch_profile(
    state: &AppState,
    id: UserId,
    patch: &serde_json::Value,
) -> std::result::Result<bool, BackendError> {
    let updated: Vec<Profile> = state
        .backend()
        .update(
            tables::PROFILES,
            &TableQuery::new().eq("id", id),
            patch,
            Credential::Service,
        )
        .await?;
    Ok(!updated.is_empty())
}

/// POST /users/{id}/role
async fn update_role(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<UserId>,
    Form(form): Form<RoleForm>,
) -> Redirect {
    let Ok(role) = form.role.parse::<UserRole>() else {
        return redirect_with(BASE, "error", "invalid");
    };

    match patch_profile(&state, id, &json!({ "role": role })).await {
        Ok(true) => {
            audit::record(
                state.backend(),
                audit::entry(&admin, "update_user_role", "user")
                    .target(id)
                    .details(json!({ "role": role })),
            )
            .await;
            redirect_with(BASE, "success", "role")
        }
        Ok(false) => redirect_with(BASE, "error", "missing"),
        Err(e) => {
            tracing::error!(error = %e, user_id = %id, "Failed to update role");
            redirect_with(BASE, "error", "backend")
        }
    }
}

/// POST /users/{id}/status
async fn update_status(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<UserId>,
    Form(form): Form<StatusForm>,
) -> Redirect {
    let Ok(status) = form.status.parse::<AccountStatus>() else {
        return redirect_with(BASE, "error", "invalid");
    };

    match patch_profile(&state, id, &json!({ "status": status })).await {
        Ok(true) => {
            audit::record(
                state.backend(),
                audit::entry(&admin, "update_user_status", "user")
                    .target(id)
                    .details(json!({ "status": status })),
            )
            .await;
            redirect_with(BASE, "success", "status")
        }
        Ok(false) => redirect_with(BASE, "error", "missing"),
        Err(e) => {
            tracing::error!(error = %e, user_id = %id, "Failed to update status");
            redirect_with(BASE, "error", "backend")
        }
    }
}

/// POST /users/{id}/delete
async fn delete(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<UserId>,
) -> Redirect {
    let result = state
        .backend()
        .delete(
            tables::PROFILES,
            &TableQuery::new().eq("id", id),
            Credential::Service,
        )
        .await;

    match result {
        Ok(()) => {
            audit::record(
                state.backend(),
                audit::entry(&admin, "delete_user", "user").target(id),
            )
            .await;
            redirect_with(BASE, "success", "deleted")
        }
        Err(e) => {
            tracing::error!(error = %e, user_id = %id, "Failed to delete user");
            redirect_with(BASE, "error", "backend")
        }
    }
}
