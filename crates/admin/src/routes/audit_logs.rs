//! Audit log viewer and CSV export.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Query, State},
    response::Response,
    routing::get,
};
use drone_backend::{BackendError, Credential, TableQuery};
use drone_core::listing::{SortDirection, SortState, compare_text, filter_by_search, sort_items, to_csv};
use drone_core::models::{AuditLog, tables};

use super::{AdminView, banners, csv_response};
use crate::components::{DataTableConfig, FilterOption, ListQuery, TableColumn, TableFilter, TableView};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

const BASE: &str = "/audit-logs";

/// Most recent entries loaded per request.
pub const AUDIT_LOG_LIMIT: usize = 500;

/// Build the audit log router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(BASE, get(index))
        .route("/audit-logs/export.csv", get(export))
}

static TABLE: LazyLock<DataTableConfig> = LazyLock::new(|| {
    DataTableConfig::new(BASE)
        .column(TableColumn::sortable("created_at", "When"))
        .column(TableColumn::sortable("admin_email", "Admin"))
        .column(TableColumn::sortable("action", "Action"))
        .column(TableColumn::sortable("target_type", "Target"))
        .column(TableColumn::new("details", "Details"))
        .search_placeholder("Search admin, action, target...")
        .export("/audit-logs/export.csv")
        .default_sort("created_at", SortDirection::Desc)
});

#[derive(Template, WebTemplate)]
#[template(path = "audit_logs.html")]
pub struct AuditLogsTemplate {
    pub admin: AdminView,
    pub current_path: &'static str,
    pub logs: Vec<AuditLog>,
    pub table: TableView,
    pub error: Option<String>,
}

/// Filter options: every action present in `logs`, alphabetically.
fn action_filter(logs: &[AuditLog]) -> TableFilter {
    let actions: BTreeSet<&str> = logs.iter().map(|log| log.action.as_str()).collect();
    TableFilter::select(
        "actions",
        actions
            .into_iter()
            .map(|action| FilterOption::new(action, &action.replace('_', " ")))
            .collect(),
    )
}

/// Search, filter by action, then sort.
fn arrange(logs: Vec<AuditLog>, query: &ListQuery, sort: &SortState) -> Vec<AuditLog> {
    let action = query.filter();
    let mut logs: Vec<AuditLog> = filter_by_search(logs, query.search())
        .into_iter()
        .filter(|log| action.is_none_or(|a| log.action == a))
        .collect();
    sort_items(&mut logs, sort.direction, |a, b| match sort.column.as_str() {
        "admin_email" => compare_text(&a.admin_email, &b.admin_email),
        "action" => compare_text(&a.action, &b.action),
        "target_type" => compare_text(&a.target_type, &b.target_type),
        _ => a.created_at.cmp(&b.created_at),
    });
    logs
}

async fn load(state: &AppState) -> std::result::Result<Vec<AuditLog>, BackendError> {
    state
        .backend()
        .select(
            tables::AUDIT_LOGS,
            &TableQuery::new()
                .order("created_at", SortDirection::Desc)
                .limit(AUDIT_LOG_LIMIT),
            Credential::Service,
        )
        .await
}

/// GET /audit-logs
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(query): Query<ListQuery>,
) -> AuditLogsTemplate {
    let sort = TABLE.sort_state(&query);
    let (_, mut error) = banners(None, query.error.as_deref());

    let (logs, filter, total) = match load(&state).await {
        Ok(logs) => {
            let filter = action_filter(&logs);
            let total = logs.len();
            (arrange(logs, &query, &sort), filter, total)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load audit logs");
            error = Some(e.user_message());
            (Vec::new(), action_filter(&[]), 0)
        }
    };

    let table = TABLE.clone().filter(filter).view(&query, &sort, logs.len(), total);

    AuditLogsTemplate {
        admin: AdminView::from(&admin),
        current_path: BASE,
        logs,
        table,
        error,
    }
}

/// GET /audit-logs/export.csv
async fn export(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let sort = TABLE.sort_state(&query);
    let logs = arrange(load(&state).await?, &query, &sort);
    tracing::info!(admin = %admin.email, rows = logs.len(), "Exported audit log");
    Ok(csv_response("audit-log.csv", to_csv(&logs)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{Duration, Utc};
    use drone_core::AuditLogId;
    use serde_json::json;

    use super::*;

    fn log(action: &str, target_type: &str, age_minutes: i64) -> AuditLog {
        AuditLog {
            id: AuditLogId::generate(),
            admin_email: "ops@dronecapital.io".to_string(),
            action: action.to_string(),
            target_type: target_type.to_string(),
            target_id: None,
            details: json!({ "note": "said \"hi\"" }),
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    fn logs() -> Vec<AuditLog> {
        vec![
            log("update_user_role", "user", 5),
            log("approve_kyc", "kyc_session", 1),
            log("update_user_role", "user", 10),
        ]
    }

    #[test]
    fn test_action_filter_lists_distinct_actions() {
        let filter = action_filter(&logs());
        let values: Vec<&str> = filter.options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, ["approve_kyc", "update_user_role"]);
        assert_eq!(filter.options[1].label, "update user role");
    }

    #[test]
    fn test_filtered_export_has_header_plus_one_row_per_entry() {
        let query = ListQuery {
            filter: Some("update_user_role".to_string()),
            ..ListQuery::default()
        };
        let sort = TABLE.sort_state(&query);
        let arranged = arrange(logs(), &query, &sort);
        assert_eq!(arranged.len(), 2);

        let csv = to_csv(&arranged);
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains(r#""{""note"":""said \""hi\""""}""#));
    }
}
