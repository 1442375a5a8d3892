//! Token holders and manual balance adjustments.

use std::borrow::Cow;
use std::sync::LazyLock;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use drone_backend::{Credential, TableQuery};
use drone_core::listing::{
    Searchable, SortDirection, SortState, compare_text, filter_by_search, sort_items,
};
use drone_core::models::{Profile, TokenHolder, rpc, tables};
use drone_core::{TokenAmount, UsdAmount, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{AdminView, banners, redirect_with};
use crate::components::{DataTableConfig, ListQuery, TableColumn, TableView};
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::services::audit;
use crate::state::AppState;

const BASE: &str = "/tokens";

/// Build the tokens router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(BASE, get(index))
        .route("/tokens/adjust", post(adjust))
}

static TABLE: LazyLock<DataTableConfig> = LazyLock::new(|| {
    DataTableConfig::new(BASE)
        .column(TableColumn::sortable("email", "Investor"))
        .column(TableColumn::sortable("balance", "Balance"))
        .column(TableColumn::sortable("invested", "Invested"))
        .column(TableColumn::sortable("updated_at", "Updated"))
        .search_placeholder("Search investor email...")
        .default_sort("balance", SortDirection::Desc)
});

/// A holder with the investor's email.
#[derive(Debug, Clone)]
pub struct HolderRow {
    pub user_id: UserId,
    pub email: String,
    pub balance: TokenAmount,
    pub total_invested_usd: UsdAmount,
    pub updated_at: DateTime<Utc>,
}

impl Searchable for HolderRow {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.email.as_str()),
            Cow::Owned(self.user_id.to_string()),
        ]
    }
}

/// An investor that can be picked in the adjust form.
#[derive(Debug, Clone)]
pub struct InvestorOption {
    pub user_id: UserId,
    pub email: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "tokens.html")]
pub struct TokensTemplate {
    pub admin: AdminView,
    pub current_path: &'static str,
    pub holders: Vec<HolderRow>,
    pub investors: Vec<InvestorOption>,
    pub table: TableView,
    pub success: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustForm {
    pub user_id: String,
    pub delta: String,
    pub reason: String,
}

/// Parameters of `adjust_token_balance`.
#[derive(Debug, PartialEq, Eq, Serialize)]
struct AdjustParams {
    p_user_id: UserId,
    p_delta: Decimal,
    p_reason: String,
}

impl AdjustForm {
    /// Validate the form; `Err` carries the banner code.
    fn params(&self) -> Result<AdjustParams, &'static str> {
        let user_id = self.user_id.trim().parse::<UserId>().map_err(|_| "invalid")?;
        let delta = self
            .delta
            .trim()
            .replace(',', "")
            .parse::<Decimal>()
            .map_err(|_| "delta")?;
        if delta.is_zero() {
            return Err("delta");
        }
        let reason = self.reason.trim();
        if reason.is_empty() {
            return Err("reason");
        }

        Ok(AdjustParams {
            p_user_id: user_id,
            p_delta: delta,
            p_reason: reason.to_string(),
        })
    }
}

/// Join holders to profile emails.
fn join(holders: Vec<TokenHolder>, profiles: &[Profile]) -> Vec<HolderRow> {
    holders
        .into_iter()
        .map(|holder| HolderRow {
            email: profiles
                .iter()
                .find(|p| p.id == holder.user_id)
                .map(|p| p.email.clone())
                .unwrap_or_default(),
            user_id: holder.user_id,
            balance: holder.balance,
            total_invested_usd: holder.total_invested_usd,
            updated_at: holder.updated_at,
        })
        .collect()
}

fn arrange(rows: Vec<HolderRow>, query: &ListQuery, sort: &SortState) -> Vec<HolderRow> {
    let mut rows = filter_by_search(rows, query.search());
    sort_items(&mut rows, sort.direction, |a, b| match sort.column.as_str() {
        "email" => compare_text(&a.email, &b.email),
        "invested" => a.total_invested_usd.cmp(&b.total_invested_usd),
        "updated_at" => a.updated_at.cmp(&b.updated_at),
        _ => a.balance.cmp(&b.balance),
    });
    rows
}

/// GET /tokens
async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(query): Query<ListQuery>,
) -> TokensTemplate {
    let sort = TABLE.sort_state(&query);
    let (success, mut error) = banners(query.success.as_deref(), query.error.as_deref());

    let all_holders = TableQuery::new();
    let by_email = TableQuery::new().order("email", SortDirection::Asc);
    let (holders, profiles) = tokio::join!(
        state.backend().select::<TokenHolder>(
            tables::TOKEN_HOLDERS,
            &all_holders,
            Credential::Service,
        ),
        state.backend().select::<Profile>(
            tables::PROFILES,
            &by_email,
            Credential::Service,
        ),
    );

    let (holders, investors, total) = match (holders, profiles) {
        (Ok(holders), Ok(profiles)) => {
            let total = holders.len();
            let rows = arrange(join(holders, &profiles), &query, &sort);
            let investors = profiles
                .into_iter()
                .map(|p| InvestorOption {
                    user_id: p.id,
                    email: p.email,
                })
                .collect();
            (rows, investors, total)
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "Failed to load token holders");
            error = Some(e.user_message());
            (Vec::new(), Vec::new(), 0)
        }
    };

    TokensTemplate {
        admin: AdminView::from(&admin),
        current_path: BASE,
        table: TABLE.view(&query, &sort, holders.len(), total),
        holders,
        investors,
        success,
        error,
    }
}

/// POST /tokens/adjust
async fn adjust(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Form(form): Form<AdjustForm>,
) -> Redirect {
    let params = match form.params() {
        Ok(params) => params,
        Err(code) => return redirect_with(BASE, "error", code),
    };

    if let Err(e) = state
        .backend()
        .rpc_void(rpc::ADJUST_TOKEN_BALANCE, &params, Credential::Service)
        .await
    {
        tracing::error!(error = %e, user_id = %params.p_user_id, "Failed to adjust token balance");
        return redirect_with(BASE, "error", "backend");
    }

    audit::record(
        state.backend(),
        audit::entry(&admin, "adjust_tokens", "user")
            .target(params.p_user_id)
            .details(json!({ "delta": params.p_delta, "reason": params.p_reason })),
    )
    .await;
    tracing::info!(user_id = %params.p_user_id, delta = %params.p_delta, "Token balance adjusted");
    redirect_with(BASE, "success", "adjusted")
}
