//! Token balances, transactions, price, and manual adjustments.

use axum::Json;
use axum::extract::State;
use drone_backend::{Credential, Envelope, TableQuery, audit};
use drone_core::listing::SortDirection;
use drone_core::models::{AuditEntry, TokenHolder, WalletTransaction, rpc, tables};
use drone_core::{TokenPrice, UsdAmount, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use crate::error::{FunctionError, Result};
use crate::extract::{JsonBody, required};
use crate::middleware::Caller;
use crate::state::AppState;

/// Most transactions returned in one call.
const TRANSACTION_LIMIT: usize = 100;

/// The caller's balance; zero for investors who never bought.
#[instrument(skip(state, caller), fields(user_id = %caller.id()))]
pub async fn balance(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Envelope<TokenHolder>>> {
    let holder = state
        .backend()
        .select_optional(
            tables::TOKEN_HOLDERS,
            &TableQuery::new().eq("user_id", caller.id()),
            Credential::Service,
        )
        .await?
        .unwrap_or_else(|| TokenHolder::empty(caller.id()));
    Ok(Json(Envelope::ok(holder)))
}

/// The caller's transactions, newest first.
#[instrument(skip(state, caller), fields(user_id = %caller.id()))]
pub async fn transactions(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Envelope<Vec<WalletTransaction>>>> {
    let rows = state
        .backend()
        .select(
            tables::WALLET_TRANSACTIONS,
            &TableQuery::new()
                .eq("user_id", caller.id())
                .order("created_at", SortDirection::Desc)
                .limit(TRANSACTION_LIMIT),
            Credential::Service,
        )
        .await?;
    Ok(Json(Envelope::ok(rows)))
}

#[derive(Debug, Serialize)]
pub struct PriceQuote {
    token: &'static str,
    price_usd: TokenPrice,
    min_investment_usd: UsdAmount,
}

/// The configured DRN price. Public.
pub async fn price(State(state): State<AppState>) -> Json<Envelope<PriceQuote>> {
    Json(Envelope::ok(PriceQuote {
        token: "DRN",
        price_usd: state.config().token_price,
        min_investment_usd: state.config().min_investment,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    user_id: UserId,
    delta: Decimal,
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Adjustment {
    user_id: UserId,
    delta: Decimal,
}

/// Add or remove tokens from a holder (admin).
#[instrument(skip(state, caller, body), fields(user_id = %caller.id()))]
pub async fn adjust(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<AdjustRequest>,
) -> Result<Json<Envelope<Adjustment>>> {
    caller.require_admin(&state).await?;

    let reason = required(body.reason.as_deref(), "reason")?;
    if body.delta.is_zero() {
        return Err(FunctionError::BadRequest("delta must not be zero".to_string()));
    }

    state
        .backend()
        .rpc_void(
            rpc::ADJUST_TOKEN_BALANCE,
            &json!({
                "p_user_id": body.user_id,
                "p_delta": body.delta,
                "p_reason": reason,
            }),
            Credential::Service,
        )
        .await?;

    audit::record(
        state.backend(),
        AuditEntry::new(caller.email(), "adjust_token_balance", "token_holder")
            .target(body.user_id)
            .details(json!({ "delta": body.delta, "reason": reason })),
    )
    .await;

    tracing::info!(target_user = %body.user_id, delta = %body.delta, "Token balance adjusted");
    Ok(Json(Envelope::ok(Adjustment {
        user_id: body.user_id,
        delta: body.delta,
    })))
}
