//! Payments: hosted card checkout, placeholder crypto flow, processor webhook.
//!
//! Nothing here touches a blockchain or settles money. Crypto "verification"
//! waits a fixed delay and accepts any non-empty transaction hash.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use drone_backend::Envelope;
use drone_core::models::WalletTransaction;
use drone_core::payment::{
    CryptoVerification, InvestmentRequest, PaymentFormError, checkout_url, payment_reference, placeholder_address,
};
use drone_core::{CryptoCurrency, PaymentMethod, TokenAmount, TokenPrice, UsdAmount, UserId};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{FunctionError, Result};
use crate::extract::JsonBody;
use crate::middleware::Caller;
use crate::services::purchases::{self, Purchase};
use crate::services::webhook;
use crate::state::AppState;

/// How long a placeholder deposit address is quoted for.
const ADDRESS_VALIDITY_MINUTES: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    amount_usd: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutSession {
    checkout_url: String,
    reference: String,
    amount_usd: UsdAmount,
    tokens: TokenAmount,
}

/// Build the hosted checkout URL for a card purchase.
#[instrument(skip(state, caller, body), fields(user_id = %caller.id()))]
pub async fn checkout(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<CheckoutRequest>,
) -> Result<Json<Envelope<CheckoutSession>>> {
    let config = state.config();
    let request = InvestmentRequest::parse(&body.amount_usd, "card", None, config.min_investment)?;

    let reference = payment_reference();
    let url = checkout_url(&config.card_checkout_url, request.amount, &reference);
    tracing::info!(%reference, amount = %request.amount, "Card checkout started");

    Ok(Json(Envelope::ok(CheckoutSession {
        checkout_url: url.to_string(),
        reference,
        amount_usd: request.amount,
        tokens: config.token_price.tokens_for(request.amount),
    })))
}

#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    #[serde(default)]
    currency: String,
    #[serde(default)]
    amount_usd: String,
}

#[derive(Debug, Serialize)]
pub struct DepositAddress {
    currency: CryptoCurrency,
    address: String,
    amount_usd: UsdAmount,
    tokens: TokenAmount,
    token_price: TokenPrice,
    expires_at: DateTime<Utc>,
}

/// Quote a placeholder deposit address.
#[instrument(skip(state, caller, body), fields(user_id = %caller.id()))]
pub async fn crypto_address(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<AddressRequest>,
) -> Result<Json<Envelope<DepositAddress>>> {
    let config = state.config();
    let request = InvestmentRequest::parse(
        &body.amount_usd,
        "crypto",
        Some(&body.currency),
        config.min_investment,
    )?;
    let currency = request
        .currency
        .ok_or_else(|| FunctionError::BadRequest("currency is required".to_string()))?;

    let address = placeholder_address(currency, &mut rand::rng());

    Ok(Json(Envelope::ok(DepositAddress {
        currency,
        address,
        amount_usd: request.amount,
        tokens: config.token_price.tokens_for(request.amount),
        token_price: config.token_price,
        expires_at: Utc::now() + Duration::minutes(ADDRESS_VALIDITY_MINUTES),
    })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    tx_hash: String,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    amount_usd: String,
}

/// "Confirm" a crypto transfer and credit the tokens.
///
/// An empty hash or an amount below the minimum is rejected before anything
/// is written.
#[instrument(skip(state, caller, body), fields(user_id = %caller.id()))]
pub async fn crypto_verify(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(body): JsonBody<VerifyRequest>,
) -> Result<Json<Envelope<WalletTransaction>>> {
    let verification = CryptoVerification::parse(
        &body.tx_hash,
        &body.currency,
        &body.amount_usd,
        state.config().min_investment,
    )?;

    tokio::time::sleep(state.config().crypto_confirmation_delay).await;

    let transaction = purchases::record(
        state.backend(),
        state.config().token_price,
        Purchase {
            user_id: caller.id(),
            amount: verification.amount,
            method: PaymentMethod::Crypto,
            currency: Some(verification.currency),
            reference: Some(verification.tx_hash),
        },
    )
    .await?;

    Ok(Json(Envelope::ok_with_message(
        transaction,
        "Payment confirmed",
    )))
}

/// Card processor notification body.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    event: String,
    reference: String,
    user_id: UserId,
    amount_usd: UsdAmount,
}

#[derive(Debug, Serialize)]
pub struct WebhookReceipt {
    event: String,
    recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction: Option<WalletTransaction>,
}

/// Record a completed card checkout.
///
/// The raw body must carry a valid `x-signature`. Events other than
/// `checkout.completed` are acknowledged and ignored.
#[instrument(skip_all)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Envelope<WebhookReceipt>>> {
    let signature = headers
        .get(webhook::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !webhook::verify(&state.config().webhook_secret, &body, signature) {
        tracing::warn!("Webhook signature rejected");
        return Err(FunctionError::Unauthorized);
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| FunctionError::BadRequest(format!("Invalid webhook body: {e}")))?;

    if event.event != "checkout.completed" {
        tracing::info!(event = %event.event, "Ignoring webhook event");
        return Ok(Json(Envelope::ok(WebhookReceipt {
            event: event.event,
            recorded: false,
            transaction: None,
        })));
    }
    let minimum = state.config().min_investment;
    if event.amount_usd < minimum {
        return Err(PaymentFormError::BelowMinimum { minimum }.into());
    }

    let transaction = purchases::record(
        state.backend(),
        state.config().token_price,
        Purchase {
            user_id: event.user_id,
            amount: event.amount_usd,
            method: PaymentMethod::Card,
            currency: None,
            reference: Some(event.reference),
        },
    )
    .await?;

    Ok(Json(Envelope::ok(WebhookReceipt {
        event: event.event,
        recorded: true,
        transaction: Some(transaction),
    })))
}
