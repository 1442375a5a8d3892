//! Token purchases by card or crypto.
//!
//! Card purchases redirect to the hosted checkout and come back to
//! `/portal/invest/complete`. Crypto purchases quote a deposit address, keep
//! the quote in the session, and credit the tokens once the investor submits
//! a transaction hash.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use drone_core::models::WalletTransaction;
use drone_core::payment::{CryptoVerification, InvestmentRequest, PaymentFormError};
use drone_core::{CryptoCurrency, PaymentMethod, TokenPrice, UsdAmount};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireInvestor;
use crate::models::{CurrentInvestor, session_keys};
use crate::services::PortalClient;
use crate::services::portal::{CheckoutSession, DepositAddress};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InvestForm {
    #[serde(default)]
    pub amount_usd: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyForm {
    #[serde(default)]
    pub tx_hash: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvestQuery {
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteQuery {
    pub reference: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "portal/invest.html")]
pub struct InvestTemplate {
    pub investor_name: String,
    pub token_price: TokenPrice,
    pub min_investment: UsdAmount,
    pub currencies: &'static [CryptoCurrency],
    pub amount_usd: String,
    pub method: String,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "portal/crypto.html")]
pub struct CryptoTemplate {
    pub investor_name: String,
    pub deposit: DepositAddress,
    pub tx_hash: String,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "portal/complete.html")]
pub struct CompleteTemplate {
    pub investor_name: String,
    pub transaction: Option<WalletTransaction>,
    pub reference: Option<String>,
}

enum Started {
    Card(CheckoutSession),
    Crypto(DepositAddress),
}

const CURRENCIES: [CryptoCurrency; 3] = [
    CryptoCurrency::Btc,
    CryptoCurrency::Eth,
    CryptoCurrency::Usdt,
];

fn invest_page(
    state: &AppState,
    investor: &CurrentInvestor,
    amount_usd: String,
    method: String,
    error: Option<String>,
) -> InvestTemplate {
    InvestTemplate {
        investor_name: investor.display_name().to_string(),
        token_price: state.config().token_price,
        min_investment: state.config().min_investment,
        currencies: &CURRENCIES,
        amount_usd,
        method,
        error,
    }
}

fn query_error(code: &str) -> &'static str {
    match code {
        "expired" => "Your deposit quote has expired. Please start again.",
        "cancelled" => "The payment was cancelled.",
        _ => "Something went wrong. Please try again.",
    }
}

pub async fn form(
    State(state): State<AppState>,
    RequireInvestor(investor): RequireInvestor,
    Query(query): Query<InvestQuery>,
) -> impl IntoResponse {
    invest_page(
        &state,
        &investor,
        String::new(),
        PaymentMethod::Card.as_str().to_string(),
        query.error.as_deref().map(|c| query_error(c).to_string()),
    )
}

/// Validate the form, then start a card checkout or quote a deposit address.
pub async fn start(
    State(state): State<AppState>,
    RequireInvestor(investor): RequireInvestor,
    session: Session,
    Form(form): Form<InvestForm>,
) -> Result<Response> {
    let request = match InvestmentRequest::parse(
        &form.amount_usd,
        &form.method,
        form.currency.as_deref(),
        state.config().min_investment,
    ) {
        Ok(request) => request,
        Err(e) => {
            return Ok(
                invest_page(&state, &investor, form.amount_usd, form.method, Some(e.to_string()))
                    .into_response(),
            );
        }
    };

    let portal = PortalClient::new(state.backend(), &investor);
    let started = match (request.method, request.currency) {
        (PaymentMethod::Crypto, Some(currency)) => portal
            .crypto_address(currency, request.amount)
            .await
            .map(Started::Crypto),
        _ => portal.checkout(request.amount).await.map(Started::Card),
    };

    match started {
        Ok(Started::Crypto(deposit)) => {
            session
                .insert(session_keys::PENDING_CRYPTO, &deposit)
                .await?;
            tracing::info!(
                currency = %deposit.currency,
                amount = %deposit.amount_usd,
                "Crypto deposit quoted"
            );
            Ok(CryptoTemplate {
                investor_name: investor.display_name().to_string(),
                deposit,
                tx_hash: String::new(),
                error: None,
            }
            .into_response())
        }
        Ok(Started::Card(checkout)) => {
            tracing::info!(reference = %checkout.reference, "Redirecting to card checkout");
            Ok(Redirect::to(&checkout.checkout_url).into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to start payment");
            Ok(
                invest_page(&state, &investor, form.amount_usd, form.method, Some(e.user_message()))
                    .into_response(),
            )
        }
    }
}

/// Confirm the pending crypto deposit.
///
/// An empty hash is rejected here without calling the payment function.
pub async fn verify_crypto(
    State(state): State<AppState>,
    RequireInvestor(investor): RequireInvestor,
    session: Session,
    Form(form): Form<VerifyForm>,
) -> Result<Response> {
    let Some(deposit) = session
        .get::<DepositAddress>(session_keys::PENDING_CRYPTO)
        .await?
        .filter(|d| !d.is_expired())
    else {
        return Ok(Redirect::to("/portal/invest?error=expired").into_response());
    };

    let retry = |deposit: DepositAddress, tx_hash: String, error: String| {
        CryptoTemplate {
            investor_name: investor.display_name().to_string(),
            deposit,
            tx_hash,
            error: Some(error),
        }
        .into_response()
    };

    let verification = match CryptoVerification::parse(
        &form.tx_hash,
        deposit.currency.as_str(),
        &deposit.amount_usd.amount().to_string(),
        state.config().min_investment,
    ) {
        Ok(verification) => verification,
        Err(e @ PaymentFormError::MissingTransactionHash) => {
            return Ok(retry(deposit, String::new(), e.to_string()));
        }
        Err(e) => return Ok(retry(deposit, form.tx_hash, e.to_string())),
    };

    match PortalClient::new(state.backend(), &investor)
        .verify_crypto(&verification)
        .await
    {
        Ok(transaction) => {
            session
                .remove::<DepositAddress>(session_keys::PENDING_CRYPTO)
                .await?;
            tracing::info!(transaction_id = %transaction.id, "Crypto payment confirmed");
            Ok(CompleteTemplate {
                investor_name: investor.display_name().to_string(),
                transaction: Some(transaction),
                reference: None,
            }
            .into_response())
        }
        Err(e) => {
            tracing::warn!(error = %e, "Crypto verification failed");
            Ok(retry(deposit, verification.tx_hash, e.user_message()))
        }
    }
}

/// Return page after the hosted card checkout.
///
/// Tokens are credited when the processor's webhook arrives.
pub async fn complete(
    RequireInvestor(investor): RequireInvestor,
    Query(query): Query<CompleteQuery>,
) -> impl IntoResponse {
    CompleteTemplate {
        investor_name: investor.display_name().to_string(),
        transaction: None,
        reference: query.reference.filter(|r| !r.trim().is_empty()),
    }
}
