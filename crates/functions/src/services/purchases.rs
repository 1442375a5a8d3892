//! Recording completed token purchases.

use drone_backend::{BackendClient, BackendError, Credential};
use drone_core::models::{NewWalletTransaction, WalletTransaction, rpc, tables};
use drone_core::{
    CryptoCurrency, PaymentMethod, TokenPrice, TransactionKind, TransactionStatus, UsdAmount,
    UserId,
};
use serde_json::json;
use tracing::instrument;

/// A settled purchase waiting to be written.
#[derive(Debug, Clone)]
pub struct Purchase {
    pub user_id: UserId,
    pub amount: UsdAmount,
    pub method: PaymentMethod,
    pub currency: Option<CryptoCurrency>,
    pub reference: Option<String>,
}

/// Write a completed purchase: one `wallet_transactions` row, then the
/// `update_investment` procedure that moves the holder's balance.
///
/// The two writes are not atomic. If the procedure fails the transaction
/// row stays behind and the error is returned.
///
/// # Errors
///
/// Returns the first backend failure.
#[instrument(skip(backend, price, purchase), fields(user_id = %purchase.user_id, amount = %purchase.amount))]
pub async fn record(
    backend: &BackendClient,
    price: TokenPrice,
    purchase: Purchase,
) -> Result<WalletTransaction, BackendError> {
    let tokens = price.tokens_for(purchase.amount);

    let row = NewWalletTransaction {
        user_id: purchase.user_id,
        kind: TransactionKind::Purchase,
        amount_usd: purchase.amount,
        token_amount: tokens,
        payment_method: purchase.method,
        currency: purchase.currency,
        tx_hash: purchase.reference,
        status: TransactionStatus::Completed,
    };
    let transaction: WalletTransaction = backend
        .insert(tables::WALLET_TRANSACTIONS, &row, Credential::Service)
        .await?;

    backend
        .rpc_void(
            rpc::UPDATE_INVESTMENT,
            &json!({
                "p_user_id": purchase.user_id,
                "p_amount_usd": purchase.amount,
                "p_tokens": tokens,
            }),
            Credential::Service,
        )
        .await?;

    tracing::info!(transaction_id = %transaction.id, tokens = %tokens, "Purchase recorded");
    Ok(transaction)
}
