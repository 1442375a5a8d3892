//! Investor portal calls.
//!
//! Every request is made with the investor's own access token, so the
//! backend's row-level security and the functions' ownership checks apply.

use std::time::Duration;

use chrono::{DateTime, Utc};
use drone_backend::{BackendClient, BackendError, Credential, TableQuery, UploadedFile};
use drone_core::listing::SortDirection;
use drone_core::models::{
    ContractAgreement, Document, Investment, KycSession, TokenHolder, WalletTransaction, buckets,
    tables,
};
use drone_core::payment::CryptoVerification;
use drone_core::{
    ContractId, CryptoCurrency, DocumentId, KycStatus, TokenAmount, TokenPrice, UsdAmount,
};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use crate::models::CurrentInvestor;

/// Function names.
mod function {
    pub const CONTRACTS: &str = "contract-manager";
    pub const KYC: &str = "kyc-api";
    pub const PAYMENTS: &str = "payment-api";
    pub const TOKENS: &str = "token-api";
}

/// How long a document download link stays valid.
const DOCUMENT_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Latest verification state.
#[derive(Debug, Clone, Deserialize)]
pub struct KycOverview {
    pub status: KycStatus,
    #[serde(default)]
    pub session: Option<KycSession>,
}

/// Identity details from the KYC form.
#[derive(Debug, Clone, Serialize)]
pub struct KycSubmission {
    pub full_name: String,
    pub country: String,
    pub document_type: String,
}

/// A hosted card checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub checkout_url: String,
    pub reference: String,
    pub amount_usd: UsdAmount,
    pub tokens: TokenAmount,
}

/// A quoted crypto deposit, kept in the session until it is verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositAddress {
    pub currency: CryptoCurrency,
    pub address: String,
    pub amount_usd: UsdAmount,
    pub tokens: TokenAmount,
    pub token_price: TokenPrice,
    pub expires_at: DateTime<Utc>,
}

impl DepositAddress {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

#[derive(Debug, Deserialize)]
struct DownloadLink {
    url: String,
}

/// Portal operations for one signed-in investor.
pub struct PortalClient<'a> {
    backend: &'a BackendClient,
    investor: &'a CurrentInvestor,
}

impl<'a> PortalClient<'a> {
    #[must_use]
    pub const fn new(backend: &'a BackendClient, investor: &'a CurrentInvestor) -> Self {
        Self { backend, investor }
    }

    fn credential(&self) -> Credential<'a> {
        Credential::User(&self.investor.access_token)
    }

    /// Token balance (zero when nothing has been bought yet).
    ///
    /// # Errors
    ///
    /// Returns the function's error.
    pub async fn balance(&self) -> Result<TokenHolder, BackendError> {
        self.backend
            .invoke_get(function::TOKENS, "balance", &[], self.credential())
            .await
    }

    /// Wallet transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns the function's error.
    pub async fn transactions(&self) -> Result<Vec<WalletTransaction>, BackendError> {
        self.backend
            .invoke_get(function::TOKENS, "transactions", &[], self.credential())
            .await
    }

    /// Investments, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the table read fails.
    pub async fn investments(&self) -> Result<Vec<Investment>, BackendError> {
        let query = TableQuery::new()
            .eq("user_id", self.investor.user_id)
            .order("created_at", SortDirection::Desc);
        self.backend
            .select(tables::INVESTMENTS, &query, self.credential())
            .await
    }

    /// # Errors
    ///
    /// Returns the function's error.
    pub async fn kyc_status(&self) -> Result<KycOverview, BackendError> {
        self.backend
            .invoke_get(function::KYC, "status", &[], self.credential())
            .await
    }

    /// Submit identity details for verification.
    ///
    /// # Errors
    ///
    /// Returns the function's error, including missing fields.
    #[instrument(skip_all, fields(user_id = %self.investor.user_id))]
    pub async fn submit_kyc(&self, submission: &KycSubmission) -> Result<KycSession, BackendError> {
        self.backend
            .invoke(
                function::KYC,
                "submit",
                Method::POST,
                Some(submission),
                self.credential(),
            )
            .await
    }

    /// Public documents plus the investor's own.
    ///
    /// # Errors
    ///
    /// Returns error if the table read fails.
    pub async fn documents(&self) -> Result<Vec<Document>, BackendError> {
        let query = TableQuery::new().order("uploaded_at", SortDirection::Desc);
        let mut documents: Vec<Document> = self
            .backend
            .select(tables::DOCUMENTS, &query, self.credential())
            .await?;
        documents.retain(|doc| doc.is_visible_to(self.investor.user_id));
        Ok(documents)
    }

    /// A signed download link for a visible document.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] if the document does not exist or
    /// belongs to someone else.
    #[instrument(skip(self), fields(user_id = %self.investor.user_id))]
    pub async fn document_url(&self, id: DocumentId) -> Result<String, BackendError> {
        let document = self
            .backend
            .select_optional::<Document>(
                tables::DOCUMENTS,
                &TableQuery::new().eq("id", id),
                self.credential(),
            )
            .await?
            .filter(|doc| doc.is_visible_to(self.investor.user_id))
            .ok_or_else(|| BackendError::NotFound("Document not found".to_string()))?;

        self.backend
            .create_signed_url(
                buckets::DOCUMENTS,
                &document.storage_path,
                DOCUMENT_URL_TTL,
                self.credential(),
            )
            .await
    }

    /// # Errors
    ///
    /// Returns the function's error.
    pub async fn contracts(&self) -> Result<Vec<ContractAgreement>, BackendError> {
        self.backend
            .invoke_get(function::CONTRACTS, "list", &[], self.credential())
            .await
    }

    /// Forward a signed agreement to the contract manager.
    ///
    /// # Errors
    ///
    /// Returns the function's error, or a transport error if the content
    /// type is not a valid MIME type.
    #[instrument(skip(self, file), fields(user_id = %self.investor.user_id, file_name = %file.file_name))]
    pub async fn upload_contract(
        &self,
        id: ContractId,
        file: UploadedFile,
    ) -> Result<ContractAgreement, BackendError> {
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = Form::new()
            .text("contract_id", id.to_string())
            .part("file", part);
        self.backend
            .invoke_multipart(function::CONTRACTS, "upload", form, self.credential())
            .await
    }

    /// # Errors
    ///
    /// Returns the function's error, e.g. when nothing has been uploaded.
    pub async fn contract_url(&self, id: ContractId) -> Result<String, BackendError> {
        let id = id.to_string();
        let link: DownloadLink = self
            .backend
            .invoke_get(
                function::CONTRACTS,
                "download",
                &[("contract_id", id.as_str())],
                self.credential(),
            )
            .await?;
        Ok(link.url)
    }

    /// Start a hosted card checkout.
    ///
    /// # Errors
    ///
    /// Returns the function's error, including amounts below the minimum.
    #[instrument(skip(self), fields(user_id = %self.investor.user_id))]
    pub async fn checkout(&self, amount: UsdAmount) -> Result<CheckoutSession, BackendError> {
        let body = json!({ "amount_usd": amount.amount().to_string() });
        self.backend
            .invoke(
                function::PAYMENTS,
                "checkout",
                Method::POST,
                Some(&body),
                self.credential(),
            )
            .await
    }

    /// Quote a deposit address.
    ///
    /// # Errors
    ///
    /// Returns the function's error.
    #[instrument(skip(self), fields(user_id = %self.investor.user_id))]
    pub async fn crypto_address(
        &self,
        currency: CryptoCurrency,
        amount: UsdAmount,
    ) -> Result<DepositAddress, BackendError> {
        let body = json!({
            "currency": currency.as_str(),
            "amount_usd": amount.amount().to_string(),
        });
        self.backend
            .invoke(
                function::PAYMENTS,
                "crypto/address",
                Method::POST,
                Some(&body),
                self.credential(),
            )
            .await
    }

    /// Confirm a crypto transfer. Waits for the function's confirmation delay.
    ///
    /// # Errors
    ///
    /// Returns the function's error.
    #[instrument(skip(self, verification), fields(user_id = %self.investor.user_id))]
    pub async fn verify_crypto(
        &self,
        verification: &CryptoVerification,
    ) -> Result<WalletTransaction, BackendError> {
        let body = json!({
            "tx_hash": verification.tx_hash,
            "currency": verification.currency.as_str(),
            "amount_usd": verification.amount.amount().to_string(),
        });
        self.backend
            .invoke(
                function::PAYMENTS,
                "crypto/verify",
                Method::POST,
                Some(&body),
                self.credential(),
            )
            .await
    }
}
