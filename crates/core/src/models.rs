//! Shapes of the rows stored in the backend.
//!
//! The backend owns validation and integrity; these structs exist so the web
//! crates can bind forms and render templates with typed fields. Field names
//! match the column names.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::listing::{CsvRow, Searchable};
use crate::types::{
    AccountStatus, AuditLogId, ContractId, ContractStatus, CryptoCurrency, DocumentCategory,
    DocumentId, InvestmentId, KycSessionId, KycStatus, PaymentMethod, TokenAmount, TransactionId,
    TransactionKind, TransactionStatus, UsdAmount, UserId, UserRole,
};

/// Table names in the backend.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const KYC_SESSIONS: &str = "kyc_sessions";
    pub const TOKEN_HOLDERS: &str = "token_holders";
    pub const WALLET_TRANSACTIONS: &str = "wallet_transactions";
    pub const INVESTMENTS: &str = "investments";
    pub const AUDIT_LOGS: &str = "admin_audit_logs";
    pub const DOCUMENTS: &str = "documents";
    pub const CONTRACT_AGREEMENTS: &str = "contract_agreements";
}

/// Remote procedure names in the backend.
pub mod rpc {
    pub const PLATFORM_STATS: &str = "get_platform_stats";
    pub const DASHBOARD_STATS: &str = "get_admin_dashboard_stats";
    pub const UPDATE_INVESTMENT: &str = "update_investment";
    pub const LOG_ADMIN_ACTION: &str = "log_admin_action";
    pub const ADJUST_TOKEN_BALANCE: &str = "adjust_token_balance";
    pub const UPDATE_CONTRACT_STATUS: &str = "update_contract_status";
}

/// Object storage bucket names.
pub mod buckets {
    pub const DOCUMENTS: &str = "documents";
    pub const CONTRACTS: &str = "contracts";
    pub const KYC_DOCUMENTS: &str = "kyc-documents";
}

/// A user's profile row (one per auth user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub kyc_status: KycStatus,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Name to show in tables, falling back to the email address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl Searchable for Profile {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.email.as_str()),
            Cow::Borrowed(self.full_name.as_deref().unwrap_or_default()),
            Cow::Borrowed(self.role.as_str()),
            Cow::Borrowed(self.status.as_str()),
        ]
    }
}

impl CsvRow for Profile {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "email",
        "full_name",
        "role",
        "status",
        "kyc_status",
        "created_at",
    ];

    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.email.clone(),
            self.full_name.clone().unwrap_or_default(),
            self.role.to_string(),
            self.status.to_string(),
            self.kyc_status.to_string(),
            self.created_at.to_rfc3339(),
        ]
    }
}

/// An identity-verification attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KycSession {
    pub id: KycSessionId,
    pub user_id: UserId,
    pub status: KycStatus,
    pub full_name: String,
    pub country: String,
    pub document_type: String,
    #[serde(default)]
    pub document_path: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Searchable for KycSession {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.full_name.as_str()),
            Cow::Borrowed(self.country.as_str()),
            Cow::Borrowed(self.document_type.as_str()),
            Cow::Owned(self.user_id.to_string()),
        ]
    }
}

/// A user's token balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenHolder {
    pub user_id: UserId,
    pub balance: TokenAmount,
    pub total_invested_usd: UsdAmount,
    pub updated_at: DateTime<Utc>,
}

impl TokenHolder {
    /// An empty balance for users who have never purchased.
    #[must_use]
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            balance: TokenAmount::ZERO,
            total_invested_usd: UsdAmount::ZERO,
            updated_at: Utc::now(),
        }
    }
}

/// A purchase, adjustment, or transfer of tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub amount_usd: UsdAmount,
    pub token_amount: TokenAmount,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub currency: Option<CryptoCurrency>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// Columns written when recording a new wallet transaction.
#[derive(Debug, Clone, Serialize)]
pub struct NewWalletTransaction {
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub amount_usd: UsdAmount,
    pub token_amount: TokenAmount,
    pub payment_method: PaymentMethod,
    pub currency: Option<CryptoCurrency>,
    pub tx_hash: Option<String>,
    pub status: TransactionStatus,
}

/// An investment recorded against a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investment {
    pub id: InvestmentId,
    pub user_id: UserId,
    pub amount_usd: UsdAmount,
    pub tokens: TokenAmount,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// One row of the admin audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: AuditLogId,
    pub admin_email: String,
    pub action: String,
    pub target_type: String,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    /// Details rendered as compact JSON, empty when there are none.
    #[must_use]
    pub fn details_text(&self) -> String {
        match &self.details {
            serde_json::Value::Null => String::new(),
            serde_json::Value::Object(map) if map.is_empty() => String::new(),
            other => other.to_string(),
        }
    }
}

impl Searchable for AuditLog {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.admin_email.as_str()),
            Cow::Borrowed(self.action.as_str()),
            Cow::Borrowed(self.target_type.as_str()),
            Cow::Borrowed(self.target_id.as_deref().unwrap_or_default()),
            Cow::Owned(self.details_text()),
        ]
    }
}

impl CsvRow for AuditLog {
    const HEADERS: &'static [&'static str] = &[
        "created_at",
        "admin_email",
        "action",
        "target_type",
        "target_id",
        "details",
    ];

    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.created_at.to_rfc3339(),
            self.admin_email.clone(),
            self.action.clone(),
            self.target_type.clone(),
            self.target_id.clone().unwrap_or_default(),
            self.details_text(),
        ]
    }
}

/// Parameters of the `log_admin_action` procedure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    #[serde(rename = "p_admin_email")]
    pub admin_email: String,
    #[serde(rename = "p_action")]
    pub action: String,
    #[serde(rename = "p_target_type")]
    pub target_type: String,
    #[serde(rename = "p_target_id")]
    pub target_id: Option<String>,
    #[serde(rename = "p_details")]
    pub details: serde_json::Value,
}

impl AuditEntry {
    #[must_use]
    pub fn new(
        admin_email: impl Into<String>,
        action: impl Into<String>,
        target_type: impl Into<String>,
    ) -> Self {
        Self {
            admin_email: admin_email.into(),
            action: action.into(),
            target_type: target_type.into(),
            target_id: None,
            details: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    #[must_use]
    pub fn target(mut self, id: impl ToString) -> Self {
        self.target_id = Some(id.to_string());
        self
    }

    #[must_use]
    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// A file in the document library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// `None` for platform-wide documents.
    #[serde(default)]
    pub owner_id: Option<UserId>,
    pub title: String,
    #[serde(default)]
    pub category: DocumentCategory,
    pub storage_path: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(default)]
    pub is_public: bool,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Whether `user` may see and download this document.
    #[must_use]
    pub fn is_visible_to(&self, user: UserId) -> bool {
        self.is_public || self.owner_id == Some(user)
    }

    /// Human-readable file size (`12.4 KB`).
    #[must_use]
    pub fn size_display(&self) -> String {
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
        #[allow(clippy::cast_precision_loss)] // display only
        let mut size = self.size_bytes.max(0) as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        let suffix = UNITS.get(unit).copied().unwrap_or("B");
        if unit == 0 {
            format!("{size:.0} {suffix}")
        } else {
            format!("{size:.1} {suffix}")
        }
    }
}

impl Searchable for Document {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.title.as_str()),
            Cow::Borrowed(self.file_name.as_str()),
            Cow::Borrowed(self.category.label()),
        ]
    }
}

impl CsvRow for Document {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "title",
        "category",
        "file_name",
        "size_bytes",
        "is_public",
        "uploaded_at",
    ];

    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.category.to_string(),
            self.file_name.clone(),
            self.size_bytes.to_string(),
            self.is_public.to_string(),
            self.uploaded_at.to_rfc3339(),
        ]
    }
}

/// A contract an investor must sign and upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractAgreement {
    pub id: ContractId,
    pub user_id: UserId,
    pub contract_type: String,
    pub status: ContractStatus,
    #[serde(default)]
    pub storage_path: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Searchable for ContractAgreement {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.contract_type.as_str()),
            Cow::Borrowed(self.status.label()),
            Cow::Borrowed(self.file_name.as_deref().unwrap_or_default()),
            Cow::Owned(self.user_id.to_string()),
        ]
    }
}

/// Public figures shown on the landing page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformStats {
    #[serde(default)]
    pub total_investors: i64,
    #[serde(default)]
    pub total_raised_usd: UsdAmount,
    #[serde(default)]
    pub tokens_issued: TokenAmount,
}

/// Figures shown on the admin dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_users: i64,
    #[serde(default)]
    pub active_investors: i64,
    #[serde(default)]
    pub pending_kyc: i64,
    #[serde(default)]
    pub pending_contracts: i64,
    #[serde(default)]
    pub total_raised_usd: UsdAmount,
    #[serde(default)]
    pub tokens_issued: TokenAmount,
    #[serde(default)]
    pub documents: i64,
}
