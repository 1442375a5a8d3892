//! Status enums for the rows stored in the backend.
//!
//! Every enum serializes as the lowercase string stored in the database and
//! round-trips through `Display`/`FromStr` so it can be bound from forms and
//! query strings.

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    /// Human name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Implements `as_str`, `label`, `ALL`, `Display`, and `FromStr` for a fieldless enum.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => ($value:literal, $label:literal)),+ $(,)? }) => {
        impl $name {
            /// Every variant, in display order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The value stored in the database.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }

            /// Human-readable label for templates.
            #[must_use]
            pub const fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $(v if v.eq_ignore_ascii_case($value) => Ok(Self::$variant),)+
                    other => Err(ParseStatusError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Role stored on a user's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Investor,
    Admin,
}

string_enum!(UserRole, "user role", {
    Investor => ("investor", "Investor"),
    Admin => ("admin", "Admin"),
});

/// Whether an account may sign in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
}

string_enum!(AccountStatus, "account status", {
    Active => ("active", "Active"),
    Suspended => ("suspended", "Suspended"),
});

/// Identity-verification state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    #[default]
    NotStarted,
    Pending,
    Approved,
    Rejected,
}

string_enum!(KycStatus, "KYC status", {
    NotStarted => ("not_started", "Not started"),
    Pending => ("pending", "Pending review"),
    Approved => ("approved", "Approved"),
    Rejected => ("rejected", "Rejected"),
});

impl KycStatus {
    /// Whether the investor may purchase tokens.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Lifecycle of a contract agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    #[default]
    Pending,
    Uploaded,
    Signed,
    Rejected,
}

string_enum!(ContractStatus, "contract status", {
    Pending => ("pending", "Awaiting upload"),
    Uploaded => ("uploaded", "Uploaded"),
    Signed => ("signed", "Signed"),
    Rejected => ("rejected", "Rejected"),
});

/// Document library category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Whitepaper,
    Legal,
    Report,
    Statement,
    #[default]
    Other,
}

string_enum!(DocumentCategory, "document category", {
    Whitepaper => ("whitepaper", "Whitepaper"),
    Legal => ("legal", "Legal"),
    Report => ("report", "Report"),
    Statement => ("statement", "Statement"),
    Other => ("other", "Other"),
});

/// What a wallet transaction represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    #[default]
    Purchase,
    Adjustment,
    Transfer,
}

string_enum!(TransactionKind, "transaction kind", {
    Purchase => ("purchase", "Purchase"),
    Adjustment => ("adjustment", "Adjustment"),
    Transfer => ("transfer", "Transfer"),
});

/// How a purchase was paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Card,
    Crypto,
    Manual,
}

string_enum!(PaymentMethod, "payment method", {
    Card => ("card", "Card"),
    Crypto => ("crypto", "Crypto"),
    Manual => ("manual", "Manual"),
});

/// Settlement state of a wallet transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

string_enum!(TransactionStatus, "transaction status", {
    Pending => ("pending", "Pending"),
    Completed => ("completed", "Completed"),
    Failed => ("failed", "Failed"),
});

/// Cryptocurrencies accepted by the placeholder crypto flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CryptoCurrency {
    Btc,
    #[default]
    Eth,
    Usdt,
}

string_enum!(CryptoCurrency, "currency", {
    Btc => ("BTC", "Bitcoin"),
    Eth => ("ETH", "Ethereum"),
    Usdt => ("USDT", "Tether (ERC-20)"),
});
