//! Payment form validation.
//!
//! These checks run before any request leaves the portal, so a malformed form
//! never costs a round trip.

use rand::Rng;
use url::Url;

use crate::types::{AmountError, CryptoCurrency, PaymentMethod, UsdAmount};

/// Characters valid in the data part of a bech32 address.
const BECH32_CHARSET: &[u8] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const HEX_CHARSET: &[u8] = b"0123456789abcdef";

/// Reasons a payment form is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentFormError {
    #[error("Enter the transaction hash from your wallet")]
    MissingTransactionHash,
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),
    #[error("The minimum investment is {minimum}")]
    BelowMinimum { minimum: UsdAmount },
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),
    #[error("Unsupported payment method: {0}")]
    UnsupportedMethod(String),
}

/// Validate an investment amount against the configured minimum.
///
/// # Errors
///
/// Returns an error if the amount does not parse or is below `minimum`.
pub fn parse_investment_amount(
    input: &str,
    minimum: UsdAmount,
) -> Result<UsdAmount, PaymentFormError> {
    let amount = UsdAmount::parse(input)?;
    if amount < minimum {
        return Err(PaymentFormError::BelowMinimum { minimum });
    }
    Ok(amount)
}

/// A validated investment form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestmentRequest {
    pub amount: UsdAmount,
    pub method: PaymentMethod,
    pub currency: Option<CryptoCurrency>,
}

impl InvestmentRequest {
    /// Validate the amount and method fields of the investment form.
    ///
    /// Crypto payments require a currency; card payments ignore it. Manual
    /// payments are admin-only and rejected here.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn parse(
        amount: &str,
        method: &str,
        currency: Option<&str>,
        minimum: UsdAmount,
    ) -> Result<Self, PaymentFormError> {
        let method = match method.parse::<PaymentMethod>() {
            Ok(method @ (PaymentMethod::Card | PaymentMethod::Crypto)) => method,
            _ => return Err(PaymentFormError::UnsupportedMethod(method.trim().to_string())),
        };
        let amount = parse_investment_amount(amount, minimum)?;
        let currency = match method {
            PaymentMethod::Crypto => Some(parse_currency(currency.unwrap_or_default())?),
            _ => None,
        };
        Ok(Self {
            amount,
            method,
            currency,
        })
    }
}

/// A crypto payment the investor claims to have sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoVerification {
    pub tx_hash: String,
    pub currency: CryptoCurrency,
    pub amount: UsdAmount,
}

impl CryptoVerification {
    /// Validate the verification form.
    ///
    /// The transaction hash is checked first: an empty hash is rejected
    /// regardless of the other fields. Any other non-empty hash is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentFormError::MissingTransactionHash`] for an empty hash,
    /// otherwise the first currency or amount failure. Amounts below
    /// `minimum` fail the same way they do on the investment form.
    pub fn parse(
        tx_hash: &str,
        currency: &str,
        amount: &str,
        minimum: UsdAmount,
    ) -> Result<Self, PaymentFormError> {
        let tx_hash = tx_hash.trim();
        if tx_hash.is_empty() {
            return Err(PaymentFormError::MissingTransactionHash);
        }
        Ok(Self {
            tx_hash: tx_hash.to_string(),
            currency: parse_currency(currency)?,
            amount: parse_investment_amount(amount, minimum)?,
        })
    }
}

/// A well-shaped but fake deposit address for `currency`.
///
/// `0x` + 40 hex digits for ETH and USDT, `bc1q` + 38 bech32 characters for
/// BTC. Nothing is ever sent to these addresses.
pub fn placeholder_address<R: Rng + ?Sized>(currency: CryptoCurrency, rng: &mut R) -> String {
    let (prefix, charset, len) = match currency {
        CryptoCurrency::Btc => ("bc1q", BECH32_CHARSET, 38),
        CryptoCurrency::Eth | CryptoCurrency::Usdt => ("0x", HEX_CHARSET, 40),
    };
    let mut address = String::with_capacity(prefix.len() + len);
    address.push_str(prefix);
    for _ in 0..len {
        let idx = rng.random_range(0..charset.len());
        address.push(char::from(charset.get(idx).copied().unwrap_or(b'q')));
    }
    address
}

/// A fresh payment reference, e.g. `DRN-3F2A9C0B71D4`.
#[must_use]
pub fn payment_reference() -> String {
    let id: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(12)
        .collect();
    format!("DRN-{}", id.to_uppercase())
}

/// The hosted checkout URL for `amount`, tagged with `reference`.
#[must_use]
pub fn checkout_url(base: &Url, amount: UsdAmount, reference: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("amount", &format!("{:.2}", amount.amount()))
        .append_pair("currency", "USD")
        .append_pair("reference", reference);
    url
}

fn parse_currency(value: &str) -> Result<CryptoCurrency, PaymentFormError> {
    value
        .parse()
        .map_err(|_| PaymentFormError::UnsupportedCurrency(value.trim().to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn minimum() -> UsdAmount {
        UsdAmount::new(Decimal::new(100, 0))
    }

    #[test]
    fn test_empty_hash_is_rejected() {
        assert_eq!(
            CryptoVerification::parse("", "ETH", "250", minimum()),
            Err(PaymentFormError::MissingTransactionHash)
        );
        assert_eq!(
            CryptoVerification::parse("   ", "ETH", "250", minimum()),
            Err(PaymentFormError::MissingTransactionHash)
        );
    }

    #[test]
    fn test_empty_hash_wins_over_other_errors() {
        assert_eq!(
            CryptoVerification::parse("", "DOGE", "nope", minimum()),
            Err(PaymentFormError::MissingTransactionHash)
        );
    }

    #[test]
    fn test_any_non_empty_hash_is_accepted() {
        let verification =
            CryptoVerification::parse(" 0xabc ", "usdt", "250", minimum()).unwrap();
        assert_eq!(verification.tx_hash, "0xabc");
        assert_eq!(verification.currency, CryptoCurrency::Usdt);
    }

    #[test]
    fn test_unknown_currency() {
        assert_eq!(
            CryptoVerification::parse("0xabc", "DOGE", "250", minimum()),
            Err(PaymentFormError::UnsupportedCurrency("DOGE".to_string()))
        );
    }

    #[test]
    fn test_verification_enforces_minimum() {
        assert_eq!(
            CryptoVerification::parse("0xabc", "ETH", "0.01", minimum()),
            Err(PaymentFormError::BelowMinimum { minimum: minimum() })
        );
        assert!(CryptoVerification::parse("0xabc", "ETH", "100", minimum()).is_ok());
    }

    #[test]
    fn test_investment_below_minimum() {
        assert_eq!(
            parse_investment_amount("99.99", minimum()),
            Err(PaymentFormError::BelowMinimum { minimum: minimum() })
        );
        assert!(parse_investment_amount("100", minimum()).is_ok());
    }

    #[test]
    fn test_investment_request_card_ignores_currency() {
        let request = InvestmentRequest::parse("500", "card", Some("BTC"), minimum()).unwrap();
        assert_eq!(request.method, PaymentMethod::Card);
        assert_eq!(request.currency, None);
    }

    #[test]
    fn test_investment_request_crypto_requires_currency() {
        assert!(matches!(
            InvestmentRequest::parse("500", "crypto", None, minimum()),
            Err(PaymentFormError::UnsupportedCurrency(_))
        ));
        let request = InvestmentRequest::parse("500", "crypto", Some("btc"), minimum()).unwrap();
        assert_eq!(request.currency, Some(CryptoCurrency::Btc));
    }

    #[test]
    fn test_investment_request_rejects_manual() {
        assert_eq!(
            InvestmentRequest::parse("500", "manual", None, minimum()),
            Err(PaymentFormError::UnsupportedMethod("manual".to_string()))
        );
    }

    #[test]
    fn test_placeholder_address_shapes() {
        let mut rng = StdRng::seed_from_u64(7);

        let eth = placeholder_address(CryptoCurrency::Eth, &mut rng);
        assert_eq!(eth.len(), 42);
        assert!(eth.starts_with("0x"));
        assert!(eth[2..].chars().all(|c| c.is_ascii_hexdigit()));

        let btc = placeholder_address(CryptoCurrency::Btc, &mut rng);
        assert_eq!(btc.len(), 42);
        assert!(btc.starts_with("bc1q"));
        assert!(btc[4..].bytes().all(|b| BECH32_CHARSET.contains(&b)));
    }

    #[test]
    fn test_checkout_url_carries_amount_and_reference() {
        let base = Url::parse("https://checkout.example.test/pay/drn").unwrap();
        let amount = UsdAmount::parse("250").unwrap();
        let url = checkout_url(&base, amount, "DRN-ABC123");
        assert_eq!(
            url.as_str(),
            "https://checkout.example.test/pay/drn?amount=250.00&currency=USD&reference=DRN-ABC123"
        );
    }

    #[test]
    fn test_payment_reference_format() {
        let reference = payment_reference();
        assert!(reference.starts_with("DRN-"));
        assert_eq!(reference.len(), 16);
        assert_ne!(reference, payment_reference());
    }
}
