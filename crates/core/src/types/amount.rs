//! Money and token amounts using decimal arithmetic.
//!
//! Amounts travel as strings on the wire (`serde-with-str`) so no precision is
//! lost between the backend and the templates.

use core::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an amount from user input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// Nothing was entered.
    #[error("amount is required")]
    Empty,
    /// The input is not a decimal number.
    #[error("'{0}' is not a valid amount")]
    Invalid(String),
    /// Zero or negative.
    #[error("amount must be greater than zero")]
    NotPositive,
}

/// An amount of US dollars, rounded to cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UsdAmount(Decimal);

impl UsdAmount {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal value.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Parse a positive dollar amount from form input.
    ///
    /// Accepts an optional leading `$` and thousands separators
    /// (`"$1,250.50"`). The result is rounded half away from zero to cents.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, not a number, or not positive.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let value = parse_positive(input, &['$'])?;
        Ok(Self(value.round_dp_with_strategy(
            2,
            RoundingStrategy::MidpointAwayFromZero,
        )))
    }

    /// The underlying decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Format for display, e.g. `$1,250.50`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("${}", group_thousands(self.0, 2))
    }
}

impl fmt::Display for UsdAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// An amount of DRN tokens (four decimal places).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TokenAmount(Decimal);

impl TokenAmount {
    /// Number of decimal places tracked for token balances.
    pub const DECIMALS: u32 = 4;

    /// Zero tokens.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal value.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// The underlying decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Format for display, e.g. `12,500.0000 DRN`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{} DRN", group_thousands(self.0, Self::DECIMALS))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Price of one DRN token in US dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenPrice(Decimal);

impl TokenPrice {
    /// Parse a positive price.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, not a number, or not positive.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        parse_positive(input, &['$']).map(Self)
    }

    /// The underlying decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Tokens purchased for `usd`, truncated to [`TokenAmount::DECIMALS`].
    #[must_use]
    pub fn tokens_for(&self, usd: UsdAmount) -> TokenAmount {
        usd.amount().checked_div(self.0).map_or(TokenAmount::ZERO, |tokens| {
            TokenAmount(tokens.round_dp_with_strategy(TokenAmount::DECIMALS, RoundingStrategy::ToZero))
        })
    }
}

impl fmt::Display for TokenPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let price = self.0.normalize();
        if price.scale() < 2 {
            write!(f, "${price:.2}")
        } else {
            write!(f, "${price}")
        }
    }
}

fn parse_positive(input: &str, strip: &[char]) -> Result<Decimal, AmountError> {
    let trimmed = input.trim();
    let cleaned: String = trimmed
        .trim_start_matches(strip)
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Err(AmountError::Empty);
    }

    let value =
        Decimal::from_str(&cleaned).map_err(|_| AmountError::Invalid(trimmed.to_string()))?;

    if value <= Decimal::ZERO {
        return Err(AmountError::NotPositive);
    }

    Ok(value)
}

/// Render `value` with `dp` decimal places and comma-grouped thousands.
fn group_thousands(value: Decimal, dp: u32) -> String {
    let fixed = format!(
        "{:.*}",
        dp as usize,
        value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
    );
    let (sign, digits) = fixed
        .strip_prefix('-')
        .map_or(("", fixed.as_str()), |rest| ("-", rest));
    let (int_part, frac_part) = digits
        .split_once('.')
        .map_or((digits, None), |(int, frac)| (int, Some(frac)));

    let mut grouped = String::with_capacity(fixed.len() + int_part.len() / 3);
    grouped.push_str(sign);
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac_part {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_usd_parse_accepts_formatted_input() {
        let amount = UsdAmount::parse(" $1,250.50 ").unwrap();
        assert_eq!(amount.amount(), Decimal::new(125_050, 2));
    }

    #[test]
    fn test_usd_parse_rounds_to_cents() {
        let amount = UsdAmount::parse("10.005").unwrap();
        assert_eq!(amount.amount(), Decimal::new(1001, 2));
    }

    #[test]
    fn test_usd_parse_errors() {
        assert_eq!(UsdAmount::parse(""), Err(AmountError::Empty));
        assert_eq!(UsdAmount::parse("$"), Err(AmountError::Empty));
        assert_eq!(UsdAmount::parse("0"), Err(AmountError::NotPositive));
        assert_eq!(UsdAmount::parse("-5"), Err(AmountError::NotPositive));
        assert!(matches!(
            UsdAmount::parse("ten dollars"),
            Err(AmountError::Invalid(_))
        ));
    }

    #[test]
    fn test_usd_display() {
        assert_eq!(UsdAmount::new(Decimal::new(125_050, 2)).display(), "$1,250.50");
        assert_eq!(UsdAmount::new(Decimal::new(1_000_000, 0)).display(), "$1,000,000.00");
        assert_eq!(UsdAmount::new(Decimal::new(999, 0)).display(), "$999.00");
        assert_eq!(UsdAmount::ZERO.display(), "$0.00");
    }

    #[test]
    fn test_token_display() {
        assert_eq!(
            TokenAmount::new(Decimal::new(12_500, 0)).display(),
            "12,500.0000 DRN"
        );
    }

    #[test]
    fn test_tokens_for_divides_and_truncates() {
        let price = TokenPrice::parse("0.10").unwrap();
        let tokens = price.tokens_for(UsdAmount::parse("100").unwrap());
        assert_eq!(tokens.amount(), Decimal::new(1000, 0));

        let price = TokenPrice::parse("0.03").unwrap();
        let tokens = price.tokens_for(UsdAmount::parse("10").unwrap());
        assert_eq!(tokens.amount(), Decimal::new(3_333_333, 4));
    }

    #[test]
    fn test_token_price_display() {
        assert_eq!(TokenPrice::parse("0.10").unwrap().to_string(), "$0.10");
        assert_eq!(TokenPrice::parse("0.035").unwrap().to_string(), "$0.035");
    }

    #[test]
    fn test_amounts_deserialize_from_numbers_and_strings() {
        let from_number: UsdAmount = serde_json::from_str("1250.5").unwrap();
        let from_string: UsdAmount = serde_json::from_str("\"1250.5\"").unwrap();
        assert_eq!(from_number, from_string);
    }
}
