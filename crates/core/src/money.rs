//! Monetary value objects.
//!
//! Amounts are stored in minor units (two decimal places) so that price
//! comparisons against the approval threshold are exact.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

const MINOR_PER_MAJOR: i64 = 100;

/// A monetary amount in minor units (e.g. cents, paisa).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl ValueObject for Amount {}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Whole major units (e.g. `Amount::from_major(50_000)` is 50000.00).
    pub const fn from_major(major: i64) -> Self {
        Self(major * MINOR_PER_MAJOR)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Absolute whole major units.
    pub fn major_part(self) -> u64 {
        self.0.unsigned_abs() / MINOR_PER_MAJOR as u64
    }

    /// Absolute minor remainder (0..=99).
    pub fn minor_part(self) -> u64 {
        self.0.unsigned_abs() % MINOR_PER_MAJOR as u64
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_mul(self, quantity: i64) -> Option<Amount> {
        self.0.checked_mul(quantity).map(Amount)
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        write!(f, "{sign}{}.{:02}", self.major_part(), self.minor_part())
    }
}

impl FromStr for Amount {
    type Err = DomainError;

    /// Parses plain decimal notation: `50000`, `50000.0`, `-12.5`, `0.01`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(frac) {
            return Err(DomainError::validation(format!("invalid amount '{raw}'")));
        }
        if frac.len() > 2 {
            return Err(DomainError::validation(format!(
                "amount '{raw}' has more than two decimal places"
            )));
        }

        let overflow = || DomainError::validation(format!("amount '{raw}' is out of range"));
        let major: i64 = whole.parse().map_err(|_| overflow())?;
        let minor: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| overflow())? * 10,
            _ => frac.parse().map_err(|_| overflow())?,
        };

        let value = major
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|v| v.checked_add(minor))
            .ok_or_else(overflow)?;

        Ok(Self(if negative { -value } else { value }))
    }
}

/// ISO-4217 style currency code (three ASCII letters, stored upper-case).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl ValueObject for CurrencyCode {}

impl CurrencyCode {
    pub fn new(code: impl AsRef<str>) -> DomainResult<Self> {
        let code = code.as_ref().trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::validation(format!(
                "currency code '{code}' must be three letters"
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_notation_into_minor_units() {
        assert_eq!("50000".parse::<Amount>().unwrap(), Amount::from_minor(5_000_000));
        assert_eq!("50000.0".parse::<Amount>().unwrap(), Amount::from_major(50_000));
        assert_eq!("50000.01".parse::<Amount>().unwrap(), Amount::from_minor(5_000_001));
        assert_eq!("-12.5".parse::<Amount>().unwrap(), Amount::from_minor(-1_250));
    }

    #[test]
    fn rejects_malformed_amounts() {
        for bad in ["", "abc", "1.234", "1,000", ".5", "--1"] {
            assert!(bad.parse::<Amount>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn displays_two_decimals() {
        assert_eq!(Amount::from_minor(125_050).to_string(), "1250.50");
        assert_eq!(Amount::from_minor(-5).to_string(), "-0.05");
        assert_eq!(Amount::ZERO.to_string(), "0.00");
    }

    #[test]
    fn currency_code_is_normalized() {
        assert_eq!(CurrencyCode::new("bdt").unwrap().as_str(), "BDT");
        assert!(CurrencyCode::new("TAKA").is_err());
        assert!(CurrencyCode::new("U$D").is_err());
    }

    #[test]
    fn currency_code_deserialization_validates() {
        let ok: CurrencyCode = serde_json::from_str("\"usd\"").unwrap();
        assert_eq!(ok.as_str(), "USD");
        assert!(serde_json::from_str::<CurrencyCode>("\"dollars\"").is_err());
    }
}
