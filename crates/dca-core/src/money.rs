//! # Money: Integer Minor Units
//!
//! All amounts (debt, payments, promises) are `i64` minor units of the
//! collection currency (paise for INR, cents for USD). Two decimal places
//! are assumed when parsing or rendering.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MINOR_PER_MAJOR: i64 = 100;

/// An amount of money in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Money = Money(0);

    /// From minor units (e.g. paise).
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// From whole major units (e.g. rupees). Saturates at the `i64` range.
    pub const fn from_major(major: i64) -> Self {
        Self(major.saturating_mul(MINOR_PER_MAJOR))
    }

    /// Minor units.
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Whole major units, truncated toward zero.
    pub const fn whole_major(&self) -> i64 {
        self.0 / MINOR_PER_MAJOR
    }

    /// Strictly greater than zero.
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Sum, failing instead of wrapping.
    pub fn checked_add(self, other: Money) -> Result<Money, ValidationError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(ValidationError::AmountOverflow("addition"))
    }

    /// Difference clamped at zero. Used for "amount still outstanding".
    pub fn saturating_sub_floor_zero(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }

    /// Reject zero and negative amounts.
    pub fn require_positive(self, field: &'static str) -> Result<Money, ValidationError> {
        if self.is_positive() {
            Ok(self)
        } else {
            Err(ValidationError::NonPositiveAmount {
                field,
                value: self.0,
            })
        }
    }

    /// Parse a decimal string such as `"50000"`, `"1250.5"` or `"1,250.50"`.
    ///
    /// At most two fractional digits are accepted.
    pub fn parse_decimal(input: &str) -> Result<Money, ValidationError> {
        let cleaned: String = input.trim().chars().filter(|c| *c != ',').collect();
        if cleaned.is_empty() {
            return Err(ValidationError::EmptyField("amount"));
        }
        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if frac.len() > 2 {
            return Err(ValidationError::invalid(
                "amount",
                format!("{input:?} has more than two decimal places"),
            ));
        }
        let bad = || ValidationError::invalid("amount", format!("{input:?} is not a decimal number"));
        if whole.is_empty() && frac.is_empty() {
            return Err(bad());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(bad());
        }
        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| bad())?
        };
        let frac_value: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| bad())? * 10,
            _ => frac.parse().map_err(|_| bad())?,
        };
        let minor = whole_value
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or(ValidationError::AmountOverflow("parse"))?;
        Ok(Money(if negative { -minor } else { minor }))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = MINOR_PER_MAJOR.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / per, abs % per)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_and_minor_agree() {
        let m = Money::from_major(50_000);
        assert_eq!(m.minor(), 5_000_000);
        assert_eq!(m.whole_major(), 50_000);
    }

    #[test]
    fn display_two_decimals() {
        assert_eq!(Money::from_minor(123_456).to_string(), "1234.56");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_minor(-250).to_string(), "-2.50");
    }

    #[test]
    fn parse_decimal_forms() {
        assert_eq!(Money::parse_decimal("50000").unwrap(), Money::from_major(50_000));
        assert_eq!(Money::parse_decimal("1,250.5").unwrap(), Money::from_minor(125_050));
        assert_eq!(Money::parse_decimal(" 0.07 ").unwrap(), Money::from_minor(7));
        assert_eq!(Money::parse_decimal("-3").unwrap(), Money::from_minor(-300));
    }

    #[test]
    fn parse_decimal_rejects_bad_input() {
        assert!(Money::parse_decimal("").is_err());
        assert!(Money::parse_decimal("12.345").is_err());
        assert!(Money::parse_decimal("12a").is_err());
        assert!(Money::parse_decimal(".").is_err());
    }

    #[test]
    fn checked_add_overflow_is_error() {
        let max = Money::from_minor(i64::MAX);
        assert!(max.checked_add(Money::from_minor(1)).is_err());
    }

    #[test]
    fn require_positive_rejects_zero() {
        assert!(Money::ZERO.require_positive("amount").is_err());
        assert!(Money::from_minor(1).require_positive("amount").is_ok());
    }

    #[test]
    fn outstanding_never_negative() {
        let due = Money::from_major(100);
        assert_eq!(due.saturating_sub_floor_zero(Money::from_major(150)), Money::ZERO);
    }
}
