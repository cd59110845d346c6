//! Money type for representing monetary values.
//!
//! Amounts are integers in the currency's minor unit (santim for ETB,
//! cents for USD). Every arithmetic operation is checked.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currencies accepted by the marketplace and its gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    /// Ethiopian birr.
    #[default]
    ETB,
    /// US dollar.
    USD,
}

impl Currency {
    /// Get the currency code (e.g., "ETB").
    pub fn code(&self) -> &'static str {
        match self {
            Currency::ETB => "ETB",
            Currency::USD => "USD",
        }
    }

    /// Get the currency symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::ETB => "Br",
            Currency::USD => "$",
        }
    }

    /// Number of decimal places in the minor unit.
    pub fn decimal_places(&self) -> u32 {
        2
    }

    /// Parse a currency code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_uppercase().as_str() {
            "ETB" => Some(Currency::ETB),
            "USD" => Some(Currency::USD),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A monetary value with currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in the smallest currency unit.
    pub amount_minor: i64,
    /// The currency.
    pub currency: Currency,
}

impl Money {
    /// Create a new Money value from minor units.
    pub fn new(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    /// Create a Money value from whole major units (e.g., birr).
    pub fn from_major(amount: i64, currency: Currency) -> Option<Self> {
        let factor = 10_i64.pow(currency.decimal_places());
        amount.checked_mul(factor).map(|minor| Self::new(minor, currency))
    }

    /// Create a zero amount in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }

    pub fn is_negative(&self) -> bool {
        self.amount_minor < 0
    }

    /// Add another Money value, returning None on currency mismatch or overflow.
    pub fn try_add(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.amount_minor
            .checked_add(other.amount_minor)
            .map(|amount| Money::new(amount, self.currency))
    }

    /// Subtract another Money value, returning None on currency mismatch or overflow.
    pub fn try_subtract(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        self.amount_minor
            .checked_sub(other.amount_minor)
            .map(|amount| Money::new(amount, self.currency))
    }

    /// Multiply by a scalar, returning None on overflow.
    pub fn try_multiply(&self, factor: i64) -> Option<Money> {
        self.amount_minor
            .checked_mul(factor)
            .map(|amount| Money::new(amount, self.currency))
    }

    /// Sum an iterator of Money values.
    pub fn try_sum<'a>(mut iter: impl Iterator<Item = &'a Money>, currency: Currency) -> Option<Money> {
        iter.try_fold(Money::zero(currency), |acc, m| acc.try_add(m))
    }

    /// Format the amount as a plain decimal string (e.g., "25.00").
    ///
    /// This is the representation payment gateways expect.
    pub fn to_decimal_string(&self) -> String {
        let places = self.currency.decimal_places();
        let divisor = 10_i64.pow(places);
        let sign = if self.amount_minor < 0 { "-" } else { "" };
        let abs = self.amount_minor.unsigned_abs();
        format!(
            "{}{}.{:0width$}",
            sign,
            abs / divisor as u64,
            abs % divisor as u64,
            width = places as usize
        )
    }

    /// Parse a decimal string such as "25", "25.5" or "25.00".
    pub fn parse_decimal(value: &str, currency: Currency) -> Option<Money> {
        let value = value.trim();
        let places = currency.decimal_places() as usize;
        let (whole, frac) = match value.split_once('.') {
            Some((w, f)) => (w, f),
            None => (value, ""),
        };
        if whole.is_empty() || frac.len() > places {
            return None;
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let whole: i64 = whole.parse().ok()?;
        let frac_padded = format!("{:0<width$}", frac, width = places);
        let frac: i64 = if places == 0 { 0 } else { frac_padded.parse().ok()? };
        let factor = 10_i64.pow(places as u32);
        whole
            .checked_mul(factor)
            .and_then(|w| w.checked_add(frac))
            .map(|minor| Money::new(minor, currency))
    }

    /// Format as a display string (e.g., "Br 25.00").
    pub fn display(&self) -> String {
        format!("{} {}", self.currency.symbol(), self.to_decimal_string())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_major() {
        let m = Money::from_major(10, Currency::ETB).unwrap();
        assert_eq!(m.amount_minor, 1000);
        assert!(Money::from_major(i64::MAX, Currency::ETB).is_none());
    }

    #[test]
    fn test_money_decimal_string() {
        assert_eq!(Money::new(2500, Currency::ETB).to_decimal_string(), "25.00");
        assert_eq!(Money::new(5, Currency::USD).to_decimal_string(), "0.05");
        assert_eq!(Money::new(-150, Currency::ETB).to_decimal_string(), "-1.50");
    }

    #[test]
    fn test_money_parse_decimal() {
        assert_eq!(
            Money::parse_decimal("25.00", Currency::ETB),
            Some(Money::new(2500, Currency::ETB))
        );
        assert_eq!(
            Money::parse_decimal("25.5", Currency::ETB),
            Some(Money::new(2550, Currency::ETB))
        );
        assert_eq!(
            Money::parse_decimal("100", Currency::ETB),
            Some(Money::new(10000, Currency::ETB))
        );
        assert_eq!(Money::parse_decimal("1.234", Currency::ETB), None);
        assert_eq!(Money::parse_decimal("abc", Currency::ETB), None);
        assert_eq!(Money::parse_decimal("-1", Currency::ETB), None);
    }

    #[test]
    fn test_money_checked_arithmetic() {
        let a = Money::new(1000, Currency::ETB);
        let b = Money::new(500, Currency::ETB);
        assert_eq!(a.try_add(&b).unwrap().amount_minor, 1500);
        assert_eq!(a.try_subtract(&b).unwrap().amount_minor, 500);
        assert_eq!(a.try_multiply(3).unwrap().amount_minor, 3000);
        assert!(Money::new(i64::MAX, Currency::ETB).try_multiply(2).is_none());
    }

    #[test]
    fn test_money_currency_mismatch() {
        let etb = Money::new(1000, Currency::ETB);
        let usd = Money::new(1000, Currency::USD);
        assert!(etb.try_add(&usd).is_none());
        assert!(etb.try_subtract(&usd).is_none());
    }

    #[test]
    fn test_money_sum() {
        let values = [Money::new(100, Currency::ETB), Money::new(250, Currency::ETB)];
        let total = Money::try_sum(values.iter(), Currency::ETB).unwrap();
        assert_eq!(total.amount_minor, 350);

        let mixed = [Money::new(100, Currency::ETB), Money::new(1, Currency::USD)];
        assert!(Money::try_sum(mixed.iter(), Currency::ETB).is_none());
        let huge = [Money::new(i64::MAX, Currency::ETB), Money::new(1, Currency::ETB)];
        assert!(Money::try_sum(huge.iter(), Currency::ETB).is_none());
        assert_eq!(Money::try_sum([].iter(), Currency::ETB), Some(Money::zero(Currency::ETB)));
    }

    #[test]
    fn test_currency_from_code() {
        assert_eq!(Currency::from_code("ETB"), Some(Currency::ETB));
        assert_eq!(Currency::from_code("usd"), Some(Currency::USD));
        assert_eq!(Currency::from_code("EUR"), None);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(4999, Currency::ETB).display(), "Br 49.99");
    }
}
