use serde::{Deserialize, Serialize};

/// Monetary amount in euro cents.
///
/// Prices and totals are kept in minor units so that
/// `total == unit_price * quantity` holds exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates an amount from cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates an amount from whole euros.
    pub const fn from_euros(euros: i64) -> Self {
        Self {
            cents: euros * 100,
        }
    }

    pub const fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the whole-euro part.
    pub fn euros(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents remainder after whole euros.
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    /// Adds two amounts, returning `None` on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.cents.checked_add(other.cents).map(Money::from_cents)
    }

    /// Formats the amount as a plain decimal such as `50.00`.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.cents < 0 { "-" } else { "" };
        format!("{sign}{}.{:02}", self.euros().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} €", self.to_decimal_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_euros() {
        let money = Money::from_euros(25);
        assert_eq!(money.cents(), 2500);
        assert_eq!(money.euros(), 25);
        assert_eq!(money.cents_part(), 0);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(2500).to_string(), "25.00 €");
        assert_eq!(Money::from_cents(1234).to_string(), "12.34 €");
        assert_eq!(Money::from_cents(5).to_string(), "0.05 €");
        assert_eq!(Money::from_cents(-1234).to_string(), "-12.34 €");
    }

    #[test]
    fn test_decimal_string() {
        assert_eq!(Money::from_euros(50).to_decimal_string(), "50.00");
        assert_eq!(Money::from_cents(-5).to_decimal_string(), "-0.05");
    }

    #[test]
    fn test_checked_multiply() {
        assert_eq!(
            Money::from_euros(25).checked_multiply(2),
            Some(Money::from_euros(50))
        );
        assert_eq!(Money::from_cents(i64::MAX).checked_multiply(2), None);
    }

    #[test]
    fn test_checked_add() {
        let total = Money::zero().checked_add(Money::from_cents(150)).unwrap();
        assert_eq!(total.checked_add(Money::from_cents(50)), Some(Money::from_cents(200)));
        assert!(total.is_positive());
        assert!(Money::default().is_zero());
        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
    }
}
