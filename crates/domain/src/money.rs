//! Money represented in integer Rial to avoid floating point issues.

use serde::{Deserialize, Serialize};

/// A monetary amount in whole Rial.
///
/// All price arithmetic in the pipeline happens on this type; there is
/// no fractional representation anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rial(i64);

impl Rial {
    /// Creates an amount from a whole-Rial value.
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Returns zero money.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount as a raw integer.
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Rial {
        Rial(self.0 * i64::from(quantity))
    }
}

impl Default for Rial {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Rial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} IRR", self.0)
    }
}

impl std::ops::Add for Rial {
    type Output = Rial;

    fn add(self, rhs: Self) -> Self::Output {
        Rial(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Rial {
    type Output = Rial;

    fn sub(self, rhs: Self) -> Self::Output {
        Rial(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Rial {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Rial {
    fn sum<I: Iterator<Item = Rial>>(iter: I) -> Self {
        iter.fold(Rial::zero(), |acc, x| acc + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Rial::new(1000);
        let b = Rial::new(500);

        assert_eq!((a + b).amount(), 1500);
        assert_eq!((a - b).amount(), 500);
        assert_eq!(a.multiply(3).amount(), 3000);
    }

    #[test]
    fn sum_of_amounts() {
        let total: Rial = [Rial::new(100), Rial::new(250)].into_iter().sum();
        assert_eq!(total.amount(), 350);
    }

    #[test]
    fn display_includes_currency() {
        assert_eq!(Rial::new(1234).to_string(), "1234 IRR");
    }

    #[test]
    fn predicates() {
        assert!(Rial::new(100).is_positive());
        assert!(Rial::zero().is_zero());
        assert!(!Rial::new(-1).is_positive());
    }

    #[test]
    fn serializes_as_bare_integer() {
        let json = serde_json::to_string(&Rial::new(5000)).unwrap();
        assert_eq!(json, "5000");
    }
}
