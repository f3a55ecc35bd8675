use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

/// An amount of base-asset units, shares, or governance tokens.
///
/// Amounts are raw integer units with no decimal scaling: the share-price
/// and entitlement arithmetic rely on exact truncating division over units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub const fn from_units(units: u64) -> Self {
        Self(units)
    }

    pub fn to_units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Truncating division by a scalar. Returns `None` on a zero divisor.
    pub fn checked_div_scalar(&self, divisor: u64) -> Option<Self> {
        self.0.checked_div(divisor).map(Self)
    }

    /// Multiplication by a scalar, `None` on overflow.
    pub fn checked_mul_scalar(&self, factor: u64) -> Option<Self> {
        self.0.checked_mul(factor).map(Self)
    }

    /// Basis-point fraction of this amount, truncating (e.g. 500 bps = 5%).
    pub fn bps(&self, bps: u64) -> Self {
        Self(self.0 / 10_000 * bps + self.0 % 10_000 * bps / 10_000)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, a| acc.saturating_add(a))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} units", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_arithmetic() {
        let a = Amount::from_units(100);
        let b = Amount::from_units(30);

        assert_eq!(a.checked_add(b), Some(Amount::from_units(130)));
        assert_eq!(a.checked_sub(b), Some(Amount::from_units(70)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(
            Amount::from_units(u64::MAX).checked_add(Amount::from_units(1)),
            None
        );
    }

    #[test]
    fn test_saturating_arithmetic() {
        let a = Amount::from_units(10);
        assert_eq!(
            a.saturating_sub(Amount::from_units(25)),
            Amount::ZERO
        );
        assert_eq!(
            Amount::from_units(u64::MAX).saturating_add(a),
            Amount::from_units(u64::MAX)
        );
    }

    #[test]
    fn test_division_truncates() {
        assert_eq!(
            Amount::from_units(120).checked_div_scalar(50),
            Some(Amount::from_units(2))
        );
        assert_eq!(Amount::from_units(7).checked_div_scalar(0), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let amount = Amount::from_units(42);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "42");
        assert_eq!(serde_json::from_str::<Amount>(&json).unwrap(), amount);
    }

    #[test]
    fn test_bps() {
        // 5% platform fee
        assert_eq!(Amount::from_units(1000).bps(500), Amount::from_units(50));
        assert_eq!(Amount::from_units(30).bps(500), Amount::from_units(1));
        // No overflow near u64::MAX
        let big = Amount::from_units(u64::MAX - 1);
        assert!(big.bps(500) > Amount::ZERO);
    }
}
