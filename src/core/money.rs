use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// A currency-denominated decimal amount.
///
/// `Money` itself carries arbitrary decimal precision. Settlement precision
/// (how many decimal places an amount may have once finalized) is decided by
/// a [`RoundingPolicy`](crate::core::policy::RoundingPolicy), which converts
/// amounts to integer *minor units* (cents at scale 2) before any allocation
/// happens.
///
/// # Examples
///
/// ```
/// use expense_engine::core::money::Money;
/// use rust_decimal_macros::dec;
///
/// let lunch = Money::new(dec!(42.50));
/// assert_eq!(lunch.to_minor_units(2), Some(4250));
/// assert_eq!(Money::from_minor_units(4250, 2), lunch);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Build an amount from integer minor units at the given scale
    /// (`from_minor_units(3334, 2)` is `33.34`).
    pub fn from_minor_units(units: i64, scale: u32) -> Self {
        Self(Decimal::new(units, scale))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Exact conversion to minor units. Returns `None` if the amount has more
    /// decimal places than `scale` or does not fit in an `i64`.
    pub fn to_minor_units(&self, scale: u32) -> Option<i64> {
        let scaled = self.0.checked_mul(minor_unit_factor(scale)?)?;
        if scaled.fract() != Decimal::ZERO {
            return None;
        }
        scaled.to_i64()
    }

    /// The amount expressed in minor units, without truncation.
    pub fn scaled_minor_units(&self, scale: u32) -> Option<Decimal> {
        self.0.checked_mul(minor_unit_factor(scale)?)
    }

    /// The same amount written with exactly `scale` decimal places, rounding
    /// if it had more.
    pub fn rescaled(&self, scale: u32) -> Self {
        let mut amount = self.0;
        amount.rescale(scale);
        Self(amount)
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// `true` when the two amounts differ by no more than `tolerance`.
    pub fn approx_eq(&self, other: Money, tolerance: Money) -> bool {
        (self.0 - other.0).abs() <= tolerance.0
    }
}

/// `10^scale` as a decimal, or `None` if it cannot be represented.
fn minor_unit_factor(scale: u32) -> Option<Decimal> {
    let factor = 10_i64.checked_pow(scale)?;
    Some(Decimal::from(factor))
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minor_units_round_trip() {
        let m = Money::new(dec!(33.34));
        assert_eq!(m.to_minor_units(2), Some(3334));
        assert_eq!(Money::from_minor_units(3334, 2), m);
    }

    #[test]
    fn test_minor_units_rejects_extra_precision() {
        assert_eq!(Money::new(dec!(10.005)).to_minor_units(2), None);
        assert_eq!(Money::new(dec!(10.005)).to_minor_units(3), Some(10005));
    }

    #[test]
    fn test_minor_units_negative() {
        assert_eq!(Money::new(dec!(-0.07)).to_minor_units(2), Some(-7));
    }

    #[test]
    fn test_minor_units_whole_currency() {
        assert_eq!(Money::new(dec!(1500)).to_minor_units(0), Some(1500));
        assert_eq!(Money::new(dec!(1500.5)).to_minor_units(0), None);
    }

    #[test]
    fn test_approx_eq_is_inclusive() {
        let tolerance = Money::new(dec!(0.01));
        let total = Money::new(dec!(50.00));
        assert!(total.approx_eq(Money::new(dec!(49.99)), tolerance));
        assert!(total.approx_eq(Money::new(dec!(50.01)), tolerance));
        assert!(!total.approx_eq(Money::new(dec!(49.98)), tolerance));
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let amounts = [
            Money::new(dec!(10.10)),
            Money::new(dec!(0.20)),
            Money::new(dec!(-5.30)),
        ];
        let total: Money = amounts.iter().sum();
        assert_eq!(total, Money::new(dec!(5.00)));
        assert_eq!(-total, Money::new(dec!(-5)));
        assert_eq!(total - Money::new(dec!(5)), Money::ZERO);
    }

    #[test]
    fn test_display_keeps_scale() {
        assert_eq!(Money::from_minor_units(3000, 2).to_string(), "30.00");
    }

    #[test]
    fn test_rescaled_pads_to_scale() {
        assert_eq!(Money::new(dec!(40)).rescaled(2).to_string(), "40.00");
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Money::new(dec!(12.50))).unwrap();
        assert_eq!(json, "\"12.50\"");
    }
}
