//! Precision-safe numeric types for the insurance domain.
//!
//! Per the platform's own design rule, money is always an integer number of
//! cents; floats (here, `rust_decimal::Decimal`) are reserved for prices,
//! ratios, and APR-style multipliers. Mixing the two up at a type level is
//! exactly the class of bug this module exists to prevent.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use std::str::FromStr;

/// An exact price, ratio, or rate in `[0, 1]`-ish decimal space: trigger and
/// floor prices, health scores, APYs, utilization, chain/stablecoin
/// multipliers. Never used for a cash amount — see [`Cents`] for that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Basis points difference from another price: `(self - other) / other * 10_000`.
    #[inline]
    pub fn bps_from(&self, other: Price) -> Option<Decimal> {
        if other.is_zero() {
            return None;
        }
        Some((self.0 - other.0) / other.0 * Decimal::from(10_000))
    }

    /// Percentage difference from another price.
    #[inline]
    pub fn pct_from(&self, other: Price) -> Option<Decimal> {
        if other.is_zero() {
            return None;
        }
        Some((self.0 - other.0) / other.0 * Decimal::from(100))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for Price {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;
    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<Decimal> for Price {
    type Output = Self;
    fn div(self, rhs: Decimal) -> Self::Output {
        Self(self.0 / rhs)
    }
}

/// An exact, non-negative-by-convention cash amount in integer cents.
///
/// Every coverage amount, premium, payout, pool balance, and hedge slice in
/// this system is a `Cents`. Arithmetic is plain `i64` math; interpolation
/// that needs fractional factors goes through `Decimal` and rounds back to
/// `Cents` at the boundary (see `Cents::scale`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(pub i64);

impl Cents {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Scale this amount by a `Decimal` factor, rounding to the nearest cent.
    ///
    /// Used for payout interpolation and venue-weight splits, where the
    /// factor itself is an exact ratio but the result must land back on an
    /// integer cent.
    #[inline]
    pub fn scale(&self, factor: Decimal) -> Self {
        let scaled = Decimal::from(self.0) * factor;
        Self(scaled.round().try_into().unwrap_or(i64::MAX))
    }

    #[inline]
    pub fn as_decimal(&self) -> Decimal {
        Decimal::from(self.0)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Cents {
    fn from(v: i64) -> Self {
        Self(v)
    }
}

impl Add for Cents {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Cents {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Cents {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.map(|c| c.0).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_bps_from() {
        let p1 = Price::new(dec!(100));
        let p2 = Price::new(dec!(101));
        assert_eq!(p2.bps_from(p1).unwrap(), dec!(100));
    }

    #[test]
    fn cents_scale_rounds_to_nearest() {
        let coverage = Cents::new(1_000_000);
        let payout = coverage.scale(dec!(0.5));
        assert_eq!(payout, Cents::new(500_000));
    }

    #[test]
    fn cents_sum_and_arithmetic() {
        let total: Cents = vec![Cents::new(100), Cents::new(200), Cents::new(300)]
            .into_iter()
            .sum();
        assert_eq!(total, Cents::new(600));
        assert_eq!(Cents::new(500) - Cents::new(200), Cents::new(300));
    }
}
