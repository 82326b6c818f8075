//! Bounded, unbounded and fractional lovelace arithmetic.
//!
//! Three representations form a tower: [`Coin`] is the on-chain, non-negative
//! 64-bit amount; [`CoinUnbounded`] is an arbitrary-precision signed integer
//! used as the result of any operation that might over/underflow a `Coin`;
//! [`CoinFractional`] is an arbitrary-precision rational used by fee/reward
//! computations that scale a `Coin` by a ratio.
//!
//! None of these hide overflow behind saturation: callers must explicitly
//! narrow back down with [`CoinUnbounded::to_coin`] or
//! [`CoinFractional::to_coin`] and handle the typed error.

use num_bigint::BigInt;
use num_rational::Ratio;
use std::ops::{Add, Mul, Neg, Sub};
use thiserror::Error;

pub type BigRatio = Ratio<BigInt>;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArithError {
    #[error("coin amount would overflow u64")]
    Overflow,
    #[error("coin amount would go negative")]
    Underflow,
}

/// A non-negative, bounded, 64-bit lovelace amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Coin(u64);

impl Coin {
    pub const ZERO: Coin = Coin(0);

    pub fn new(lovelace: i128) -> Result<Self, ArithError> {
        if lovelace < 0 {
            return Err(ArithError::Underflow);
        }
        if lovelace > u64::MAX as i128 {
            return Err(ArithError::Overflow);
        }
        Ok(Coin(lovelace as u64))
    }

    pub fn from_u64(lovelace: u64) -> Self {
        Coin(lovelace)
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, other: Coin) -> Result<Coin, ArithError> {
        self.0
            .checked_add(other.0)
            .map(Coin)
            .ok_or(ArithError::Overflow)
    }

    pub fn checked_sub(self, other: Coin) -> Result<Coin, ArithError> {
        self.0
            .checked_sub(other.0)
            .map(Coin)
            .ok_or(ArithError::Underflow)
    }

    pub fn scale_by_int(self, factor: i128) -> CoinUnbounded {
        CoinUnbounded(BigInt::from(self.0) * BigInt::from(factor))
    }

    pub fn scale_by_ratio(self, factor: &BigRatio) -> CoinFractional {
        CoinFractional(Ratio::from_integer(BigInt::from(self.0)) * factor)
    }
}

impl Add for Coin {
    type Output = CoinUnbounded;
    fn add(self, rhs: Coin) -> CoinUnbounded {
        CoinUnbounded(BigInt::from(self.0) + BigInt::from(rhs.0))
    }
}

impl Sub for Coin {
    type Output = CoinUnbounded;
    fn sub(self, rhs: Coin) -> CoinUnbounded {
        CoinUnbounded(BigInt::from(self.0) - BigInt::from(rhs.0))
    }
}

/// Arbitrary-precision signed lovelace amount: the widened result of any
/// `Coin + Coin` / `Coin - Coin`, or of scaling a `Coin` by an integer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CoinUnbounded(BigInt);

impl CoinUnbounded {
    pub fn zero() -> Self {
        CoinUnbounded(BigInt::from(0))
    }

    pub fn from_coin(coin: Coin) -> Self {
        CoinUnbounded(BigInt::from(coin.0))
    }

    pub fn to_coin(&self) -> Result<Coin, ArithError> {
        if self.0.sign() == num_bigint::Sign::Minus {
            return Err(ArithError::Underflow);
        }
        let (_, bytes) = self.0.to_bytes_be();
        if bytes.len() > 8 {
            return Err(ArithError::Overflow);
        }
        let mut buf = [0u8; 8];
        buf[8 - bytes.len()..].copy_from_slice(&bytes);
        Ok(Coin(u64::from_be_bytes(buf)))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == BigInt::from(0)
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == num_bigint::Sign::Minus
    }
}

impl Add for CoinUnbounded {
    type Output = CoinUnbounded;
    fn add(self, rhs: CoinUnbounded) -> CoinUnbounded {
        CoinUnbounded(self.0 + rhs.0)
    }
}

impl Sub for CoinUnbounded {
    type Output = CoinUnbounded;
    fn sub(self, rhs: CoinUnbounded) -> CoinUnbounded {
        CoinUnbounded(self.0 - rhs.0)
    }
}

impl Neg for CoinUnbounded {
    type Output = CoinUnbounded;
    fn neg(self) -> CoinUnbounded {
        CoinUnbounded(-self.0)
    }
}

/// Arbitrary-precision rational lovelace amount, produced by scaling a
/// `Coin` by a rational weight (fees, rewards, tiered reference-script
/// pricing).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CoinFractional(BigRatio);

impl CoinFractional {
    pub fn from_ratio(ratio: BigRatio) -> Self {
        CoinFractional(ratio)
    }

    pub fn zero() -> Self {
        CoinFractional(Ratio::from_integer(BigInt::from(0)))
    }

    pub fn as_ratio(&self) -> &BigRatio {
        &self.0
    }

    /// Round to the nearest integer, ties rounding to even (banker's
    /// rounding): `1/2 -> 0`, `3/2 -> 2`, `-1/2 -> 0`, `-3/2 -> -2`.
    pub fn round_half_even(&self) -> BigInt {
        let floor = self.0.floor().to_integer();
        let rem = &self.0 - Ratio::from_integer(floor.clone());
        let half = Ratio::new(BigInt::from(1), BigInt::from(2));

        if rem < half {
            floor
        } else if rem > half {
            floor + 1
        } else if &floor % 2 == BigInt::from(0) {
            floor
        } else {
            floor + 1
        }
    }

    pub fn to_unbounded(&self) -> CoinUnbounded {
        CoinUnbounded(self.round_half_even())
    }

    pub fn to_coin(&self) -> Result<Coin, ArithError> {
        self.to_unbounded().to_coin()
    }

    /// Round down (used for fee components that must never overcharge by a
    /// rounding artefact, e.g. the tiered reference-script fee walk).
    pub fn floor(&self) -> BigInt {
        self.0.floor().to_integer()
    }
}

impl Add for CoinFractional {
    type Output = CoinFractional;
    fn add(self, rhs: CoinFractional) -> CoinFractional {
        CoinFractional(self.0 + rhs.0)
    }
}

impl Mul<&BigRatio> for CoinFractional {
    type Output = CoinFractional;
    fn mul(self, rhs: &BigRatio) -> CoinFractional {
        CoinFractional(self.0 * rhs)
    }
}

/// Split an integer amount `n` into non-negative shares proportional to a
/// non-empty list of rational weights summing to one, such that the shares
/// sum exactly to `n`.
///
/// Algorithm (spec.md §4.1): floor each share, then distribute the integer
/// surplus `s = n - sum(floors)` by adding `floor(s / k)` to every share and
/// one extra to the first `|s mod k|` shares, preserving the sign of the
/// surplus.
pub fn distribute(weights: &[BigRatio], n: i128) -> Vec<i128> {
    assert!(!weights.is_empty(), "distribute requires a non-empty weight list");

    let k = weights.len() as i128;
    let total = BigInt::from(n);

    let floors: Vec<BigInt> = weights
        .iter()
        .map(|w| (w * Ratio::from_integer(total.clone())).floor().to_integer())
        .collect();

    let floor_sum: BigInt = floors.iter().fold(BigInt::from(0), |acc, f| acc + f);
    let surplus = total - floor_sum;

    let k_big = BigInt::from(k);
    let base = &surplus / &k_big;
    let rem = (&surplus % &k_big).to_string().parse::<i128>().unwrap_or(0);
    let rem_abs = rem.unsigned_abs() as usize;
    let sign = if rem < 0 { -1i128 } else { 1i128 };

    floors
        .into_iter()
        .enumerate()
        .map(|(i, f)| {
            let mut share = f + &base;
            if i < rem_abs {
                share += BigInt::from(sign);
            }
            share.to_string().parse::<i128>().expect("share fits i128")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use proptest::prelude::*;

    fn ratio(n: i64, d: i64) -> BigRatio {
        Ratio::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn coin_roundtrip() {
        assert_eq!(Coin::new(0).unwrap().to_u64(), 0);
        assert_eq!(Coin::new(u64::MAX as i128).unwrap().to_u64(), u64::MAX);
        assert!(matches!(Coin::new(-1), Err(ArithError::Underflow)));
    }

    #[test]
    fn bankers_rounding() {
        assert_eq!(CoinFractional::from_ratio(ratio(1, 2)).round_half_even(), BigInt::from(0));
        assert_eq!(CoinFractional::from_ratio(ratio(3, 2)).round_half_even(), BigInt::from(2));
        assert_eq!(CoinFractional::from_ratio(ratio(-1, 2)).round_half_even(), BigInt::from(0));
        assert_eq!(CoinFractional::from_ratio(ratio(-3, 2)).round_half_even(), BigInt::from(-2));
    }

    #[test]
    fn distribute_exact_split() {
        let weights = vec![ratio(1, 3), ratio(1, 3), ratio(1, 3)];
        let shares = distribute(&weights, 10);
        assert_eq!(shares.iter().sum::<i128>(), 10);
        assert!(shares.iter().all(|s| *s >= 0));
    }

    proptest! {
        #[test]
        fn coin_new_roundtrips(l in 0i128..=(u64::MAX as i128)) {
            let c = Coin::new(l).unwrap();
            prop_assert_eq!(c.to_u64() as i128, l);
        }

        #[test]
        fn coin_new_rejects_negative(l in i128::MIN..0i128) {
            prop_assert!(Coin::new(l).is_err());
        }

        #[test]
        fn distribute_conserves_total(n in 0i128..1_000_000_000i128, k in 1usize..8usize) {
            let w = ratio(1, k as i64);
            let weights: Vec<_> = std::iter::repeat(w).take(k).collect();
            let shares = distribute(&weights, n);
            prop_assert_eq!(shares.iter().sum::<i128>(), n);
            prop_assert!(shares.iter().all(|s| *s >= 0));
        }
    }
}
