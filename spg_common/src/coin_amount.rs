use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Number of fractional digits carried by on-chain amounts.
pub const COIN_DECIMALS: u32 = 8;
pub const ATOMS_PER_COIN: i64 = 100_000_000;

//--------------------------------------     CoinAmount       ---------------------------------------------------------
/// A fixed-point amount of the payment coin, stored as a whole number of 10⁻⁸ units ("atoms").
///
/// In JSON, amounts are written as decimal strings with 8 fractional digits, e.g. `"1.00000000"`.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[sqlx(transparent)]
pub struct CoinAmount(i64);

op!(binary CoinAmount, Add, add);
op!(binary CoinAmount, Sub, sub);
op!(inplace CoinAmount, AddAssign, add_assign);
op!(inplace CoinAmount, SubAssign, sub_assign);
op!(unary CoinAmount, Neg, neg);

impl Sum for CoinAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoinAmountError {
    #[error("Value cannot be represented as a coin amount: {0}")]
    OutOfRange(String),
    #[error("Value has more than 8 fractional digits: {0}")]
    TooPrecise(String),
    #[error("Amounts cannot be negative: {0}")]
    Negative(String),
    #[error("Not a decimal number: {0}")]
    InvalidFormat(String),
}

impl CoinAmount {
    pub fn from_atoms(atoms: i64) -> Self {
        Self(atoms)
    }

    pub fn from_coins(coins: i64) -> Self {
        Self(coins * ATOMS_PER_COIN)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, COIN_DECIMALS)
    }

    /// Converts a decimal coin value into an amount, rounding any digits beyond the 8th decimal place *up*.
    ///
    /// Rounding up guarantees that the amount asked of a payer never undershoots the quoted price.
    pub fn from_decimal_round_up(value: Decimal) -> Result<Self, CoinAmountError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(CoinAmountError::Negative(value.to_string()));
        }
        let atoms = value
            .checked_mul(Decimal::from(ATOMS_PER_COIN))
            .map(|v| v.ceil())
            .and_then(|v| v.to_i64())
            .ok_or_else(|| CoinAmountError::OutOfRange(value.to_string()))?;
        Ok(Self(atoms))
    }
}

impl From<i64> for CoinAmount {
    fn from(atoms: i64) -> Self {
        Self(atoms)
    }
}

/// Exact conversion. Values with more than 8 significant fractional digits are rejected rather than rounded.
impl TryFrom<Decimal> for CoinAmount {
    type Error = CoinAmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value.normalize().scale() > COIN_DECIMALS {
            return Err(CoinAmountError::TooPrecise(value.to_string()));
        }
        let atoms = value
            .checked_mul(Decimal::from(ATOMS_PER_COIN))
            .and_then(|v| v.to_i64())
            .ok_or_else(|| CoinAmountError::OutOfRange(value.to_string()))?;
        Ok(Self(atoms))
    }
}

impl FromStr for CoinAmount {
    type Err = CoinAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|_| CoinAmountError::InvalidFormat(s.to_string()))?;
        Self::try_from(value)
    }
}

impl Display for CoinAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for CoinAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CoinAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CoinAmount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn display_has_eight_decimals() {
        assert_eq!(CoinAmount::from_coins(1).to_string(), "1.00000000");
        assert_eq!(CoinAmount::from_atoms(1).to_string(), "0.00000001");
        assert_eq!(CoinAmount::from_atoms(12_345_678_901).to_string(), "123.45678901");
    }

    #[test]
    fn round_up_never_undershoots() {
        // 30 / 7 = 4.285714285714...
        let amount = CoinAmount::from_decimal_round_up(dec!(30) / dec!(7)).unwrap();
        assert_eq!(amount, CoinAmount::from_atoms(428_571_429));
        let exact = CoinAmount::from_decimal_round_up(dec!(30) / dec!(30)).unwrap();
        assert_eq!(exact, CoinAmount::from_coins(1));
        let tiny = CoinAmount::from_decimal_round_up(dec!(0.000000001)).unwrap();
        assert_eq!(tiny, CoinAmount::from_atoms(1));
    }

    #[test]
    fn negative_values_are_rejected() {
        let err = CoinAmount::from_decimal_round_up(dec!(-0.5)).unwrap_err();
        assert!(matches!(err, CoinAmountError::Negative(_)));
    }

    #[test]
    fn exact_conversion() {
        assert_eq!(CoinAmount::try_from(dec!(0.5)).unwrap(), CoinAmount::from_atoms(50_000_000));
        assert_eq!(CoinAmount::try_from(dec!(1.000000000)).unwrap(), CoinAmount::from_coins(1));
        assert!(matches!(CoinAmount::try_from(dec!(0.123456789)), Err(CoinAmountError::TooPrecise(_))));
    }

    #[test]
    fn parse_from_str() {
        assert_eq!("2.5".parse::<CoinAmount>().unwrap(), CoinAmount::from_atoms(250_000_000));
        assert!(matches!("abc".parse::<CoinAmount>(), Err(CoinAmountError::InvalidFormat(_))));
    }

    #[test]
    fn json_uses_decimal_strings() {
        let amount = CoinAmount::from_atoms(150_000_000);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"1.50000000\"");
        let back: CoinAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }

    #[test]
    fn arithmetic() {
        let mut a = CoinAmount::from_coins(3);
        a -= CoinAmount::from_coins(1);
        assert_eq!(a + CoinAmount::from_atoms(5), CoinAmount::from_atoms(200_000_005));
        let total: CoinAmount = vec![CoinAmount::from_coins(1), CoinAmount::from_coins(2)].into_iter().sum();
        assert_eq!(total, CoinAmount::from_coins(3));
        assert_eq!(-CoinAmount::from_atoms(1), CoinAmount::from_atoms(-1));
    }
}
