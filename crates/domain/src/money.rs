//! Exact decimal money.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::DomainError;

/// A monetary amount with exact decimal arithmetic.
///
/// Carried as a string on the wire (`"95.0"`, `"-155.5"`). Rendering always
/// keeps at least one fractional digit so `0` is written `"0.0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn from_decimal(value: Decimal) -> Self {
        Self(value)
    }

    /// Parses an amount from its string form.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        Decimal::from_str(s.trim())
            .map(Self)
            .map_err(|_| DomainError::InvalidAmount(s.to_string()))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// True for strictly positive amounts.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Money {
        Money(self.0.abs())
    }

    /// Rounds to cents, half away from zero.
    pub fn round_to_cents(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.0.normalize();
        if n.scale() == 0 {
            write!(f, "{n}.0")
        } else {
            write!(f, "{n}")
        }
    }
}

impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl std::ops::Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MoneyVisitor;

        impl de::Visitor<'_> for MoneyVisitor {
            type Value = Money;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a decimal amount as a string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
                Money::parse(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
                Ok(Money(Decimal::from(v)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
                Ok(Money(Decimal::from(v)))
            }

            // Some collaborators still emit JSON numbers; go through the
            // shortest decimal rendering rather than the binary value.
            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
                Money::parse(&v.to_string()).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(MoneyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn display_keeps_one_fractional_digit() {
        assert_eq!(Money::parse("95").unwrap().to_string(), "95.0");
        assert_eq!(Money::parse("250.00").unwrap().to_string(), "250.0");
        assert_eq!(Money::parse("12.35").unwrap().to_string(), "12.35");
        assert_eq!(Money::zero().to_string(), "0.0");
        assert_eq!(Money::parse("-155.0").unwrap().to_string(), "-155.0");
    }

    #[test]
    fn subtraction_is_exact() {
        let old = Money::parse("250.0").unwrap();
        let new = Money::parse("95.0").unwrap();
        assert_eq!(new - old, Money::from(dec!(-155)));

        // 0.1 + 0.2 style drift must not appear.
        let a = Money::parse("0.1").unwrap();
        let b = Money::parse("0.2").unwrap();
        assert_eq!((a + b).to_string(), "0.3");
    }

    #[test]
    fn sign_predicates() {
        assert!(Money::parse("0.01").unwrap().is_positive());
        assert!(Money::parse("-0.01").unwrap().is_negative());
        assert!(Money::parse("0.00").unwrap().is_zero());
        assert!(!Money::zero().is_positive());
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(
            Money::from(dec!(10.125)).round_to_cents(),
            Money::from(dec!(10.13))
        );
        assert_eq!(
            Money::from(dec!(-10.125)).round_to_cents(),
            Money::from(dec!(-10.13))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Money::parse("ten"),
            Err(DomainError::InvalidAmount(_))
        ));
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&Money::parse("95").unwrap()).unwrap();
        assert_eq!(json, "\"95.0\"");
    }

    #[test]
    fn deserializes_strings_and_numbers() {
        let from_str: Money = serde_json::from_str("\"250.0\"").unwrap();
        let from_int: Money = serde_json::from_str("250").unwrap();
        let from_float: Money = serde_json::from_str("0.3").unwrap();
        assert_eq!(from_str, from_int);
        assert_eq!(from_float, Money::from(dec!(0.3)));
    }
}
