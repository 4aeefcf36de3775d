//! Exact rational exchange rates.
//!
//! Products of up to three 256-bit factors are formed while converting and comparing amounts, so
//! all intermediate arithmetic is widened to 1024 bits and nothing is rounded before the final
//! division.

use core::cmp::Ordering;

use alloy_primitives::{Uint, U256};

use crate::FeeCurrencyError;

/// Wide unsigned integer holding intermediate products.
pub(crate) type U1024 = Uint<1024, 16>;

const ONE: U256 = U256::from_limbs([1, 0, 0, 0]);

pub(crate) fn widen(value: U256) -> U1024 {
    U1024::from_limbs_slice(value.as_limbs())
}

pub(crate) fn narrow(value: U1024) -> Option<U256> {
    U256::checked_from_limbs_slice(value.as_limbs())
}

/// Native units per one unit of a fee currency, as an exact fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawExchangeRate")]
pub struct ExchangeRate {
    numerator: U256,
    denominator: U256,
}

/// Serialized form of an [`ExchangeRate`], checked by [`ExchangeRate::new`] on the way in.
#[derive(serde::Deserialize)]
struct RawExchangeRate {
    numerator: U256,
    denominator: U256,
}

impl TryFrom<RawExchangeRate> for ExchangeRate {
    type Error = FeeCurrencyError;

    fn try_from(raw: RawExchangeRate) -> Result<Self, Self::Error> {
        Self::new(raw.numerator, raw.denominator)
    }
}

impl ExchangeRate {
    /// The rate of the native currency against itself.
    pub const UNIT: Self = Self { numerator: ONE, denominator: ONE };

    /// Creates a rate of `numerator / denominator` native units per currency unit. Both parts must
    /// be non-zero so that the rate can be applied in either direction.
    pub fn new(numerator: U256, denominator: U256) -> Result<Self, FeeCurrencyError> {
        if numerator.is_zero() || denominator.is_zero() {
            return Err(FeeCurrencyError::InvalidExchangeRate { numerator, denominator });
        }
        Ok(Self { numerator, denominator })
    }

    /// Creates a rate from a fraction quoted the other way round, i.e. currency units per native
    /// unit, as reported by the price oracle.
    pub fn from_inverse(numerator: U256, denominator: U256) -> Result<Self, FeeCurrencyError> {
        Self::new(denominator, numerator)
    }

    /// The rate numerator.
    pub const fn numerator(&self) -> U256 {
        self.numerator
    }

    /// The rate denominator.
    pub const fn denominator(&self) -> U256 {
        self.denominator
    }

    /// Converts `amount` of this rate's currency into the native currency, truncating.
    pub fn to_native(&self, amount: U256) -> Option<U256> {
        narrow(widen(amount) * widen(self.numerator) / widen(self.denominator))
    }

    /// Converts a native `amount` into this rate's currency, truncating.
    pub fn from_native(&self, amount: U256) -> Option<U256> {
        narrow(widen(amount) * widen(self.denominator) / widen(self.numerator))
    }

    /// Compares `amount` of this rate's currency against `other_amount` of `other`'s currency by
    /// native value, without rounding.
    pub fn compare(&self, amount: U256, other: &Self, other_amount: U256) -> Ordering {
        let lhs = widen(amount) * widen(self.numerator) * widen(other.denominator);
        let rhs = widen(other_amount) * widen(other.numerator) * widen(self.denominator);
        lhs.cmp(&rhs)
    }

    /// Converts `amount` of this rate's currency into `target`'s currency with a single final
    /// division.
    pub fn convert(&self, amount: U256, target: &Self) -> Option<U256> {
        let numerator = widen(amount) * widen(self.numerator) * widen(target.denominator);
        let denominator = widen(self.denominator) * widen(target.numerator);
        narrow(numerator / denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(numerator: u64, denominator: u64) -> ExchangeRate {
        ExchangeRate::new(U256::from(numerator), U256::from(denominator)).unwrap()
    }

    #[test]
    fn test_zero_parts_are_rejected() {
        assert!(ExchangeRate::new(U256::ZERO, U256::from(1)).is_err());
        assert!(ExchangeRate::new(U256::from(1), U256::ZERO).is_err());
    }

    #[test]
    fn test_deserialize_checks_parts() {
        let parsed: ExchangeRate =
            serde_json::from_str(r#"{"numerator":"0x2","denominator":"0x3"}"#).unwrap();
        assert_eq!(parsed, rate(2, 3));

        let zero_denominator = r#"{"numerator":"0x1","denominator":"0x0"}"#;
        let err = serde_json::from_str::<ExchangeRate>(zero_denominator).unwrap_err();
        assert!(err.to_string().contains("invalid exchange rate"), "{err}");
        let zero_numerator = r#"{"numerator":"0x0","denominator":"0x1"}"#;
        assert!(serde_json::from_str::<ExchangeRate>(zero_numerator).is_err());
    }

    #[test]
    fn test_conversion_truncates_toward_zero() {
        let r = rate(2, 3);
        // 10 * 2 / 3 = 6.66..
        assert_eq!(r.to_native(U256::from(10)), Some(U256::from(6)));
        // 10 * 3 / 2 = 15
        assert_eq!(r.from_native(U256::from(10)), Some(U256::from(15)));
        assert_eq!(r.from_native(U256::from(1)), Some(U256::from(1)));
    }

    #[test]
    fn test_wide_products_do_not_overflow() {
        let r = ExchangeRate::new(U256::MAX, U256::MAX).unwrap();
        assert_eq!(r.to_native(U256::MAX), Some(U256::MAX));
        assert_eq!(r.compare(U256::MAX, &ExchangeRate::UNIT, U256::MAX), Ordering::Equal);
    }

    #[test]
    fn test_overflowing_result_is_none() {
        let r = rate(2, 1);
        assert_eq!(r.to_native(U256::MAX), None);
    }

    #[test]
    fn test_inverse_quote() {
        // Oracle says 4 currency units per native unit.
        let r = ExchangeRate::from_inverse(U256::from(4), U256::from(1)).unwrap();
        assert_eq!(r.to_native(U256::from(100)), Some(U256::from(25)));
    }

    #[test]
    fn test_compare_cross_multiplies() {
        // 100 X at 2 native per X against 50 native.
        assert_eq!(
            rate(2, 1).compare(U256::from(100), &ExchangeRate::UNIT, U256::from(50)),
            Ordering::Greater
        );
        // 3 Y at 1/3 native per Y equals 1 native.
        assert_eq!(
            rate(1, 3).compare(U256::from(3), &ExchangeRate::UNIT, U256::from(1)),
            Ordering::Equal
        );
    }
}
