//! Non-negative decimal quantities (stock levels and movement amounts).

use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Fractional digits kept in storage. Presentation may round further.
pub const QUANTITY_SCALE: u32 = 4;

/// A non-negative decimal quantity with up to four meaningful fractional digits.
///
/// Serialized as a decimal string so no precision is lost in stored documents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);

    /// Build a quantity, rounding to [`QUANTITY_SCALE`] digits.
    pub fn new(value: Decimal) -> DomainResult<Self> {
        let rounded = value
            .round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointAwayFromZero)
            .normalize();
        if rounded.is_sign_negative() && !rounded.is_zero() {
            return Err(DomainError::invalid_input(format!(
                "quantity cannot be negative: {value}"
            )));
        }
        Ok(Self(rounded.abs()))
    }

    pub fn from_units(units: u32) -> Self {
        Self(Decimal::from(units))
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        let d = Decimal::from_str(s.trim())
            .map_err(|e| DomainError::invalid_input(format!("invalid quantity '{s}': {e}")))?;
        Self::new(d)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.0.is_zero()
    }

    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }

    /// Subtract, returning `None` if the result would be negative.
    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        if other.0 > self.0 {
            return None;
        }
        self.0.checked_sub(other.0).map(|d| Quantity(d.normalize()))
    }

    /// Presentation form: at most four fractional digits, no trailing zeros.
    pub fn display(&self) -> String {
        self.0.normalize().to_string()
    }
}

impl ValueObject for Quantity {}

impl Default for Quantity {
    fn default() -> Self {
        Self::ZERO
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.display())
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl FromStr for Quantity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn q(s: &str) -> Quantity {
        Quantity::parse(s).unwrap()
    }

    #[test]
    fn rounds_to_four_fractional_digits() {
        assert_eq!(q("1.23456"), q("1.2346"));
        assert_eq!(q("0.00004").display(), "0");
        assert_eq!(q("2.50000").display(), "2.5");
    }

    #[test]
    fn rejects_negative_values() {
        assert!(matches!(
            Quantity::parse("-1"),
            Err(DomainError::InvalidInput(_))
        ));
        // Rounds to zero, so it is not negative any more.
        assert_eq!(q("-0.00001"), Quantity::ZERO);
    }

    #[test]
    fn checked_sub_refuses_to_go_below_zero() {
        assert_eq!(q("15").checked_sub(q("20")), None);
        assert_eq!(q("15").checked_sub(q("15")), Some(Quantity::ZERO));
        assert_eq!(q("1.5").checked_sub(q("0.25")), Some(q("1.25")));
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&q("12.3400")).unwrap();
        assert_eq!(json, "\"12.34\"");
        let back: Quantity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q("12.34"));
        assert!(serde_json::from_str::<Quantity>("\"-3\"").is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: adding then subtracting the same amount returns the original.
        #[test]
        fn add_then_sub_is_identity(a in 0u32..1_000_000, b in 0u32..1_000_000, scale in 0u32..5) {
            let qa = Quantity::new(Decimal::new(a as i64, scale)).unwrap();
            let qb = Quantity::new(Decimal::new(b as i64, scale)).unwrap();
            let sum = qa.checked_add(qb).unwrap();
            prop_assert_eq!(sum.checked_sub(qb), Some(qa));
        }
    }
}
