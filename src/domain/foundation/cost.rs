//! Monetary cost value object.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

use super::ValidationError;

/// Non-negative USD amount with six decimal places.
///
/// Values are rounded half-to-even to six decimals on construction, so
/// addition of constructed amounts stays closed under the precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostAmount(Decimal);

impl CostAmount {
    /// The zero amount, identity of addition.
    pub const ZERO: CostAmount = CostAmount(Decimal::ZERO);

    /// Creates a cost amount, rejecting negative values.
    pub fn new(amount: Decimal) -> Result<Self, ValidationError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ValidationError::invalid_format(
                "cost",
                "amount cannot be negative",
            ));
        }
        Ok(Self(amount.round_dp_with_strategy(
            6,
            RoundingStrategy::MidpointNearestEven,
        )))
    }

    /// Returns the inner decimal value.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns true when the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for CostAmount {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for CostAmount {
    type Output = CostAmount;

    fn add(self, rhs: CostAmount) -> CostAmount {
        CostAmount(self.0 + rhs.0)
    }
}

impl fmt::Display for CostAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
