use crate::core::money::Money;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest supported scale. Minor units are held in an `i64`, so amounts at
/// higher scales would overflow for realistic totals.
pub const MAX_SCALE: u32 = 12;

/// Errors arising from an invalid rounding policy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("scale {scale} is not supported (maximum is {max})")]
    ScaleTooLarge { scale: u32, max: u32 },
    #[error("tolerance must not be negative, got {tolerance}")]
    NegativeTolerance { tolerance: Money },
}

/// Precision rules shared by the split calculator and the settlement optimizer.
///
/// - `scale`: decimal places of the settlement unit (2 for cents, 0 for JPY).
/// - `tolerance`: how far two sums may drift apart and still count as equal.
///   Also used for the percentage-sum check (percent points).
///
/// The default is scale 2 with a one-cent tolerance.
///
/// # Examples
///
/// ```
/// use expense_engine::core::policy::RoundingPolicy;
/// use rust_decimal_macros::dec;
///
/// let policy = RoundingPolicy::default();
/// assert_eq!(policy.scale(), 2);
/// assert_eq!(policy.tolerance().amount(), dec!(0.01));
///
/// let yen = RoundingPolicy::new(0, dec!(1)).unwrap();
/// assert_eq!(yen.scale(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundingPolicy {
    scale: u32,
    tolerance: Money,
}

impl RoundingPolicy {
    pub fn new(scale: u32, tolerance: Decimal) -> Result<Self, PolicyError> {
        let policy = Self {
            scale,
            tolerance: Money::new(tolerance),
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Check a policy that was built through deserialization.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.scale > MAX_SCALE {
            return Err(PolicyError::ScaleTooLarge {
                scale: self.scale,
                max: MAX_SCALE,
            });
        }
        if self.tolerance.is_negative() {
            return Err(PolicyError::NegativeTolerance {
                tolerance: self.tolerance,
            });
        }
        Ok(())
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn tolerance(&self) -> Money {
        self.tolerance
    }
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        Self {
            scale: 2,
            tolerance: Money::new(dec!(0.01)),
        }
    }
}
