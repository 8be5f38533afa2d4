use crate::core::money::Money;
use crate::core::user::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reasons a transfer read from outside the engine is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("transfer amount must be positive, got {amount}")]
    NonPositiveAmount { amount: Money },
    #[error("transfer cannot be self-directed ({user})")]
    SelfDirected { user: UserId },
}

/// A directed payment instruction: `from` pays `to` the given `amount`.
///
/// Transfers are produced by the settlement optimizer and, once a user has
/// actually paid, fed back into the balance graph as a recorded settlement.
///
/// # Examples
///
/// ```
/// use expense_engine::core::transfer::Transfer;
/// use expense_engine::core::user::UserId;
/// use expense_engine::core::money::Money;
/// use rust_decimal_macros::dec;
///
/// let t = Transfer::new(UserId::new("B"), UserId::new("A"), Money::new(dec!(30)));
/// assert_eq!(t.to_string(), "B -> A: 30");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTransfer")]
pub struct Transfer {
    from: UserId,
    to: UserId,
    amount: Money,
}

/// Wire shape of a [`Transfer`], checked before it becomes one.
#[derive(Deserialize)]
struct RawTransfer {
    from: UserId,
    to: UserId,
    amount: Money,
}

impl TryFrom<RawTransfer> for Transfer {
    type Error = TransferError;

    fn try_from(raw: RawTransfer) -> Result<Self, Self::Error> {
        Transfer::try_new(raw.from, raw.to, raw.amount)
    }
}

impl Transfer {
    /// Create a new transfer.
    ///
    /// # Panics
    ///
    /// Panics if `amount` is not positive or if `from` and `to` are the same
    /// user.
    pub fn new(from: UserId, to: UserId, amount: Money) -> Self {
        assert!(
            amount.is_positive(),
            "Transfer amount must be positive, got {}",
            amount
        );
        assert!(from != to, "Transfer cannot be self-directed ({})", from);
        Self { from, to, amount }
    }

    /// Like [`Transfer::new`], but reports an invalid transfer instead of
    /// panicking.
    pub fn try_new(from: UserId, to: UserId, amount: Money) -> Result<Self, TransferError> {
        if !amount.is_positive() {
            return Err(TransferError::NonPositiveAmount { amount });
        }
        if from == to {
            return Err(TransferError::SelfDirected { user: from });
        }
        Ok(Self { from, to, amount })
    }

    pub fn from(&self) -> &UserId {
        &self.from
    }

    pub fn to(&self) -> &UserId {
        &self.to
    }

    pub fn amount(&self) -> Money {
        self.amount
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.from, self.to, self.amount)
    }
}
