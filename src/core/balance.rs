use crate::core::money::Money;
use crate::core::user::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A pairwise balance read from outside the engine named the same user twice.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("balance must be between two different users, got {user} twice")]
pub struct SelfBalanceError {
    pub user: UserId,
}

/// A signed debt between two users.
///
/// Sign convention: a positive `amount` means `user_a` is owed `amount` by
/// `user_b`; a negative amount means `user_a` owes `user_b`. The same debt can
/// be written from either side, so `(A, B, x)` and `(B, A, -x)` are equivalent
/// (see [`PairwiseBalance::reversed`]).
///
/// # Examples
///
/// ```
/// use expense_engine::core::balance::PairwiseBalance;
/// use expense_engine::core::money::Money;
/// use expense_engine::core::user::UserId;
/// use rust_decimal_macros::dec;
///
/// // A is owed 30 by B
/// let b = PairwiseBalance::new(UserId::new("A"), UserId::new("B"), Money::new(dec!(30)));
/// assert_eq!(b.creditor(), Some(&UserId::new("A")));
/// assert_eq!(b.reversed().amount(), Money::new(dec!(-30)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBalance")]
pub struct PairwiseBalance {
    user_a: UserId,
    user_b: UserId,
    amount: Money,
}

#[derive(Deserialize)]
struct RawBalance {
    user_a: UserId,
    user_b: UserId,
    amount: Money,
}

impl TryFrom<RawBalance> for PairwiseBalance {
    type Error = SelfBalanceError;

    fn try_from(raw: RawBalance) -> Result<Self, Self::Error> {
        PairwiseBalance::try_new(raw.user_a, raw.user_b, raw.amount)
    }
}

impl PairwiseBalance {
    /// Create a new pairwise balance.
    ///
    /// # Panics
    ///
    /// Panics if both sides are the same user.
    pub fn new(user_a: UserId, user_b: UserId, amount: Money) -> Self {
        assert!(
            user_a != user_b,
            "Balance must be between two different users, got {} twice",
            user_a
        );
        Self {
            user_a,
            user_b,
            amount,
        }
    }

    /// Like [`PairwiseBalance::new`], but reports a self pair instead of
    /// panicking.
    pub fn try_new(user_a: UserId, user_b: UserId, amount: Money) -> Result<Self, SelfBalanceError> {
        if user_a == user_b {
            return Err(SelfBalanceError { user: user_a });
        }
        Ok(Self {
            user_a,
            user_b,
            amount,
        })
    }

    pub fn user_a(&self) -> &UserId {
        &self.user_a
    }

    pub fn user_b(&self) -> &UserId {
        &self.user_b
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    /// The same debt seen from `user_b`'s side.
    pub fn reversed(&self) -> Self {
        Self {
            user_a: self.user_b.clone(),
            user_b: self.user_a.clone(),
            amount: -self.amount,
        }
    }

    /// The user who is owed money, or `None` when settled.
    pub fn creditor(&self) -> Option<&UserId> {
        if self.amount.is_positive() {
            Some(&self.user_a)
        } else if self.amount.is_negative() {
            Some(&self.user_b)
        } else {
            None
        }
    }

    /// The user who owes money, or `None` when settled.
    pub fn debtor(&self) -> Option<&UserId> {
        if self.amount.is_positive() {
            Some(&self.user_b)
        } else if self.amount.is_negative() {
            Some(&self.user_a)
        } else {
            None
        }
    }

    pub fn is_settled(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for PairwiseBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.debtor(), self.creditor()) {
            (Some(debtor), Some(creditor)) => {
                write!(f, "{} owes {} {}", debtor, creditor, self.amount.abs())
            }
            _ => write!(f, "{} and {} are settled", self.user_a, self.user_b),
        }
    }
}
