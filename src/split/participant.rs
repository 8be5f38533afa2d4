use crate::core::money::Money;
use crate::core::user::UserId;
use crate::split::strategy::SplitStrategy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What a participant brings to a split request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Share {
    /// Nothing supplied; the amount is derived (EQUAL).
    Equal,
    /// The exact amount this participant owes (EXACT).
    Exact(Money),
    /// Percentage of the total in `[0, 100]` (PERCENTAGE).
    Percentage(Decimal),
}

impl Share {
    /// The strategy this share belongs to.
    pub fn strategy(&self) -> SplitStrategy {
        match self {
            Share::Equal => SplitStrategy::Equal,
            Share::Exact(_) => SplitStrategy::Exact,
            Share::Percentage(_) => SplitStrategy::Percentage,
        }
    }
}

/// One person sharing the cost of an expense.
///
/// The participant list given to the calculator is the complete set of people
/// who bear a share. The payer is part of it only if the payer also bears a
/// share; nothing is added or inferred on the payer's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user: UserId,
    pub share: Share,
}

impl Participant {
    pub fn equal(user: impl Into<UserId>) -> Self {
        Self {
            user: user.into(),
            share: Share::Equal,
        }
    }

    pub fn exact(user: impl Into<UserId>, amount: Decimal) -> Self {
        Self {
            user: user.into(),
            share: Share::Exact(Money::new(amount)),
        }
    }

    pub fn percentage(user: impl Into<UserId>, percentage: Decimal) -> Self {
        Self {
            user: user.into(),
            share: Share::Percentage(percentage),
        }
    }
}
