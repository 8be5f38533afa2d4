use crate::core::balance::PairwiseBalance;
use crate::core::money::Money;
use crate::core::transfer::Transfer;
use crate::core::user::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One net balance per user.
///
/// A positive balance means the user is owed money overall (net creditor).
/// A negative balance means the user owes money overall (net debtor).
///
/// Positions are kept ordered by user id so that iteration, and everything
/// derived from it, is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetBalances {
    positions: BTreeMap<UserId, Money>,
}

impl NetBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a pairwise balance: `user_a` gains the amount, `user_b` loses it.
    pub fn apply_balance(&mut self, balance: &PairwiseBalance) {
        *self.positions.entry(balance.user_a().clone()).or_default() += balance.amount();
        *self.positions.entry(balance.user_b().clone()).or_default() -= balance.amount();
    }

    /// Apply a completed transfer: the payer's debt shrinks, and so does the
    /// payee's credit.
    pub fn apply_transfer(&mut self, transfer: &Transfer) {
        *self.positions.entry(transfer.from().clone()).or_default() += transfer.amount();
        *self.positions.entry(transfer.to().clone()).or_default() -= transfer.amount();
    }

    /// Add `amount` to a user's position directly.
    pub fn credit(&mut self, user: UserId, amount: Money) {
        *self.positions.entry(user).or_default() += amount;
    }

    pub fn position(&self, user: &UserId) -> Money {
        self.positions.get(user).copied().unwrap_or(Money::ZERO)
    }

    pub fn positions(&self) -> &BTreeMap<UserId, Money> {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Users with a positive balance, in id order.
    pub fn creditors(&self) -> impl Iterator<Item = (&UserId, Money)> {
        self.positions
            .iter()
            .filter(|(_, amount)| amount.is_positive())
            .map(|(user, amount)| (user, *amount))
    }

    /// Users with a negative balance, in id order.
    pub fn debtors(&self) -> impl Iterator<Item = (&UserId, Money)> {
        self.positions
            .iter()
            .filter(|(_, amount)| amount.is_negative())
            .map(|(user, amount)| (user, *amount))
    }

    /// Sum of every position. Zero for any ledger built from pairwise balances.
    pub fn residual(&self) -> Money {
        self.positions.values().sum()
    }

    pub fn is_balanced(&self, tolerance: Money) -> bool {
        self.residual().approx_eq(Money::ZERO, tolerance)
    }

    /// `true` when every position is within `tolerance` of zero.
    pub fn is_settled(&self, tolerance: Money) -> bool {
        self.positions
            .values()
            .all(|amount| amount.approx_eq(Money::ZERO, tolerance))
    }

    /// Total amount owed to creditors (equal to the total owed by debtors).
    pub fn total_credit(&self) -> Money {
        self.creditors().map(|(_, amount)| amount).sum()
    }

    /// Number of users whose position is not exactly zero.
    pub fn unsettled_count(&self) -> usize {
        self.positions.values().filter(|amount| !amount.is_zero()).count()
    }
}

impl FromIterator<(UserId, Money)> for NetBalances {
    fn from_iter<T: IntoIterator<Item = (UserId, Money)>>(iter: T) -> Self {
        let mut ledger = NetBalances::new();
        for (user, amount) in iter {
            ledger.credit(user, amount);
        }
        ledger
    }
}
