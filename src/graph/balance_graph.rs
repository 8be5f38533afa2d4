use crate::core::balance::PairwiseBalance;
use crate::core::ledger::NetBalances;
use crate::core::money::Money;
use crate::core::transfer::Transfer;
use crate::core::user::UserId;
use crate::split::calculator::SplitResult;
use log::trace;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors raised while recording activity into a [`BalanceGraph`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BalanceError {
    #[error("cannot record an invalid split ({issues} validation issue(s))")]
    InvalidSplit { issues: usize },
}

/// One user's standing against everyone they share a balance with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserBalance {
    pub user: UserId,
    /// Sum of what others owe this user.
    pub total_owed: Money,
    /// Sum of what this user owes others.
    pub total_owing: Money,
    /// `total_owed - total_owing`.
    pub net_balance: Money,
    /// Number of users this user owes money to.
    pub creditor_count: usize,
    /// Number of users who owe this user money.
    pub debtor_count: usize,
}

/// Normalised pairwise balances between users.
///
/// Each unordered pair of users holds at most one signed value. Balances
/// recorded in either direction are folded together, so `(A, B, +30)`
/// followed by `(B, A, +10)` leaves A owed 20 by B. Pairs that net to zero
/// are dropped.
///
/// This is the input the settlement optimizer reduces to net balances.
///
/// # Examples
///
/// ```
/// use expense_engine::core::balance::PairwiseBalance;
/// use expense_engine::core::money::Money;
/// use expense_engine::core::user::UserId;
/// use expense_engine::graph::balance_graph::BalanceGraph;
/// use rust_decimal_macros::dec;
///
/// let (a, b) = (UserId::new("A"), UserId::new("B"));
/// let mut graph = BalanceGraph::new();
/// graph.add_balance(&PairwiseBalance::new(a.clone(), b.clone(), Money::new(dec!(30))));
/// graph.add_balance(&PairwiseBalance::new(b.clone(), a.clone(), Money::new(dec!(10))));
///
/// assert_eq!(graph.edge_count(), 1);
/// assert_eq!(graph.balance_between(&a, &b), Money::new(dec!(20)));
/// assert_eq!(graph.balance_between(&b, &a), Money::new(dec!(-20)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BalanceGraph {
    /// (lower id, higher id) -> amount the lower id is owed by the higher id
    edges: BTreeMap<(UserId, UserId), Money>,
    users: BTreeSet<UserId>,
}

impl BalanceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_balances<'a>(balances: impl IntoIterator<Item = &'a PairwiseBalance>) -> Self {
        let mut graph = Self::new();
        for balance in balances {
            graph.add_balance(balance);
        }
        graph
    }

    /// Fold a pairwise balance into the graph.
    pub fn add_balance(&mut self, balance: &PairwiseBalance) {
        let (a, b) = (balance.user_a(), balance.user_b());
        self.users.insert(a.clone());
        self.users.insert(b.clone());

        let (key, amount) = if a < b {
            ((a.clone(), b.clone()), balance.amount())
        } else {
            ((b.clone(), a.clone()), -balance.amount())
        };

        let entry = self.edges.entry(key.clone()).or_default();
        *entry += amount;
        if entry.is_zero() {
            self.edges.remove(&key);
        }
    }

    /// Amount `a` is owed by `b` (negative if `a` owes `b`).
    pub fn balance_between(&self, a: &UserId, b: &UserId) -> Money {
        if a < b {
            self.edge(a, b)
        } else if b < a {
            -self.edge(b, a)
        } else {
            Money::ZERO
        }
    }

    fn edge(&self, lo: &UserId, hi: &UserId) -> Money {
        self.edges
            .get(&(lo.clone(), hi.clone()))
            .copied()
            .unwrap_or(Money::ZERO)
    }

    /// Every non-zero pair, lower user id first.
    pub fn balances(&self) -> Vec<PairwiseBalance> {
        self.edges
            .iter()
            .map(|((a, b), amount)| PairwiseBalance::new(a.clone(), b.clone(), *amount))
            .collect()
    }

    /// All users seen, including those whose pairs have since netted to zero.
    pub fn users(&self) -> &BTreeSet<UserId> {
        &self.users
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of non-zero pairs.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Total money that would move if every pair were settled directly.
    pub fn gross_total(&self) -> Money {
        self.edges.values().map(Money::abs).sum()
    }

    /// Reduce the graph to one signed balance per user. Every known user gets
    /// an entry, settled users included.
    pub fn net_balances(&self) -> NetBalances {
        let mut ledger: NetBalances = self
            .users
            .iter()
            .map(|user| (user.clone(), Money::ZERO))
            .collect();
        for ((a, b), amount) in &self.edges {
            ledger.credit(a.clone(), *amount);
            ledger.credit(b.clone(), -*amount);
        }
        ledger
    }

    /// Record an expense `payer` paid for, split according to `split`.
    ///
    /// Every participant other than the payer now owes the payer their
    /// allocation. The payer's own share, if any, creates no debt.
    pub fn record_split(&mut self, payer: &UserId, split: &SplitResult) -> Result<(), BalanceError> {
        if !split.is_valid() {
            return Err(BalanceError::InvalidSplit {
                issues: split.issues().len(),
            });
        }

        self.users.insert(payer.clone());
        for allocation in split.allocations() {
            if &allocation.user == payer {
                continue;
            }
            if allocation.amount.is_zero() {
                self.users.insert(allocation.user.clone());
                continue;
            }
            trace!("{} owes {} {}", allocation.user, payer, allocation.amount);
            self.add_balance(&PairwiseBalance::new(
                payer.clone(),
                allocation.user.clone(),
                allocation.amount,
            ));
        }
        Ok(())
    }

    /// Record a completed payment. The payer's debt to the payee shrinks by
    /// the amount paid (or the payee ends up owing the payer if it was more
    /// than the debt).
    pub fn record_transfer(&mut self, transfer: &Transfer) {
        self.add_balance(&PairwiseBalance::new(
            transfer.from().clone(),
            transfer.to().clone(),
            transfer.amount(),
        ));
    }

    /// Totals for one user across all of their pairs.
    pub fn user_summary(&self, user: &UserId) -> UserBalance {
        let mut summary = UserBalance {
            user: user.clone(),
            total_owed: Money::ZERO,
            total_owing: Money::ZERO,
            net_balance: Money::ZERO,
            creditor_count: 0,
            debtor_count: 0,
        };

        for ((a, b), amount) in &self.edges {
            let owed_to_user = if a == user {
                *amount
            } else if b == user {
                -*amount
            } else {
                continue;
            };
            if owed_to_user.is_positive() {
                summary.total_owed += owed_to_user;
                summary.debtor_count += 1;
            } else {
                summary.total_owing += owed_to_user.abs();
                summary.creditor_count += 1;
            }
        }
        summary.net_balance = summary.total_owed - summary.total_owing;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::calculator::compute_split;
    use crate::split::participant::Participant;
    use crate::split::strategy::SplitStrategy;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    fn bal(a: &str, b: &str, amount: Decimal) -> PairwiseBalance {
        PairwiseBalance::new(user(a), user(b), Money::new(amount))
    }

    #[test]
    fn test_opposite_directions_collapse() {
        let graph = BalanceGraph::from_balances(&[bal("A", "B", dec!(30)), bal("B", "A", dec!(10))]);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.balance_between(&user("A"), &user("B")), Money::new(dec!(20)));
    }

    #[test]
    fn test_reversed_input_is_equivalent() {
        let forward = BalanceGraph::from_balances(&[bal("A", "B", dec!(30))]);
        let backward = BalanceGraph::from_balances(&[bal("B", "A", dec!(-30))]);
        assert_eq!(forward.balances(), backward.balances());
    }

    #[test]
    fn test_zero_pairs_dropped() {
        let graph = BalanceGraph::from_balances(&[
            bal("A", "B", dec!(15)),
            bal("B", "A", dec!(15)),
            bal("C", "D", dec!(0)),
        ]);
        assert!(graph.is_empty());
        assert_eq!(graph.user_count(), 4);
        assert!(graph.net_balances().is_settled(Money::ZERO));
    }

    #[test]
    fn test_self_pair_lookup_is_zero() {
        let graph = BalanceGraph::from_balances(&[bal("A", "B", dec!(5))]);
        assert_eq!(graph.balance_between(&user("A"), &user("A")), Money::ZERO);
    }

    #[test]
    fn test_net_balances_sum_to_zero() {
        let graph = BalanceGraph::from_balances(&[
            bal("A", "B", dec!(30)),
            bal("A", "C", dec!(20)),
            bal("C", "B", dec!(5.55)),
        ]);
        let net = graph.net_balances();
        assert_eq!(net.position(&user("A")), Money::new(dec!(50)));
        assert_eq!(net.position(&user("B")), Money::new(dec!(-35.55)));
        assert_eq!(net.position(&user("C")), Money::new(dec!(-14.45)));
        assert_eq!(net.residual(), Money::ZERO);
        assert_eq!(graph.gross_total(), Money::new(dec!(55.55)));
    }

    #[test]
    fn test_record_split_payer_not_participant() {
        let split = compute_split(
            Money::new(dec!(90)),
            SplitStrategy::Equal,
            &[Participant::equal("B"), Participant::equal("C")],
        );
        let mut graph = BalanceGraph::new();
        graph.record_split(&user("A"), &split).unwrap();

        assert_eq!(graph.balance_between(&user("A"), &user("B")), Money::new(dec!(45.00)));
        assert_eq!(graph.balance_between(&user("A"), &user("C")), Money::new(dec!(45.00)));
        assert_eq!(graph.net_balances().position(&user("A")), Money::new(dec!(90)));
    }

    #[test]
    fn test_record_split_payer_bears_share() {
        let split = compute_split(
            Money::new(dec!(90)),
            SplitStrategy::Equal,
            &[
                Participant::equal("A"),
                Participant::equal("B"),
                Participant::equal("C"),
            ],
        );
        let mut graph = BalanceGraph::new();
        graph.record_split(&user("A"), &split).unwrap();

        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.net_balances().position(&user("A")), Money::new(dec!(60)));
    }

    #[test]
    fn test_record_invalid_split_rejected() {
        let split = compute_split(Money::new(dec!(90)), SplitStrategy::Equal, &[]);
        let mut graph = BalanceGraph::new();
        assert_eq!(
            graph.record_split(&user("A"), &split),
            Err(BalanceError::InvalidSplit { issues: 1 })
        );
        assert!(graph.is_empty());
    }

    #[test]
    fn test_record_transfer_reduces_debt() {
        let mut graph = BalanceGraph::from_balances(&[bal("A", "B", dec!(30))]);
        graph.record_transfer(&Transfer::new(user("B"), user("A"), Money::new(dec!(10))));
        assert_eq!(graph.balance_between(&user("A"), &user("B")), Money::new(dec!(20)));

        graph.record_transfer(&Transfer::new(user("B"), user("A"), Money::new(dec!(20))));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_user_summary() {
        let graph = BalanceGraph::from_balances(&[
            bal("A", "B", dec!(30)),
            bal("C", "A", dec!(12)),
            bal("A", "D", dec!(8)),
        ]);
        let summary = graph.user_summary(&user("A"));
        assert_eq!(summary.total_owed, Money::new(dec!(38)));
        assert_eq!(summary.total_owing, Money::new(dec!(12)));
        assert_eq!(summary.net_balance, Money::new(dec!(26)));
        assert_eq!(summary.debtor_count, 2);
        assert_eq!(summary.creditor_count, 1);
        assert_eq!(summary.net_balance, graph.net_balances().position(&user("A")));
    }
}
