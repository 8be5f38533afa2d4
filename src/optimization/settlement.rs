use crate::core::apportion::apportion;
use crate::core::balance::PairwiseBalance;
use crate::core::ledger::NetBalances;
use crate::core::money::Money;
use crate::core::policy::RoundingPolicy;
use crate::core::transfer::Transfer;
use crate::core::user::UserId;
use crate::graph::balance_graph::BalanceGraph;
use log::{debug, trace};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};
use thiserror::Error;

/// Errors from the settlement optimizer.
///
/// `Unbalanced` and `AmountOutOfRange` reject bad input. The other variants
/// are internal invariant violations: the optimizer stops rather than emit a
/// partial plan.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettlementError {
    #[error("net balances sum to {residual}, beyond the tolerance of {tolerance}")]
    Unbalanced { residual: Money, tolerance: Money },

    #[error("balance {amount} of user `{user}` cannot be expressed in minor units")]
    AmountOutOfRange { user: UserId, amount: Money },

    #[error("user `{user}` is both a creditor and a debtor")]
    ConflictingPosition { user: UserId },

    #[error("user `{user}` still has {remaining} outstanding with nobody left to settle against")]
    UnmatchedBalance { user: UserId, remaining: Money },
}

/// A user's outstanding magnitude in minor units, as held in the pools.
///
/// Ordered so that a max-heap yields the largest amount first and, among equal
/// amounts, the lowest user id.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Position {
    units: i64,
    user: UserId,
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.units
            .cmp(&other.units)
            .then_with(|| other.user.cmp(&self.user))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The optimizer's output: the quantised net balances it settled, and the
/// transfers that zero them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementPlan {
    net_balances: NetBalances,
    transfers: Vec<Transfer>,
}

impl SettlementPlan {
    /// Net balances after quantisation to the policy scale. Users that round
    /// to zero are omitted; those within the tolerance are kept but receive no
    /// transfer.
    pub fn net_balances(&self) -> &NetBalances {
        &self.net_balances
    }

    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    pub fn into_transfers(self) -> Vec<Transfer> {
        self.transfers
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.len()
    }

    /// Total money moved by the plan.
    pub fn total_volume(&self) -> Money {
        self.transfers.iter().map(Transfer::amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }
}

impl std::fmt::Display for SettlementPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Settlement Plan ===")?;
        writeln!(f, "Users to settle: {}", self.net_balances.unsettled_count())?;
        writeln!(f, "Transfers:       {}", self.transfers.len())?;
        writeln!(f, "Total volume:    {}", self.total_volume())?;

        if !self.transfers.is_empty() {
            writeln!(f, "\nTransfers:")?;
            for (i, transfer) in self.transfers.iter().enumerate() {
                writeln!(f, "  {:>3}. {}", i + 1, transfer)?;
            }
        }
        Ok(())
    }
}

/// Greedy minimum-transfer settlement over net balances.
///
/// # Algorithm
///
/// 1. Fold pairwise balances into a [`BalanceGraph`] and reduce it to one net
///    balance per user.
/// 2. Quantise the net balances to minor units with largest-remainder
///    apportionment, constrained to sum to exactly zero. Input that is off
///    zero by more than the tolerance is rejected.
/// 3. Users within the tolerance of zero are already settled. The rest go into
///    two max-heaps of creditors and debtors keyed by amount (ties to the
///    lowest user id).
/// 4. Pop the largest debtor and the largest creditor, transfer the smaller of
///    the two amounts, and push back whichever side still has a remainder
///    beyond the tolerance.
///
/// Every step settles at least one user and the last step settles two, so `k`
/// users with a non-zero balance need at most `k - 1` transfers.
///
/// # Examples
///
/// ```
/// use expense_engine::core::balance::PairwiseBalance;
/// use expense_engine::core::money::Money;
/// use expense_engine::core::user::UserId;
/// use expense_engine::optimization::settlement::optimize_settlements;
/// use rust_decimal_macros::dec;
///
/// let a = UserId::new("A");
/// let balances = vec![
///     PairwiseBalance::new(a.clone(), UserId::new("B"), Money::new(dec!(30))),
///     PairwiseBalance::new(a.clone(), UserId::new("C"), Money::new(dec!(20))),
/// ];
/// let transfers = optimize_settlements(&balances).unwrap();
///
/// let rendered: Vec<String> = transfers.iter().map(|t| t.to_string()).collect();
/// assert_eq!(rendered, vec!["B -> A: 30.00", "C -> A: 20.00"]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementOptimizer {
    policy: RoundingPolicy,
}

impl SettlementOptimizer {
    pub fn new(policy: RoundingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RoundingPolicy {
        &self.policy
    }

    /// Settle a list of pairwise balances.
    pub fn optimize(&self, balances: &[PairwiseBalance]) -> Result<SettlementPlan, SettlementError> {
        self.optimize_graph(&BalanceGraph::from_balances(balances))
    }

    /// Settle everything outstanding in a balance graph.
    pub fn optimize_graph(&self, graph: &BalanceGraph) -> Result<SettlementPlan, SettlementError> {
        debug!(
            "Optimizing {} pairwise balances across {} users",
            graph.edge_count(),
            graph.user_count()
        );
        self.optimize_net(&graph.net_balances())
    }

    /// Settle net balances supplied directly.
    pub fn optimize_net(&self, net: &NetBalances) -> Result<SettlementPlan, SettlementError> {
        let quantised = self.quantise(net)?;
        let scale = self.policy.scale();
        let tolerance = self.policy.tolerance();
        let settled = |units: i64| Money::from_minor_units(units, scale) <= tolerance;

        // Units left unmatched by users treated as settled. Whatever a pool
        // still holds once the other empties must be covered by this.
        let mut slack: i64 = 0;
        let mut creditors = BinaryHeap::new();
        let mut debtors = BinaryHeap::new();
        for (user, amount) in quantised.positions() {
            let units = amount.to_minor_units(scale).ok_or_else(|| {
                SettlementError::AmountOutOfRange {
                    user: user.clone(),
                    amount: *amount,
                }
            })?;
            if settled(units.abs()) {
                trace!("{} is within tolerance at {}", user, amount);
                slack += units.abs();
                continue;
            }
            let position = Position {
                units: units.abs(),
                user: user.clone(),
            };
            if units > 0 {
                creditors.push(position);
            } else {
                debtors.push(position);
            }
        }
        check_disjoint(&creditors, &debtors)?;

        debug!(
            "{} creditors, {} debtors after quantisation",
            creditors.len(),
            debtors.len()
        );

        let mut transfers = Vec::with_capacity(creditors.len() + debtors.len());
        loop {
            match (debtors.pop(), creditors.pop()) {
                (None, None) => break,
                (Some(debtor), Some(creditor)) => {
                    let units = debtor.units.min(creditor.units);
                    let transfer = Transfer::new(
                        debtor.user.clone(),
                        creditor.user.clone(),
                        Money::from_minor_units(units, scale),
                    );
                    trace!("{}", transfer);
                    transfers.push(transfer);

                    for (rest, pool) in [(debtor, &mut debtors), (creditor, &mut creditors)] {
                        let remaining = rest.units - units;
                        if remaining == 0 {
                            continue;
                        }
                        if settled(remaining) {
                            slack += remaining;
                        } else {
                            pool.push(Position {
                                units: remaining,
                                user: rest.user,
                            });
                        }
                    }
                }
                (Some(left), None) | (None, Some(left)) => {
                    let pool = if debtors.is_empty() {
                        &mut creditors
                    } else {
                        &mut debtors
                    };
                    let outstanding: i64 =
                        left.units + pool.drain().map(|p| p.units).sum::<i64>();
                    if outstanding > slack {
                        return Err(SettlementError::UnmatchedBalance {
                            user: left.user,
                            remaining: Money::from_minor_units(left.units, scale),
                        });
                    }
                    debug!(
                        "{} left outstanding, absorbed by balances within tolerance",
                        Money::from_minor_units(outstanding, scale)
                    );
                }
            }
        }

        debug!("Settlement plan has {} transfers", transfers.len());
        Ok(SettlementPlan {
            net_balances: quantised,
            transfers,
        })
    }

    /// Round every net balance to the policy scale so that the results sum to
    /// exactly zero. Users that round to zero are dropped.
    fn quantise(&self, net: &NetBalances) -> Result<NetBalances, SettlementError> {
        let tolerance = self.policy.tolerance();
        let residual = net.residual();
        if !net.is_balanced(tolerance) {
            return Err(SettlementError::Unbalanced {
                residual,
                tolerance,
            });
        }

        let scale = self.policy.scale();
        let mut claims = Vec::with_capacity(net.len());
        for (user, amount) in net.positions() {
            let ideal = amount.scaled_minor_units(scale).ok_or_else(|| {
                SettlementError::AmountOutOfRange {
                    user: user.clone(),
                    amount: *amount,
                }
            })?;
            claims.push((user, ideal));
        }

        let units = apportion(&claims, 0).ok_or_else(|| {
            match net.positions().iter().max_by_key(|(_, amount)| amount.abs()) {
                Some((user, amount)) => SettlementError::AmountOutOfRange {
                    user: user.clone(),
                    amount: *amount,
                },
                None => SettlementError::Unbalanced {
                    residual,
                    tolerance,
                },
            }
        })?;

        Ok(claims
            .iter()
            .zip(units)
            .filter(|(_, u)| *u != 0)
            .map(|((user, _), u)| ((*user).clone(), Money::from_minor_units(u, scale)))
            .collect())
    }
}

fn check_disjoint(
    creditors: &BinaryHeap<Position>,
    debtors: &BinaryHeap<Position>,
) -> Result<(), SettlementError> {
    let creditor_ids: BTreeSet<&UserId> = creditors.iter().map(|p| &p.user).collect();
    match debtors.iter().find(|p| creditor_ids.contains(&p.user)) {
        Some(conflict) => Err(SettlementError::ConflictingPosition {
            user: conflict.user.clone(),
        }),
        None => Ok(()),
    }
}

/// Settle pairwise balances with the default (cent) policy and return the
/// transfers.
pub fn optimize_settlements(balances: &[PairwiseBalance]) -> Result<Vec<Transfer>, SettlementError> {
    SettlementOptimizer::default()
        .optimize(balances)
        .map(SettlementPlan::into_transfers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    fn bal(a: &str, b: &str, amount: Decimal) -> PairwiseBalance {
        PairwiseBalance::new(user(a), user(b), Money::new(amount))
    }

    fn net(entries: &[(&str, Decimal)]) -> NetBalances {
        entries
            .iter()
            .map(|(u, amount)| (user(u), Money::new(*amount)))
            .collect()
    }

    fn triples(transfers: &[Transfer]) -> Vec<(String, String, Money)> {
        transfers
            .iter()
            .map(|t| (t.from().to_string(), t.to().to_string(), t.amount()))
            .collect()
    }

    #[test]
    fn test_two_debtors_one_creditor() {
        let transfers =
            optimize_settlements(&[bal("A", "B", dec!(30)), bal("A", "C", dec!(20))]).unwrap();
        assert_eq!(
            triples(&transfers),
            vec![
                ("B".to_string(), "A".to_string(), Money::new(dec!(30))),
                ("C".to_string(), "A".to_string(), Money::new(dec!(20))),
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(optimize_settlements(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_already_settled_pairs() {
        let transfers =
            optimize_settlements(&[bal("A", "B", dec!(10)), bal("B", "A", dec!(10))]).unwrap();
        assert!(transfers.is_empty());
    }

    #[test]
    fn test_chain_is_shortcut() {
        // C owes B 10, B owes A 10: B is a pass-through
        let transfers =
            optimize_settlements(&[bal("A", "B", dec!(10)), bal("B", "C", dec!(10))]).unwrap();
        assert_eq!(
            triples(&transfers),
            vec![("C".to_string(), "A".to_string(), Money::new(dec!(10)))]
        );
    }

    #[test]
    fn test_cycle_needs_no_transfers() {
        let transfers = optimize_settlements(&[
            bal("A", "B", dec!(25)),
            bal("B", "C", dec!(25)),
            bal("C", "A", dec!(25)),
        ])
        .unwrap();
        assert!(transfers.is_empty());
    }

    #[test]
    fn test_equal_debts_tie_break_on_id() {
        let plan = SettlementOptimizer::default()
            .optimize_net(&net(&[("A", dec!(20)), ("C", dec!(-10)), ("B", dec!(-10))]))
            .unwrap();
        let froms: Vec<_> = plan.transfers().iter().map(|t| t.from().as_str()).collect();
        assert_eq!(froms, vec!["B", "C"]);
    }

    #[test]
    fn test_at_most_k_minus_one_transfers() {
        let plan = SettlementOptimizer::default()
            .optimize_net(&net(&[
                ("A", dec!(45)),
                ("B", dec!(15)),
                ("C", dec!(-20)),
                ("D", dec!(-25)),
                ("E", dec!(-15)),
            ]))
            .unwrap();
        assert!(plan.transfer_count() <= 4);
        assert_eq!(plan.total_volume(), Money::new(dec!(60)));

        let mut after = plan.net_balances().clone();
        for t in plan.transfers() {
            after.apply_transfer(t);
        }
        assert!(after.is_settled(Money::ZERO));
    }

    #[test]
    fn test_unbalanced_net_rejected() {
        let err = SettlementOptimizer::default()
            .optimize_net(&net(&[("A", dec!(10)), ("B", dec!(-9.50))]))
            .unwrap_err();
        assert_eq!(
            err,
            SettlementError::Unbalanced {
                residual: Money::new(dec!(0.50)),
                tolerance: Money::new(dec!(0.01)),
            }
        );
    }

    #[test]
    fn test_drift_within_tolerance_is_absorbed() {
        let plan = SettlementOptimizer::default()
            .optimize_net(&net(&[("A", dec!(10.00)), ("B", dec!(-9.995))]))
            .unwrap();
        assert_eq!(plan.transfer_count(), 1);
        let t = &plan.transfers()[0];
        assert_eq!(t.amount(), Money::new(dec!(10.00)));
        assert!(t.amount().approx_eq(Money::new(dec!(9.995)), Money::new(dec!(0.01))));
    }

    #[test]
    fn test_sub_cent_balances_are_quantised() {
        let plan = SettlementOptimizer::default()
            .optimize_net(&net(&[
                ("A", dec!(6.666)),
                ("B", dec!(-3.333)),
                ("C", dec!(-3.333)),
            ]))
            .unwrap();
        assert_eq!(plan.net_balances().residual(), Money::ZERO);
        assert_eq!(plan.total_volume(), Money::new(dec!(6.66)));
        for t in plan.transfers() {
            assert!(t.amount().to_minor_units(2).is_some());
        }
    }

    #[test]
    fn test_one_cent_balance_is_already_settled() {
        assert!(optimize_settlements(&[bal("A", "B", dec!(0.01))]).unwrap().is_empty());
    }

    #[test]
    fn test_one_cent_creditor_is_excluded() {
        let transfers =
            optimize_settlements(&[bal("A", "C", dec!(0.01)), bal("B", "C", dec!(0.50))]).unwrap();
        assert_eq!(
            triples(&transfers),
            vec![("C".to_string(), "B".to_string(), Money::new(dec!(0.50)))]
        );
    }

    #[test]
    fn test_leftover_within_tolerance_is_absorbed() {
        // A and B are each within a cent; C's two cents are what they leave behind
        let plan = SettlementOptimizer::default()
            .optimize_net(&net(&[("A", dec!(0.01)), ("B", dec!(0.01)), ("C", dec!(-0.02))]))
            .unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_remainder_within_tolerance_is_dropped() {
        let plan = SettlementOptimizer::default()
            .optimize_net(&net(&[("A", dec!(5.00)), ("B", dec!(-4.99)), ("C", dec!(-0.01))]))
            .unwrap();
        assert_eq!(
            triples(plan.transfers()),
            vec![("B".to_string(), "A".to_string(), Money::new(dec!(4.99)))]
        );
    }

    #[test]
    fn test_empty_net_balances() {
        let plan = SettlementOptimizer::default()
            .optimize_net(&NetBalances::new())
            .unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let forward = optimize_settlements(&[
            bal("A", "B", dec!(12.40)),
            bal("C", "D", dec!(7.10)),
            bal("B", "D", dec!(3)),
        ])
        .unwrap();
        let shuffled = optimize_settlements(&[
            bal("D", "B", dec!(-3)),
            bal("B", "A", dec!(-12.40)),
            bal("C", "D", dec!(7.10)),
        ])
        .unwrap();
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn test_whole_unit_policy() {
        let optimizer = SettlementOptimizer::new(RoundingPolicy::new(0, dec!(1)).unwrap());
        let plan = optimizer
            .optimize(&[bal("A", "B", dec!(333)), bal("A", "C", dec!(333.5))])
            .unwrap();
        assert_eq!(plan.total_volume(), Money::new(dec!(667)));
    }

    #[test]
    fn test_position_heap_order() {
        let mut heap = BinaryHeap::new();
        heap.push(Position { units: 5, user: user("B") });
        heap.push(Position { units: 5, user: user("A") });
        heap.push(Position { units: 9, user: user("C") });
        let order: Vec<_> = std::iter::from_fn(|| heap.pop())
            .map(|p| p.user.to_string())
            .collect();
        assert_eq!(order, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_disjoint_check_flags_overlap() {
        let creditors: BinaryHeap<_> = [Position { units: 1, user: user("A") }].into();
        let debtors: BinaryHeap<_> = [Position { units: 1, user: user("A") }].into();
        assert_eq!(
            check_disjoint(&creditors, &debtors),
            Err(SettlementError::ConflictingPosition { user: user("A") })
        );
    }
}
