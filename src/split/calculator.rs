use crate::core::apportion::apportion;
use crate::core::money::Money;
use crate::core::policy::RoundingPolicy;
use crate::core::user::UserId;
use crate::split::participant::{Participant, Share};
use crate::split::strategy::SplitStrategy;
use crate::split::validation::{validate_request, SplitIssue};
use log::{debug, trace};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The finalized amount one participant owes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub user: UserId,
    pub amount: Money,
}

/// Outcome of a split request.
///
/// When `is_valid()` is true the allocations reconcile with the total: exactly
/// to the minor unit for EQUAL and PERCENTAGE, within the policy tolerance for
/// EXACT (caller-supplied amounts are never adjusted). An invalid result
/// carries no allocations, only the issues explaining why.
#[derive(Debug, Clone, Serialize)]
pub struct SplitResult {
    total: Money,
    strategy: SplitStrategy,
    allocations: Vec<Allocation>,
    valid: bool,
    errors: Vec<SplitIssue>,
}

impl SplitResult {
    fn new(
        total: Money,
        strategy: SplitStrategy,
        allocations: Vec<Allocation>,
        errors: Vec<SplitIssue>,
    ) -> Self {
        let valid = errors.is_empty();
        Self {
            total,
            strategy,
            allocations: if valid { allocations } else { Vec::new() },
            valid,
            errors,
        }
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn strategy(&self) -> SplitStrategy {
        self.strategy
    }

    /// Finalized amounts, in the order the participants were given.
    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn issues(&self) -> &[SplitIssue] {
        &self.errors
    }

    /// Human-readable validation messages.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn amount_for(&self, user: &UserId) -> Option<Money> {
        self.allocations
            .iter()
            .find(|a| &a.user == user)
            .map(|a| a.amount)
    }

    /// Sum of the finalized allocations.
    pub fn allocated_total(&self) -> Money {
        self.allocations.iter().map(|a| a.amount).sum()
    }

    /// Total minus allocated amounts. Zero for EQUAL and PERCENTAGE splits;
    /// for EXACT splits, the drift accepted within tolerance.
    pub fn unassigned(&self) -> Money {
        self.total - self.allocated_total()
    }
}

impl std::fmt::Display for SplitResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Split Result ===")?;
        writeln!(f, "Total:     {}", self.total)?;
        writeln!(f, "Strategy:  {}", self.strategy)?;
        writeln!(f, "Valid:     {}", self.valid)?;

        if self.valid {
            writeln!(f, "\nAllocations:")?;
            for allocation in &self.allocations {
                writeln!(f, "  {:<15} {:>12}", allocation.user, allocation.amount)?;
            }
        } else {
            writeln!(f, "\nErrors:")?;
            for issue in &self.errors {
                writeln!(f, "  - {}", issue)?;
            }
        }
        Ok(())
    }
}

/// Splits a total among participants according to a [`SplitStrategy`].
///
/// # Algorithm
///
/// 1. Validate the request, collecting every issue.
/// 2. EXACT: pass the supplied amounts through unchanged.
/// 3. EQUAL / PERCENTAGE: convert the total to minor units and apportion it
///    by weight (1 per participant, or the percentage) with the
///    largest-remainder rule. Leftover units go to the largest fractional
///    remainders, ties to the lowest user id, so the amounts always sum to the
///    total exactly.
///
/// # Examples
///
/// ```
/// use expense_engine::split::calculator::SplitCalculator;
/// use expense_engine::split::participant::Participant;
/// use expense_engine::split::strategy::SplitStrategy;
/// use expense_engine::core::money::Money;
/// use expense_engine::core::policy::RoundingPolicy;
/// use rust_decimal_macros::dec;
///
/// let calculator = SplitCalculator::new(RoundingPolicy::default());
/// let result = calculator.compute(
///     Money::new(dec!(100.00)),
///     SplitStrategy::Equal,
///     &[Participant::equal("A"), Participant::equal("B"), Participant::equal("C")],
/// );
///
/// assert!(result.is_valid());
/// let amounts: Vec<String> = result.allocations().iter().map(|a| a.amount.to_string()).collect();
/// assert_eq!(amounts, vec!["33.34", "33.33", "33.33"]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitCalculator {
    policy: RoundingPolicy,
}

impl SplitCalculator {
    pub fn new(policy: RoundingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RoundingPolicy {
        &self.policy
    }

    pub fn compute(
        &self,
        total: Money,
        strategy: SplitStrategy,
        participants: &[Participant],
    ) -> SplitResult {
        let mut issues = validate_request(total, strategy, participants, &self.policy);

        let allocations = if issues.is_empty() {
            match self.allocate(total, strategy, participants) {
                Ok(allocations) => allocations,
                Err(issue) => {
                    issues.push(issue);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let result = SplitResult::new(total, strategy, allocations, issues);
        debug!(
            "{} split of {} across {} participants: {}",
            strategy,
            total,
            participants.len(),
            if result.is_valid() {
                "valid".to_string()
            } else {
                format!("{} issue(s)", result.issues().len())
            }
        );
        for allocation in result.allocations() {
            trace!("  {} owes {}", allocation.user, allocation.amount);
        }
        result
    }

    fn allocate(
        &self,
        total: Money,
        strategy: SplitStrategy,
        participants: &[Participant],
    ) -> Result<Vec<Allocation>, SplitIssue> {
        let weights: Vec<Decimal> = match strategy {
            SplitStrategy::Exact => {
                return Ok(participants
                    .iter()
                    .filter_map(|p| match p.share {
                        Share::Exact(amount) => Some(Allocation {
                            user: p.user.clone(),
                            amount,
                        }),
                        _ => None,
                    })
                    .collect());
            }
            SplitStrategy::Equal => vec![Decimal::ONE; participants.len()],
            SplitStrategy::Percentage => participants
                .iter()
                .map(|p| match p.share {
                    Share::Percentage(percentage) => percentage,
                    _ => Decimal::ZERO,
                })
                .collect(),
        };

        let overflow = || SplitIssue::Overflow { total };
        let scale = self.policy.scale();
        let total_units = total.to_minor_units(scale).ok_or_else(overflow)?;
        let weight_sum: Decimal = weights.iter().sum();
        if weight_sum <= Decimal::ZERO {
            // Unreachable after validation: EQUAL weights are 1 and
            // percentages sum to 100 within tolerance.
            return Err(SplitIssue::PercentageSumMismatch { sum: weight_sum });
        }

        let mut claims = Vec::with_capacity(participants.len());
        for (p, weight) in participants.iter().zip(&weights) {
            let ideal = Decimal::from(total_units)
                .checked_mul(*weight)
                .and_then(|scaled| scaled.checked_div(weight_sum))
                .ok_or_else(overflow)?;
            claims.push((&p.user, ideal));
        }

        let units = apportion(&claims, total_units).ok_or_else(overflow)?;
        Ok(participants
            .iter()
            .zip(units)
            .map(|(p, u)| Allocation {
                user: p.user.clone(),
                amount: Money::from_minor_units(u, scale),
            })
            .collect())
    }
}

/// Split `total` among `participants` with the default (cent) policy.
pub fn compute_split(
    total: Money,
    strategy: SplitStrategy,
    participants: &[Participant],
) -> SplitResult {
    SplitCalculator::default().compute(total, strategy, participants)
}
