//! Checks run on a split request before any amount is derived.
//!
//! Validation never stops at the first problem: every issue is collected so
//! the caller can show all of them and re-prompt once.

use crate::core::money::Money;
use crate::core::policy::RoundingPolicy;
use crate::core::user::UserId;
use crate::split::participant::{Participant, Share};
use crate::split::strategy::SplitStrategy;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use thiserror::Error;

const FULL_PERCENTAGE: Decimal = Decimal::ONE_HUNDRED;

/// A reason a split request cannot be finalized.
///
/// These are expected, user-correctable conditions. They are reported inside
/// a [`SplitResult`](crate::split::calculator::SplitResult), never returned
/// as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitIssue {
    #[error("total amount must be positive, got {total}")]
    NonPositiveTotal { total: Money },

    #[error("total amount {total} has more than {scale} decimal places")]
    TotalPrecision { total: Money, scale: u32 },

    #[error("at least one participant is required")]
    NoParticipants,

    #[error("participant `{user}` appears more than once")]
    DuplicateParticipant { user: UserId },

    #[error("participant `{user}` has a {found} share but the split is {expected}")]
    ShareMismatch {
        user: UserId,
        expected: SplitStrategy,
        found: SplitStrategy,
    },

    #[error("participant `{user}` has a negative amount {amount}")]
    NegativeAmount { user: UserId, amount: Money },

    #[error("participant `{user}` has amount {amount} with more than {scale} decimal places")]
    AmountPrecision {
        user: UserId,
        amount: Money,
        scale: u32,
    },

    #[error("participant `{user}` has percentage {percentage}% outside 0-100")]
    PercentageOutOfRange { user: UserId, percentage: Decimal },

    #[error("participant amounts sum to {sum} but the total is {total} (off by {discrepancy})")]
    ExactSumMismatch {
        sum: Money,
        total: Money,
        discrepancy: Money,
    },

    #[error("percentages sum to {sum}% instead of 100%")]
    PercentageSumMismatch { sum: Decimal },

    #[error("total amount {total} is too large to split")]
    Overflow { total: Money },
}

impl Serialize for SplitIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Run every request-level check and return the issues found.
pub fn validate_request(
    total: Money,
    strategy: SplitStrategy,
    participants: &[Participant],
    policy: &RoundingPolicy,
) -> Vec<SplitIssue> {
    let mut issues = Vec::new();

    let total_ok = check_total(total, policy, &mut issues);

    if participants.is_empty() {
        issues.push(SplitIssue::NoParticipants);
        return issues;
    }

    check_duplicates(participants, &mut issues);
    let shares_ok = check_shares(strategy, participants, policy, &mut issues);

    if shares_ok {
        match strategy {
            SplitStrategy::Equal => {}
            SplitStrategy::Exact if total_ok => {
                check_exact_sum(total, participants, policy, &mut issues)
            }
            SplitStrategy::Exact => {}
            SplitStrategy::Percentage => check_percentage_sum(participants, policy, &mut issues),
        }
    }

    issues
}

fn check_total(total: Money, policy: &RoundingPolicy, issues: &mut Vec<SplitIssue>) -> bool {
    if !total.is_positive() {
        issues.push(SplitIssue::NonPositiveTotal { total });
        return false;
    }
    if total.to_minor_units(policy.scale()).is_none() {
        issues.push(SplitIssue::TotalPrecision {
            total,
            scale: policy.scale(),
        });
        return false;
    }
    true
}

fn check_duplicates(participants: &[Participant], issues: &mut Vec<SplitIssue>) {
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();
    for p in participants {
        if !seen.insert(&p.user) && reported.insert(&p.user) {
            issues.push(SplitIssue::DuplicateParticipant {
                user: p.user.clone(),
            });
        }
    }
}

/// Returns `true` if every participant carries a share of the right kind.
fn check_shares(
    strategy: SplitStrategy,
    participants: &[Participant],
    policy: &RoundingPolicy,
    issues: &mut Vec<SplitIssue>,
) -> bool {
    let mut kinds_match = true;
    for p in participants {
        let found = p.share.strategy();
        if found != strategy {
            kinds_match = false;
            issues.push(SplitIssue::ShareMismatch {
                user: p.user.clone(),
                expected: strategy,
                found,
            });
            continue;
        }
        match p.share {
            Share::Exact(amount) if amount.is_negative() => {
                issues.push(SplitIssue::NegativeAmount {
                    user: p.user.clone(),
                    amount,
                });
            }
            Share::Exact(amount) if amount.to_minor_units(policy.scale()).is_none() => {
                issues.push(SplitIssue::AmountPrecision {
                    user: p.user.clone(),
                    amount,
                    scale: policy.scale(),
                });
            }
            Share::Percentage(percentage)
                if percentage < Decimal::ZERO || percentage > FULL_PERCENTAGE =>
            {
                issues.push(SplitIssue::PercentageOutOfRange {
                    user: p.user.clone(),
                    percentage,
                });
            }
            _ => {}
        }
    }
    kinds_match
}

fn check_exact_sum(
    total: Money,
    participants: &[Participant],
    policy: &RoundingPolicy,
    issues: &mut Vec<SplitIssue>,
) {
    let sum: Money = participants
        .iter()
        .filter_map(|p| match p.share {
            Share::Exact(amount) => Some(amount),
            _ => None,
        })
        .sum();

    if !sum.approx_eq(total, policy.tolerance()) {
        let scale = policy.scale();
        issues.push(SplitIssue::ExactSumMismatch {
            sum: sum.rescaled(scale),
            total: total.rescaled(scale),
            discrepancy: (total - sum).rescaled(scale),
        });
    }
}

fn check_percentage_sum(
    participants: &[Participant],
    policy: &RoundingPolicy,
    issues: &mut Vec<SplitIssue>,
) {
    let sum: Decimal = participants
        .iter()
        .filter_map(|p| match p.share {
            Share::Percentage(percentage) => Some(percentage),
            _ => None,
        })
        .sum();

    if (sum - FULL_PERCENTAGE).abs() > policy.tolerance().amount() {
        issues.push(SplitIssue::PercentageSumMismatch { sum });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn validate(total: Decimal, strategy: SplitStrategy, ps: &[Participant]) -> Vec<SplitIssue> {
        validate_request(Money::new(total), strategy, ps, &RoundingPolicy::default())
    }

    #[test]
    fn test_valid_equal_request() {
        let ps = [Participant::equal("A"), Participant::equal("B")];
        assert!(validate(dec!(10), SplitStrategy::Equal, &ps).is_empty());
    }

    #[test]
    fn test_non_positive_total() {
        let ps = [Participant::equal("A")];
        let issues = validate(dec!(0), SplitStrategy::Equal, &ps);
        assert_eq!(
            issues,
            vec![SplitIssue::NonPositiveTotal { total: Money::ZERO }]
        );
    }

    #[test]
    fn test_total_with_fractional_cents() {
        let ps = [Participant::equal("A")];
        let issues = validate(dec!(10.005), SplitStrategy::Equal, &ps);
        assert!(matches!(issues[0], SplitIssue::TotalPrecision { scale: 2, .. }));
    }

    #[test]
    fn test_empty_participants() {
        let issues = validate(dec!(10), SplitStrategy::Equal, &[]);
        assert_eq!(issues, vec![SplitIssue::NoParticipants]);
    }

    #[test]
    fn test_duplicate_reported_once() {
        let ps = [
            Participant::equal("A"),
            Participant::equal("A"),
            Participant::equal("A"),
            Participant::equal("B"),
        ];
        let issues = validate(dec!(10), SplitStrategy::Equal, &ps);
        assert_eq!(
            issues,
            vec![SplitIssue::DuplicateParticipant {
                user: UserId::new("A")
            }]
        );
    }

    #[test]
    fn test_share_mismatch_skips_sum_check() {
        let ps = [
            Participant::exact("A", dec!(5)),
            Participant::percentage("B", dec!(50)),
        ];
        let issues = validate(dec!(10), SplitStrategy::Exact, &ps);
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].to_string(),
            "participant `B` has a PERCENTAGE share but the split is EXACT"
        );
    }

    #[test]
    fn test_exact_sum_message() {
        let ps = [
            Participant::exact("A", dec!(20)),
            Participant::exact("B", dec!(20)),
        ];
        let issues = validate(dec!(50.00), SplitStrategy::Exact, &ps);
        assert_eq!(
            issues[0].to_string(),
            "participant amounts sum to 40.00 but the total is 50.00 (off by 10.00)"
        );
    }

    #[test]
    fn test_negative_exact_amount() {
        let ps = [
            Participant::exact("A", dec!(15)),
            Participant::exact("B", dec!(-5)),
        ];
        let issues = validate(dec!(10), SplitStrategy::Exact, &ps);
        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0], SplitIssue::NegativeAmount { .. }));
    }

    #[test]
    fn test_exact_amount_with_fractional_cents() {
        let ps = [
            Participant::exact("A", dec!(20.005)),
            Participant::exact("B", dec!(29.995)),
        ];
        let issues = validate(dec!(50), SplitStrategy::Exact, &ps);
        assert_eq!(issues.len(), 2);
        assert_eq!(
            issues[0].to_string(),
            "participant `A` has amount 20.005 with more than 2 decimal places"
        );
        assert!(matches!(issues[1], SplitIssue::AmountPrecision { scale: 2, .. }));
    }

    #[test]
    fn test_exact_amount_precision_follows_policy() {
        let ps = [Participant::exact("A", dec!(10.5))];
        let yen = RoundingPolicy::new(0, dec!(1)).unwrap();
        let issues = validate_request(Money::new(dec!(10)), SplitStrategy::Exact, &ps, &yen);
        assert!(matches!(issues[0], SplitIssue::AmountPrecision { scale: 0, .. }));
    }

    #[test]
    fn test_percentage_out_of_range_and_sum() {
        let ps = [
            Participant::percentage("A", dec!(120)),
            Participant::percentage("B", dec!(-10)),
        ];
        let issues = validate(dec!(10), SplitStrategy::Percentage, &ps);
        assert_eq!(issues.len(), 3);
        assert!(matches!(issues[0], SplitIssue::PercentageOutOfRange { .. }));
        assert!(matches!(issues[1], SplitIssue::PercentageOutOfRange { .. }));
        assert_eq!(issues[2], SplitIssue::PercentageSumMismatch { sum: dec!(110) });
    }

    #[test]
    fn test_percentage_sum_within_tolerance() {
        let ps = [
            Participant::percentage("A", dec!(33.33)),
            Participant::percentage("B", dec!(33.33)),
            Participant::percentage("C", dec!(33.33)),
        ];
        // 99.99 is within the 0.01 tolerance
        assert!(validate(dec!(10), SplitStrategy::Percentage, &ps).is_empty());
    }

    #[test]
    fn test_percentage_sum_off() {
        let ps = [
            Participant::percentage("A", dec!(60)),
            Participant::percentage("B", dec!(30)),
        ];
        let issues = validate(dec!(10), SplitStrategy::Percentage, &ps);
        assert_eq!(issues[0].to_string(), "percentages sum to 90% instead of 100%");
    }

    #[test]
    fn test_issue_serializes_as_message() {
        let json = serde_json::to_string(&SplitIssue::NoParticipants).unwrap();
        assert_eq!(json, "\"at least one participant is required\"");
    }
}
