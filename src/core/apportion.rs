//! Largest-remainder apportionment of integer minor units.
//!
//! Both the split calculator and the settlement optimizer have to turn exact
//! decimal shares into whole minor units without losing or inventing a cent.
//! Every claimant first receives the floor of its ideal share; the leftover
//! units then go, one at a time, to the claimants with the largest fractional
//! remainder. Ties are broken by ascending user id, so the outcome depends
//! only on the input values.

use crate::core::user::UserId;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Distribute exactly `target` minor units across `claims`.
///
/// Each claim is a user and its ideal share in minor units (any precision).
/// The returned vector is in the same order as `claims` and always sums to
/// `target`. Returns `None` if a share does not fit in an `i64`, or if there
/// are no claimants but `target` is non-zero.
///
/// # Examples
///
/// ```
/// use expense_engine::core::apportion::apportion;
/// use expense_engine::core::user::UserId;
/// use rust_decimal::Decimal;
///
/// let (a, b, c) = (UserId::new("A"), UserId::new("B"), UserId::new("C"));
/// let third = Decimal::from(10_000) / Decimal::from(3);
/// let units = apportion(&[(&a, third), (&b, third), (&c, third)], 10_000).unwrap();
/// assert_eq!(units, vec![3334, 3333, 3333]);
/// ```
pub fn apportion(claims: &[(&UserId, Decimal)], target: i64) -> Option<Vec<i64>> {
    if claims.is_empty() {
        return (target == 0).then(Vec::new);
    }

    let mut units = Vec::with_capacity(claims.len());
    let mut remainders = Vec::with_capacity(claims.len());
    for (_, ideal) in claims {
        let floor = ideal.floor();
        units.push(floor.to_i64()?);
        remainders.push(*ideal - floor);
    }

    let assigned = units.iter().try_fold(0_i64, |acc, u| acc.checked_add(*u))?;
    let residual = target.checked_sub(assigned)?;
    if residual == 0 {
        return Some(units);
    }

    // Largest remainder first, then lowest user id.
    let mut order: Vec<usize> = (0..claims.len()).collect();
    order.sort_by(|&i, &j| {
        remainders[j]
            .cmp(&remainders[i])
            .then_with(|| claims[i].0.cmp(claims[j].0))
    });

    let n = claims.len() as i64;
    let step = residual.signum();
    let magnitude = residual.abs();
    let (per_claim, extra) = (magnitude / n, (magnitude % n) as usize);

    if residual < 0 {
        // Take units back from the smallest remainders first.
        order.reverse();
    }
    for unit in units.iter_mut() {
        *unit += step * per_claim;
    }
    for &idx in order.iter().take(extra) {
        units[idx] += step;
    }

    debug_assert_eq!(units.iter().sum::<i64>(), target);
    Some(units)
}
