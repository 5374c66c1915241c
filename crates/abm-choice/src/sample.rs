//! Cumulative-distribution sampling.

use indexmap::IndexMap;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use abm_core::PersonRng;

use crate::{ChoiceError, ChoiceResult};

/// Draw one alternative.
///
/// The cumulative-sum array is built over `leaves` in their fixed
/// declaration order; a uniform draw in `[0, 1)` is then resolved by binary
/// search to the first cumulative entry ≥ r.  Deterministic given the RNG
/// state, the model, and the probability map.
pub(crate) fn draw(
    leaves:        &[String],
    probabilities: &IndexMap<String, Decimal>,
    rng:           &mut PersonRng,
) -> ChoiceResult<String> {
    let prob_at = |i: usize| -> Decimal {
        probabilities
            .get(&leaves[i])
            .copied()
            .unwrap_or(Decimal::ZERO)
    };

    let mut cumulative = Vec::with_capacity(leaves.len());
    let mut running = Decimal::ZERO;
    for i in 0..leaves.len() {
        running += prob_at(i);
        cumulative.push(running);
    }

    if running.is_zero() {
        return Err(ChoiceError::NoAvailableAlternative);
    }

    let r = Decimal::from_f64(rng.uniform())
        .ok_or_else(|| ChoiceError::Numeric("uniform draw".into()))?;

    let mut idx = cumulative.partition_point(|c| *c < r);
    if idx >= leaves.len() {
        // r landed past the accumulated mass (the sum may undershoot 1 by a
        // rounding hair); fall back to the tail.
        idx = leaves.len() - 1;
    }
    // A zero-probability leaf can only be hit at r = 0 (leading zeros) or at
    // the clamped tail; step to the nearest leaf that carries mass.
    while idx + 1 < leaves.len() && prob_at(idx).is_zero() {
        idx += 1;
    }
    while idx > 0 && prob_at(idx).is_zero() {
        idx -= 1;
    }

    if prob_at(idx).is_zero() {
        return Err(ChoiceError::NoAvailableAlternative);
    }
    Ok(leaves[idx].clone())
}
