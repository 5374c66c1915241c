//! Utility and probability computation — flat and two-level nested logit.
//!
//! All arithmetic is `Decimal`: the exp/ln/pow chains of nested logit are
//! where float drift would accumulate, so the whole pipeline stays in
//! arbitrary-precision decimals until probabilities are consumed.

use indexmap::IndexMap;
use rust_decimal::{Decimal, MathematicalOps};

use crate::expr::{Bindings, Expr};
use crate::tree::ChoiceTree;
use crate::{ChoiceError, ChoiceResult};

/// Series cutoff for `exp` — tight enough that probability sums hold the
/// documented 1e-9 invariant with margin.
fn exp_tolerance() -> Decimal {
    Decimal::new(1, 12)
}

fn dec_exp(x: Decimal) -> ChoiceResult<Decimal> {
    // Decimal has no subnormal range: below this bound exp underflows past
    // the 28-digit mantissa and the true rounding is an exact zero.  Heavily
    // penalized alternatives (unavailable-skim travel times) land here.
    if x < Decimal::from(-60) {
        return Ok(Decimal::ZERO);
    }
    x.checked_exp_with_tolerance(exp_tolerance())
        .ok_or_else(|| ChoiceError::Numeric(format!("exp({x})")))
}

fn dec_ln(x: Decimal) -> ChoiceResult<Decimal> {
    x.checked_ln()
        .ok_or_else(|| ChoiceError::Numeric(format!("ln({x})")))
}

/// `base^exponent` for positive `base`, via exp/ln at the same tolerance as
/// every other exp in the chain.
fn dec_pow(base: Decimal, exponent: Decimal) -> ChoiceResult<Decimal> {
    dec_exp(exponent * dec_ln(base)?)
}

fn scale_of(scales: &IndexMap<String, Decimal>, nest: &str) -> ChoiceResult<Decimal> {
    let mu = scales.get(nest).copied().unwrap_or(Decimal::ONE);
    if mu.is_zero() {
        return Err(ChoiceError::Numeric(format!("zero scale for nest {nest:?}")));
    }
    Ok(mu)
}

// ── Utilities ─────────────────────────────────────────────────────────────────

/// Evaluate every utility in the tree, bottom-up.
///
/// Unavailable leaves get utility exactly 0 without evaluating their formula.
/// A nest's utility is the logsum of its children:
/// `ln(Σ exp(mu · u_child)) / mu`.  The returned map records every computed
/// utility — leaves and nests — for diagnostics.
pub(crate) fn utilities(
    tree:         &ChoiceTree,
    exprs:        &IndexMap<String, Expr>,
    formulas:     &IndexMap<String, String>,
    bindings:     &Bindings<'_>,
    availability: &IndexMap<String, Decimal>,
    scales:       &IndexMap<String, Decimal>,
) -> ChoiceResult<IndexMap<String, Decimal>> {
    let mut out = IndexMap::new();
    eval_level(tree, exprs, formulas, bindings, availability, scales, &mut out)?;
    Ok(out)
}

/// Evaluate one tree level; returns the utilities of this level's members in
/// declaration order, recording every value in `out` as a side effect.
fn eval_level(
    tree:         &ChoiceTree,
    exprs:        &IndexMap<String, Expr>,
    formulas:     &IndexMap<String, String>,
    bindings:     &Bindings<'_>,
    availability: &IndexMap<String, Decimal>,
    scales:       &IndexMap<String, Decimal>,
    out:          &mut IndexMap<String, Decimal>,
) -> ChoiceResult<Vec<Decimal>> {
    match tree {
        ChoiceTree::Leaves(leaves) => {
            let mut level = Vec::with_capacity(leaves.len());
            for leaf in leaves {
                let available = availability
                    .get(leaf)
                    .is_none_or(|av| !av.is_zero());
                let utility = if available {
                    let expr = exprs.get(leaf).ok_or_else(|| {
                        ChoiceError::ModelDefinition(format!("no utility formula for {leaf:?}"))
                    })?;
                    expr.evaluate(bindings).map_err(|e| ChoiceError::FormulaEvaluation {
                        alternative: leaf.clone(),
                        formula:     formulas.get(leaf).cloned().unwrap_or_default(),
                        reason:      e.to_string(),
                    })?
                } else {
                    Decimal::ZERO
                };
                out.insert(leaf.clone(), utility);
                level.push(utility);
            }
            Ok(level)
        }
        ChoiceTree::Nests(nests) => {
            let mut level = Vec::with_capacity(nests.len());
            let mut nest_values = Vec::with_capacity(nests.len());
            for (nest, subtree) in nests {
                let children =
                    eval_level(subtree, exprs, formulas, bindings, availability, scales, out)?;
                let mu = scale_of(scales, nest)?;

                let mut logsum_arg = Decimal::ZERO;
                for child in children {
                    logsum_arg += dec_exp(mu * child)?;
                }
                let utility = dec_ln(logsum_arg)? / mu;
                nest_values.push((nest.clone(), utility));
                level.push(utility);
            }
            // Nest utilities are recorded after all their children, matching
            // the bottom-up evaluation order.
            for (nest, utility) in nest_values {
                out.insert(nest, utility);
            }
            Ok(level)
        }
    }
}

// ── Probabilities ─────────────────────────────────────────────────────────────

/// Derive the probability of every leaf.
///
/// Flat choice sets use multinomial logit with `mu = 1`; nested sets use the
/// two-level nested-logit formula.  Raises `NoAvailableAlternative` when the
/// entire denominator vanishes — a zero-probability distribution must never
/// reach the sampler.
pub(crate) fn probabilities(
    tree:         &ChoiceTree,
    utilities:    &IndexMap<String, Decimal>,
    availability: &IndexMap<String, Decimal>,
    scales:       &IndexMap<String, Decimal>,
) -> ChoiceResult<IndexMap<String, Decimal>> {
    let out = match tree {
        ChoiceTree::Leaves(leaves) => flat_probabilities(leaves, utilities, availability)?,
        ChoiceTree::Nests(nests) => nested_probabilities(nests, utilities, availability, scales)?,
    };

    debug_assert!(
        {
            let total: Decimal = out.values().copied().sum();
            (total - Decimal::ONE).abs() <= Decimal::new(1, 9)
        },
        "leaf probabilities must sum to 1"
    );
    Ok(out)
}

fn flat_probabilities(
    leaves:       &[String],
    utilities:    &IndexMap<String, Decimal>,
    availability: &IndexMap<String, Decimal>,
) -> ChoiceResult<IndexMap<String, Decimal>> {
    let mut numerators = IndexMap::with_capacity(leaves.len());
    let mut denominator = Decimal::ZERO;

    for leaf in leaves {
        let av = availability.get(leaf).copied().unwrap_or(Decimal::ONE);
        let u = utilities.get(leaf).copied().unwrap_or(Decimal::ZERO);
        let numerator = av * dec_exp(u)?;
        denominator += numerator;
        numerators.insert(leaf.clone(), numerator);
    }

    if denominator.is_zero() {
        return Err(ChoiceError::NoAvailableAlternative);
    }

    let mut out = IndexMap::with_capacity(leaves.len());
    for (leaf, numerator) in numerators {
        let p = numerator
            .checked_div(denominator)
            .ok_or_else(|| ChoiceError::Numeric("flat probability".into()))?;
        out.insert(leaf, p);
    }
    Ok(out)
}

fn nested_probabilities(
    nests:        &IndexMap<String, ChoiceTree>,
    utilities:    &IndexMap<String, Decimal>,
    availability: &IndexMap<String, Decimal>,
    scales:       &IndexMap<String, Decimal>,
) -> ChoiceResult<IndexMap<String, Decimal>> {
    struct NestTerms<'a> {
        outer:      Decimal,
        numerators: Vec<(&'a str, Decimal)>,
    }

    let mut terms = Vec::with_capacity(nests.len());
    let mut grand_sum = Decimal::ZERO;

    for (nest, subtree) in nests {
        // Load-time validation caps nesting at two levels, so every nest
        // holds leaves here.
        let leaves = match subtree {
            ChoiceTree::Leaves(leaves) => leaves,
            ChoiceTree::Nests(_) => {
                return Err(ChoiceError::ModelDefinition(format!(
                    "nest {nest:?} is deeper than the two-level probability supports"
                )));
            }
        };

        let mu = scale_of(scales, nest)?;
        let mut nest_sum = Decimal::ZERO;
        let mut numerators = Vec::with_capacity(leaves.len());
        for leaf in leaves {
            let av = availability.get(leaf).copied().unwrap_or(Decimal::ONE);
            let u = utilities.get(leaf).copied().unwrap_or(Decimal::ZERO);
            let numerator = av * dec_exp(mu * u)?;
            nest_sum += numerator;
            numerators.push((leaf.as_str(), numerator));
        }

        // D_k^(1/mu − 1) is computed once and reused for both the grand sum
        // (as D_k^(1/mu) = D_k · D_k^(1/mu − 1)) and each leaf's numerator
        // factor, so the leaf probabilities sum to grand/grand exactly.
        let outer = if nest_sum.is_zero() {
            Decimal::ZERO
        } else {
            dec_pow(nest_sum, Decimal::ONE / mu - Decimal::ONE)?
        };
        grand_sum += outer * nest_sum;
        terms.push(NestTerms { outer, numerators });
    }

    if grand_sum.is_zero() {
        return Err(ChoiceError::NoAvailableAlternative);
    }

    let mut out = IndexMap::new();
    for NestTerms { outer, numerators } in terms {
        // A fully unavailable nest has outer = 0: its members get P = 0.
        let factor = outer
            .checked_div(grand_sum)
            .ok_or_else(|| ChoiceError::Numeric("nested probability".into()))?;
        for (leaf, numerator) in numerators {
            out.insert(leaf.to_string(), numerator * factor);
        }
    }
    Ok(out)
}
