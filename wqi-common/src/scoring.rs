//! Rule-based Water Quality Index
//!
//! Each field earns a subindex in [0, 100]: 100 inside its ideal band, then a
//! linear decay reaching 0 at `tol` past the nearest bound. The index is the
//! weighted sum of subindices, clamped to [0, 100] and rounded.
//!
//! Absent fields contribute 0 and never raise, so partially observed records
//! can still be scored during synthesis and analysis.

use crate::params::{ParameterSet, PartialParameterSet};
use crate::rules::{ParamRule, RuleTable};

/// Subindex in [0, 100] for a single value
///
/// NaN is treated as absent (0). Infinite values decay to 0.
pub fn subindex(value: f64, rule: &ParamRule) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    if rule.min <= value && value <= rule.max {
        return 100.0;
    }

    let deviation = if value < rule.min {
        rule.min - value
    } else {
        value - rule.max
    };
    let fraction = deviation / rule.tol;
    (100.0 * (1.0 - fraction)).max(0.0)
}

/// Unrounded weighted sum, clamped to [0, 100]
pub fn weighted_score(params: &PartialParameterSet, rules: &RuleTable) -> f64 {
    let sum: f64 = rules
        .iter()
        .filter_map(|(field, rule)| params.get(field).map(|v| subindex(v, rule) * rule.weight))
        .sum();
    sum.clamp(0.0, 100.0)
}

/// Index for a partially observed record
///
/// Exact halves round to the even integer.
pub fn score_partial(params: &PartialParameterSet, rules: &RuleTable) -> u8 {
    weighted_score(params, rules).round_ties_even() as u8
}

/// Index for a complete reading
pub fn score(params: &ParameterSet, rules: &RuleTable) -> u8 {
    score_partial(&PartialParameterSet::from(*params), rules)
}
