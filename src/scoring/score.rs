//! Candidate scoring for best-of-N selection.
//!
//! Default score:
//! `-w_rate·|red_rate − target| + w_logprob·base_logprob − w_oddity·oddity_score`.
//! Higher is better.

use crate::models::{OddityFlags, ScoreWeights};
use crate::scoring::oddity_score;

/// Score a candidate with the default formula.
///
/// A missing `base_logprob` contributes 0.
pub fn score_candidate(
    red_rate_value: f64,
    target_red_rate: f64,
    base_logprob: Option<f64>,
    oddities: &OddityFlags,
    weights: &ScoreWeights,
) -> f64 {
    let distance = (red_rate_value - target_red_rate).abs();
    let base_component = base_logprob.unwrap_or(0.0);
    -weights.red_rate_weight * distance + weights.base_logprob_weight * base_component
        - weights.oddity_weight * oddity_score(oddities)
}

/// Scoring seam for candidate generation.
///
/// [`ScoreWeights`] scores with the default formula; any closure of the
/// same shape can replace it.
pub trait Scorer {
    fn score(
        &self,
        red_rate_value: f64,
        target_red_rate: f64,
        base_logprob: Option<f64>,
        oddities: &OddityFlags,
    ) -> f64;
}

impl Scorer for ScoreWeights {
    fn score(
        &self,
        red_rate_value: f64,
        target_red_rate: f64,
        base_logprob: Option<f64>,
        oddities: &OddityFlags,
    ) -> f64 {
        score_candidate(red_rate_value, target_red_rate, base_logprob, oddities, self)
    }
}

impl<F> Scorer for F
where
    F: Fn(f64, f64, Option<f64>, &OddityFlags) -> f64,
{
    fn score(
        &self,
        red_rate_value: f64,
        target_red_rate: f64,
        base_logprob: Option<f64>,
        oddities: &OddityFlags,
    ) -> f64 {
        self(red_rate_value, target_red_rate, base_logprob, oddities)
    }
}
