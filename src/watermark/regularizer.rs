//! Loss terms for red-mass regularization.
//!
//! Pure scoring functions over probability vectors; no training loop.

use std::collections::BTreeSet;

/// Logarithm offset keeping zero-mass terms finite.
pub const LOG_EPSILON: f64 = 1e-8;

/// Total probability assigned to red tokens. Ids beyond `probs` contribute nothing.
pub fn red_mass(probs: &[f64], red_tokens: &BTreeSet<u32>) -> f64 {
    red_tokens
        .iter()
        .filter_map(|&token| probs.get(token as usize))
        .sum()
}

/// `-ln(red_mass + epsilon)`: large but finite when red mass is zero.
pub fn red_regularizer(probs: &[f64], red_tokens: &BTreeSet<u32>, epsilon: f64) -> f64 {
    -(red_mass(probs, red_tokens) + epsilon).ln()
}

/// `KL(p ‖ q)` with `epsilon` added inside both logarithms.
///
/// Pairs are consumed up to the shorter of the two vectors.
pub fn kl_divergence(p: &[f64], q: &[f64], epsilon: f64) -> f64 {
    p.iter()
        .zip(q)
        .map(|(&p_i, &q_i)| p_i * ((p_i + epsilon).ln() - (q_i + epsilon).ln()))
        .sum()
}
