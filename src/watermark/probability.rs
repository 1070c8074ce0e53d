//! Numeric primitives over logit vectors.

use std::collections::HashSet;

/// Numerically stable softmax. Empty input yields an empty distribution.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max_logit = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp_vals: Vec<f64> = logits.iter().map(|&l| (l - max_logit).exp()).collect();
    let total: f64 = exp_vals.iter().sum();
    exp_vals.into_iter().map(|v| v / total).collect()
}

/// Numerically stable log-softmax.
pub fn log_softmax(logits: &[f64]) -> Vec<f64> {
    let max_logit = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let log_total = logits
        .iter()
        .map(|&l| (l - max_logit).exp())
        .sum::<f64>()
        .ln();
    logits.iter().map(|&l| l - max_logit - log_total).collect()
}

/// Shannon entropy in nats. Zero-probability entries contribute nothing.
pub fn entropy(probs: &[f64]) -> f64 {
    -probs
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| p * p.ln())
        .sum::<f64>()
}

/// Indices of the `k` largest logits; ties keep input order.
pub fn top_k_indices(logits: &[f64], k: usize) -> HashSet<usize> {
    if k == 0 {
        return HashSet::new();
    }
    let mut indexed: Vec<(usize, f64)> = logits.iter().copied().enumerate().collect();
    // sort_by is stable
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
    indexed.into_iter().take(k).map(|(idx, _)| idx).collect()
}
