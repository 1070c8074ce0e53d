//! Red-biased logit perturbation and categorical sampling.
//!
//! Epistemic foundation:
//! - K_i: Bias is only applied where the step entropy is at least the threshold
//! - K_i: With a top-k gate, a red AND a blue token must both be in the top-k
//! - K_i: Sampling randomness comes only from the generator passed in

use crate::watermark::{entropy, softmax, top_k_indices};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sampler-level bias settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Logit bias added to red tokens
    pub delta: f64,
    /// Minimum entropy required to apply the bias
    pub entropy_threshold: f64,
    /// If set, require both red and blue tokens within top-k before biasing
    pub top_k: Option<usize>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            delta: 1.5,
            entropy_threshold: 2.0,
            top_k: Some(50),
        }
    }
}

/// Whether the entropy gate (and optional top-k gate) lets bias through.
pub fn gate_allows_bias(
    logits: &[f64],
    red_tokens: &BTreeSet<u32>,
    eligible_tokens: &BTreeSet<u32>,
    entropy_threshold: f64,
    top_k: Option<usize>,
) -> bool {
    let step_entropy = entropy(&softmax(logits));
    if step_entropy < entropy_threshold {
        return false;
    }
    let Some(k) = top_k else {
        return true;
    };

    let top = top_k_indices(logits, k);
    let is_red = |idx: &usize| red_tokens.contains(&(*idx as u32));
    let has_red = top.iter().any(is_red);
    let has_blue = top
        .iter()
        .any(|idx| eligible_tokens.contains(&(*idx as u32)) && !is_red(idx));
    has_red && has_blue
}

/// Apply the red-token logit bias under entropy gating.
///
/// Returns the logits unchanged when the gate is closed. Otherwise every
/// token in red ∩ eligible gets `delta` added; ids beyond the logit vector
/// are skipped.
pub fn apply_red_bias(
    logits: &[f64],
    red_tokens: &BTreeSet<u32>,
    eligible_tokens: &BTreeSet<u32>,
    config: &SamplerConfig,
) -> Vec<f64> {
    let mut adjusted = logits.to_vec();
    if !gate_allows_bias(
        logits,
        red_tokens,
        eligible_tokens,
        config.entropy_threshold,
        config.top_k,
    ) {
        return adjusted;
    }

    for &token in red_tokens.intersection(eligible_tokens) {
        if let Some(logit) = adjusted.get_mut(token as usize) {
            *logit += config.delta;
        }
    }
    adjusted
}

/// Sample a token id from logits by inverse-CDF over the softmax.
///
/// Emits the first index whose cumulative mass reaches a uniform draw in
/// [0, 1); the last index is the fallback for rounding shortfall.
pub fn sample_token<R: Rng + ?Sized>(logits: &[f64], rng: &mut R) -> u32 {
    let probs = softmax(logits);
    let threshold: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (idx, prob) in probs.iter().enumerate() {
        cumulative += prob;
        if cumulative >= threshold {
            return idx as u32;
        }
    }
    probs.len().saturating_sub(1) as u32
}

/// Fraction of eligible tokens in `tokens` that are red; 0.0 if none are eligible.
pub fn red_rate(
    tokens: &[u32],
    red_tokens: &BTreeSet<u32>,
    eligible_tokens: &BTreeSet<u32>,
) -> f64 {
    let (eligible_count, red_count) = tokens
        .iter()
        .filter(|token| eligible_tokens.contains(*token))
        .fold((0usize, 0usize), |(eligible, red), token| {
            (eligible + 1, red + usize::from(red_tokens.contains(token)))
        });
    if eligible_count == 0 {
        return 0.0;
    }
    red_count as f64 / eligible_count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::mock::StepRng;
    use rand_chacha::ChaCha20Rng;

    /// Generator whose every `f64` draw is `u` (exact for dyadic `u`).
    fn fixed_draw(u: f64) -> StepRng {
        StepRng::new(((u * (1u64 << 53) as f64) as u64) << 11, 0)
    }

    fn set(ids: &[u32]) -> BTreeSet<u32> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_apply_red_bias_uniform_logits() {
        let config = SamplerConfig {
            delta: 1.0,
            entropy_threshold: 0.0,
            top_k: None,
        };
        let biased = apply_red_bias(&[0.0; 5], &set(&[1, 2]), &set(&[1, 2, 3, 4]), &config);
        assert_eq!(biased, vec![0.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_apply_red_bias_noop_below_entropy_threshold() {
        let logits = [50.0, 0.0, 0.0, 0.0];
        for delta in [0.5, 10.0, -3.0] {
            let config = SamplerConfig {
                delta,
                entropy_threshold: 0.5,
                top_k: None,
            };
            let biased = apply_red_bias(&logits, &set(&[1, 2]), &set(&[1, 2, 3]), &config);
            assert_eq!(biased, logits.to_vec());
        }
    }

    #[test]
    fn test_apply_red_bias_only_red_and_eligible() {
        let config = SamplerConfig {
            delta: 2.0,
            entropy_threshold: 0.0,
            top_k: None,
        };
        // 0 is red but not eligible; 9 is out of range
        let biased = apply_red_bias(&[0.0; 4], &set(&[0, 1, 9]), &set(&[1, 2, 9]), &config);
        assert_eq!(biased, vec![0.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_top_k_gate_requires_red_and_blue() {
        let red = set(&[0]);
        let eligible = set(&[0, 1]);
        let config = SamplerConfig {
            delta: 1.0,
            entropy_threshold: 0.0,
            top_k: Some(2),
        };
        // Top-2 are {0, 2}: red present, no blue token
        let logits = [3.0, 0.0, 3.0, 0.0];
        assert_eq!(apply_red_bias(&logits, &red, &eligible, &config), logits.to_vec());

        // Top-2 are {0, 1}: both present
        let logits = [3.0, 3.0, 0.0, 0.0];
        assert_eq!(
            apply_red_bias(&logits, &red, &eligible, &config),
            vec![4.0, 3.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_gate_open_without_top_k() {
        assert!(gate_allows_bias(&[0.0; 3], &set(&[]), &set(&[]), 1.0, None));
        assert!(!gate_allows_bias(&[0.0; 3], &set(&[]), &set(&[]), 2.0, None));
    }

    #[test]
    fn test_sample_token_is_seeded() {
        let logits = [0.1, 0.5, 0.2, 0.9, 0.0];
        let draw = |seed| {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            (0..32).map(|_| sample_token(&logits, &mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(draw(3), draw(3));
        assert!(draw(3).iter().all(|&t| t < 5));
    }

    #[test]
    fn test_sample_token_dominant_logit() {
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        for _ in 0..16 {
            assert_eq!(sample_token(&[-1e9, 0.0, -1e9], &mut rng), 1);
        }
    }

    #[test]
    fn test_sample_token_inverse_cdf() {
        // probs [1/7, 2/7, 3/7, 1/7]; cumulative [0.143, 0.429, 0.857, 1.0]
        let logits = [1.0f64, 2.0, 3.0, 1.0].map(f64::ln);
        for (u, expected) in [(0.0, 0), (0.125, 0), (0.25, 1), (0.5, 2), (0.75, 2), (0.875, 3)] {
            assert_eq!(sample_token(&logits, &mut fixed_draw(u)), expected, "draw {u}");
        }
    }

    #[test]
    fn test_sample_token_empirical_frequencies() {
        let logits = [1.0f64, 2.0, 3.0, 1.0].map(f64::ln);
        let mut rng = ChaCha20Rng::seed_from_u64(12);
        let mut counts = [0usize; 4];
        let draws = 70_000;
        for _ in 0..draws {
            counts[sample_token(&logits, &mut rng) as usize] += 1;
        }
        for (count, weight) in counts.iter().zip([1.0, 2.0, 3.0, 1.0]) {
            let freq = *count as f64 / draws as f64;
            assert!((freq - weight / 7.0).abs() < 0.01, "{counts:?}");
        }
    }

    #[test]
    fn test_sample_token_falls_back_to_last_index() {
        // A NaN logit poisons every probability, so no cumulative mass
        // reaches the draw
        let logits = [0.0, f64::NAN, 0.0];
        assert_eq!(sample_token(&logits, &mut fixed_draw(0.0)), 2);
        assert_eq!(sample_token(&logits, &mut fixed_draw(0.5)), 2);
        assert_eq!(sample_token(&[], &mut fixed_draw(0.5)), 0);
    }

    #[test]
    fn test_red_rate() {
        let red = set(&[1, 2]);
        let eligible = set(&[1, 2, 3, 4]);
        assert_eq!(red_rate(&[0, 5, 6], &red, &eligible), 0.0);
        assert_eq!(red_rate(&[1, 2, 0, 2], &red, &eligible), 1.0);
        assert_eq!(red_rate(&[1, 3, 0], &red, &eligible), 0.5);
        assert_eq!(red_rate(&[], &red, &eligible), 0.0);
    }
}
