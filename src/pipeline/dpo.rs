//! DPO (Direct Preference Optimization) pair construction.
//!
//! Strategy: group all candidates by prompt, rank by score, then pair the
//! best oddity-free sample (chosen) with the worst oddity-flagged sample
//! (rejected).
//!
//! K_i: A prompt with no oddity-free or no oddity-flagged sample yields no pair.
//! K_i: `max_pairs_per_prompt > 1` repeats the same pair.

use crate::models::{DpoPair, Oddity, Sample};
use crate::pipeline::select::{group_by_prompt, rank_by_score};
use crate::scoring::any_oddities;
use tracing::debug;

/// Build preference pairs, treating every oddity as disqualifying.
pub fn build_dpo_pairs(samples: &[Sample], max_pairs_per_prompt: usize) -> Vec<DpoPair> {
    build_dpo_pairs_allowing(samples, max_pairs_per_prompt, &[])
}

/// Build preference pairs, ignoring the `allowed` oddities.
pub fn build_dpo_pairs_allowing(
    samples: &[Sample],
    max_pairs_per_prompt: usize,
    allowed: &[Oddity],
) -> Vec<DpoPair> {
    let mut pairs = Vec::new();

    for (prompt, mut group) in group_by_prompt(samples) {
        rank_by_score(&mut group);

        let chosen = group
            .iter()
            .find(|sample| !any_oddities(&sample.oddities, allowed));
        let rejected = group
            .iter()
            .rev()
            .find(|sample| any_oddities(&sample.oddities, allowed));

        let (Some(chosen), Some(rejected)) = (chosen, rejected) else {
            debug!(
                prompt,
                candidates = group.len(),
                has_chosen = chosen.is_some(),
                has_rejected = rejected.is_some(),
                "No preference pair for prompt"
            );
            continue;
        };

        let pair = DpoPair::from_samples(prompt, chosen, rejected);
        pairs.extend(std::iter::repeat(pair).take(max_pairs_per_prompt));
    }

    pairs
}
