//! Reward for KL-constrained RL fine-tuning.
//!
//! Same sign conventions as the candidate score, without the
//! log-probability term.

use crate::models::{OddityFlags, RewardWeights};
use crate::scoring::oddity_score;

pub fn reward(
    red_rate_value: f64,
    target_red_rate: f64,
    oddities: &OddityFlags,
    weights: &RewardWeights,
) -> f64 {
    -weights.red_rate_weight * (red_rate_value - target_red_rate).abs()
        - weights.oddity_weight * oddity_score(oddities)
}

/// Episode reward with default weights.
pub fn compute_episode_reward(
    red_rate_value: f64,
    target_red_rate: f64,
    oddities: &OddityFlags,
) -> f64 {
    reward(
        red_rate_value,
        target_red_rate,
        oddities,
        &RewardWeights::default(),
    )
}
