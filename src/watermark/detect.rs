//! Red-rate watermark detection.
//!
//! Under the null hypothesis (unwatermarked text) each eligible token is red
//! with probability |red ∩ eligible| / |eligible|. A one-proportion z-test on
//! the observed red count measures how far a text departs from that.

use crate::watermark::red_rate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default z-score above which a text is reported as watermarked.
pub const DEFAULT_Z_THRESHOLD: f64 = 4.0;

/// Detection result for a token sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Tokens that belong to the eligible set
    pub eligible_count: usize,
    /// Eligible tokens that are red
    pub red_count: usize,
    /// Observed red rate (0.0 if nothing was eligible)
    pub red_rate: f64,
    /// Red rate expected from unwatermarked text
    pub expected_ratio: f64,
    /// One-proportion z-score (0.0 when undefined)
    pub z_score: f64,
}

impl DetectionReport {
    pub fn is_watermarked(&self, z_threshold: f64) -> bool {
        self.z_score > z_threshold
    }
}

/// Score `tokens` against a red/eligible key.
pub fn detect(
    tokens: &[u32],
    red_tokens: &BTreeSet<u32>,
    eligible_tokens: &BTreeSet<u32>,
) -> DetectionReport {
    let eligible_count = tokens
        .iter()
        .filter(|t| eligible_tokens.contains(*t))
        .count();
    let red_count = tokens
        .iter()
        .filter(|t| eligible_tokens.contains(*t) && red_tokens.contains(*t))
        .count();

    let expected_ratio = if eligible_tokens.is_empty() {
        0.0
    } else {
        red_tokens.intersection(eligible_tokens).count() as f64 / eligible_tokens.len() as f64
    };

    let n = eligible_count as f64;
    let variance = n * expected_ratio * (1.0 - expected_ratio);
    let z_score = if variance > 0.0 {
        (red_count as f64 - n * expected_ratio) / variance.sqrt()
    } else {
        0.0
    };

    DetectionReport {
        eligible_count,
        red_count,
        red_rate: red_rate(tokens, red_tokens, eligible_tokens),
        expected_ratio,
        z_score,
    }
}
