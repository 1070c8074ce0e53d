//! Sample and result types for redmark.
//!
//! K_i: These types represent the core data flow through the pipeline.
//! All of them are immutable once produced.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One degenerate-text heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Oddity {
    /// Too many all-uppercase words
    CapsWeirdness,
    /// Starts with a disfluency marker ("uh ", "um ", ...)
    FillerPrefix,
    /// Mixes ASCII and non-ASCII characters
    MixedScript,
    /// Looks like garbled numeric output
    NumberCorruption,
    /// Runs of three or more `!` / `?`
    RepeatedPunct,
}

impl Oddity {
    pub const ALL: [Oddity; 5] = [
        Oddity::CapsWeirdness,
        Oddity::FillerPrefix,
        Oddity::MixedScript,
        Oddity::NumberCorruption,
        Oddity::RepeatedPunct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Oddity::CapsWeirdness => "caps_weirdness",
            Oddity::FillerPrefix => "filler_prefix",
            Oddity::MixedScript => "mixed_script",
            Oddity::NumberCorruption => "number_corruption",
            Oddity::RepeatedPunct => "repeated_punct",
        }
    }
}

impl fmt::Display for Oddity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Oddity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Oddity::ALL
            .into_iter()
            .find(|oddity| oddity.as_str() == s)
            .ok_or_else(|| format!("unknown oddity: {s:?}"))
    }
}

/// Oddity flags computed over a completion.
///
/// K_i: Five independent booleans; see [`crate::scoring::detect_oddities`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OddityFlags {
    pub caps_weirdness: bool,
    pub filler_prefix: bool,
    pub mixed_script: bool,
    pub number_corruption: bool,
    pub repeated_punct: bool,
}

impl OddityFlags {
    /// Analyze a completion and compute its flags.
    pub fn from_text(text: &str) -> Self {
        crate::scoring::detect_oddities(text)
    }

    pub fn get(&self, oddity: Oddity) -> bool {
        match oddity {
            Oddity::CapsWeirdness => self.caps_weirdness,
            Oddity::FillerPrefix => self.filler_prefix,
            Oddity::MixedScript => self.mixed_script,
            Oddity::NumberCorruption => self.number_corruption,
            Oddity::RepeatedPunct => self.repeated_punct,
        }
    }

    /// Flags in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Oddity, bool)> + '_ {
        Oddity::ALL.into_iter().map(move |oddity| (oddity, self.get(oddity)))
    }

    /// Oddities that are set.
    pub fn active(&self) -> Vec<Oddity> {
        self.iter().filter(|(_, set)| *set).map(|(o, _)| o).collect()
    }
}

/// A scored candidate produced by the candidate generator.
///
/// K_i: A sample is the result of one seeded teacher generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Prompt text
    pub prompt: String,

    /// Decoded text of the full token sequence (prompt + continuation)
    pub completion: String,

    /// Full token sequence (prompt + continuation)
    pub token_ids: Vec<u32>,

    /// Number of leading prompt tokens in `token_ids`
    pub prompt_len: usize,

    /// Seed the teacher sampled with
    pub seed: u64,

    /// Fraction of eligible tokens that are red (0.0 - 1.0)
    pub red_rate: f64,

    /// Log-probability of the sequence under the unbiased model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_logprob: Option<f64>,

    /// Degenerate-text heuristics
    pub oddities: OddityFlags,

    /// Selection score (higher is better)
    pub score: f64,

    /// RL reward under the `[reward]` weights
    #[serde(default)]
    pub reward: f64,
}

impl Sample {
    /// Generated continuation, without the prompt tokens.
    pub fn continuation_ids(&self) -> &[u32] {
        &self.token_ids[self.prompt_len.min(self.token_ids.len())..]
    }
}

/// SFT example (selected sample for supervised fine-tuning).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SftExample {
    pub prompt: String,
    pub completion: String,
}

impl From<&Sample> for SftExample {
    fn from(sample: &Sample) -> Self {
        Self {
            prompt: sample.prompt.clone(),
            completion: sample.completion.clone(),
        }
    }
}

/// DPO preference pair (chosen vs rejected for preference learning).
///
/// K_i: Chosen is oddity-free, rejected carries at least one oddity,
/// both answer the same prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DpoPair {
    /// Prompt (same for both)
    pub prompt: String,

    /// Chosen completion (best oddity-free sample)
    pub chosen: String,

    /// Rejected completion (worst oddity-flagged sample)
    pub rejected: String,

    /// Score of chosen completion
    pub chosen_score: f64,

    /// Score of rejected completion
    pub rejected_score: f64,
}

impl DpoPair {
    /// Create a DPO pair from two scored samples.
    pub fn from_samples(prompt: &str, chosen: &Sample, rejected: &Sample) -> Self {
        Self {
            prompt: prompt.to_string(),
            chosen: chosen.completion.clone(),
            rejected: rejected.completion.clone(),
            chosen_score: chosen.score,
            rejected_score: rejected.score,
        }
    }
}

/// Statistics for a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Distinct prompts processed
    pub total_prompts: usize,

    /// Candidates generated
    pub total_candidates: usize,

    /// Candidates kept by best-of-N
    pub total_selected: usize,

    /// Preference pairs emitted
    pub total_pairs: usize,

    /// Prompts that yielded no preference pair
    pub prompts_without_pairs: usize,

    /// Candidates with at least one oddity
    pub oddity_candidates: usize,

    /// Sum of candidate red rates (used by `finalize`)
    #[serde(skip)]
    pub red_rate_sum: f64,

    /// Mean red rate over all candidates
    pub mean_red_rate: f64,

    /// Total runtime in seconds
    pub runtime_secs: f64,
}

impl RunStats {
    /// Calculate derived stats.
    pub fn finalize(&mut self) {
        if self.total_candidates > 0 {
            self.mean_red_rate = self.red_rate_sum / self.total_candidates as f64;
        }
    }
}
