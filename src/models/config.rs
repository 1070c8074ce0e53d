//! Configuration models for redmark.
//!
//! All I^R (resolvable ignorance) is parameterized here.
//! The user resolves these unknowns at runtime via config file,
//! or programmatically through the plain value structs below.

use super::Oddity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Top-level configuration for redmark.
///
/// I^R resolved: All configurable parameters are explicit.
/// Every section is optional in the TOML file and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Eligible-vocabulary selection
    #[serde(default)]
    pub eligibility: EligibleTokenConfig,

    /// Red/blue split of the eligible vocabulary (the watermark key)
    #[serde(default)]
    pub partition: PartitionConfig,

    /// Entropy-gated logit bias applied by the teacher sampler
    #[serde(default)]
    pub bias: RedBiasConfig,

    /// Candidate scoring weights
    #[serde(default)]
    pub scoring: ScoreWeights,

    /// RL reward weights
    #[serde(default)]
    pub reward: RewardWeights,

    /// Candidate generation settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Best-of-N and preference-pair settings
    #[serde(default)]
    pub selection: SelectionConfig,
}

/// Default filler words excluded from the eligible vocabulary.
pub const DEFAULT_BANNED_FILLERS: [&str; 6] = ["uh", "um", "er", "ah", "like", "you know"];

/// Configuration for selecting eligible tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibleTokenConfig {
    /// Number of frequency-ranked vocabulary entries considered
    #[serde(default = "default_eligibility_top_k")]
    pub top_k: usize,

    /// Lower-cased token strings that are never eligible
    #[serde(default = "default_banned_fillers")]
    pub banned_fillers: BTreeSet<String>,

    /// Exclude tokens with any Unicode numeric character (`char::is_numeric`).
    /// This is wider than decimal digits: `½` and `Ⅻ` count too, which only
    /// matters when `exclude_non_ascii` is off.
    #[serde(default = "default_true")]
    pub exclude_digits: bool,

    #[serde(default = "default_true")]
    pub exclude_punctuation: bool,

    #[serde(default = "default_true")]
    pub exclude_whitespace: bool,

    #[serde(default = "default_true")]
    pub exclude_non_ascii: bool,
}

fn default_eligibility_top_k() -> usize {
    5000
}

fn default_banned_fillers() -> BTreeSet<String> {
    DEFAULT_BANNED_FILLERS.iter().map(|s| s.to_string()).collect()
}

fn default_true() -> bool {
    true
}

impl Default for EligibleTokenConfig {
    fn default() -> Self {
        Self {
            top_k: default_eligibility_top_k(),
            banned_fillers: default_banned_fillers(),
            exclude_digits: true,
            exclude_punctuation: true,
            exclude_whitespace: true,
            exclude_non_ascii: true,
        }
    }
}

impl EligibleTokenConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::invalid("eligibility.top_k", "must be > 0"));
        }
        Ok(())
    }
}

/// Seed for the red/blue partition.
///
/// K_i: Same seed + same eligible set → identical partition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartitionConfig {
    #[serde(default)]
    pub seed: u64,
}

/// Configuration for red-biased sampling.
///
/// Set `top_k_gate = false` (or `top_k = None` in code) to bias on the
/// entropy gate alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedBiasConfig {
    /// Logit boost added to red tokens
    #[serde(default = "default_delta")]
    pub delta: f64,

    /// Minimum step entropy (nats) required to bias
    #[serde(default = "default_entropy_threshold")]
    pub entropy_threshold: f64,

    /// Require both a red and a blue token in the top-k logits before biasing
    #[serde(default = "default_bias_top_k")]
    pub top_k: Option<usize>,

    /// Switch for the top-k gate; `false` ignores `top_k`
    #[serde(default = "default_true")]
    pub top_k_gate: bool,

    /// Number of tokens generated per sample
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_delta() -> f64 {
    1.5
}

fn default_entropy_threshold() -> f64 {
    2.0
}

fn default_bias_top_k() -> Option<usize> {
    Some(50)
}

fn default_max_tokens() -> usize {
    256
}

impl Default for RedBiasConfig {
    fn default() -> Self {
        Self {
            delta: default_delta(),
            entropy_threshold: default_entropy_threshold(),
            top_k: default_bias_top_k(),
            top_k_gate: true,
            max_tokens: default_max_tokens(),
        }
    }
}

impl RedBiasConfig {
    /// The top-k gate actually in force.
    pub fn effective_top_k(&self) -> Option<usize> {
        self.top_k.filter(|_| self.top_k_gate)
    }

    /// Reject malformed values up front; nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.delta.is_finite() {
            return Err(ConfigError::invalid("bias.delta", "must be finite"));
        }
        if !self.entropy_threshold.is_finite() {
            return Err(ConfigError::invalid(
                "bias.entropy_threshold",
                "must be finite",
            ));
        }
        if self.effective_top_k() == Some(0) {
            return Err(ConfigError::invalid("bias.top_k", "must be > 0 when set"));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::invalid("bias.max_tokens", "must be > 0"));
        }
        Ok(())
    }
}

/// Weights for the default candidate score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_weight")]
    pub red_rate_weight: f64,

    #[serde(default = "default_weight")]
    pub base_logprob_weight: f64,

    #[serde(default = "default_weight")]
    pub oddity_weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            red_rate_weight: 1.0,
            base_logprob_weight: 1.0,
            oddity_weight: 1.0,
        }
    }
}

impl ScoreWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("scoring.red_rate_weight", self.red_rate_weight),
            ("scoring.base_logprob_weight", self.base_logprob_weight),
            ("scoring.oddity_weight", self.oddity_weight),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::invalid(field, "must be finite"));
            }
        }
        Ok(())
    }
}

/// Weights for the RL reward (no log-probability term).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardWeights {
    #[serde(default = "default_weight")]
    pub red_rate_weight: f64,

    #[serde(default = "default_weight")]
    pub oddity_weight: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            red_rate_weight: 1.0,
            oddity_weight: 1.0,
        }
    }
}

impl RewardWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.red_rate_weight.is_finite() {
            return Err(ConfigError::invalid("reward.red_rate_weight", "must be finite"));
        }
        if !self.oddity_weight.is_finite() {
            return Err(ConfigError::invalid("reward.oddity_weight", "must be finite"));
        }
        Ok(())
    }
}

/// Candidate generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Red rate the selection step steers towards (0.0 - 1.0)
    #[serde(default = "default_target_red_rate")]
    pub target_red_rate: f64,

    /// Number of completions generated per prompt
    #[serde(default = "default_samples_per_prompt")]
    pub samples_per_prompt: usize,

    /// Base seed; per-sample seeds are derived from it
    #[serde(default)]
    pub rng_seed: u64,

    /// Score each candidate's likelihood under the unbiased model
    #[serde(default = "default_true")]
    pub compute_base_logprob: bool,

    /// Show a progress bar while generating
    #[serde(default)]
    pub show_progress: bool,
}

fn default_target_red_rate() -> f64 {
    0.8
}

fn default_samples_per_prompt() -> usize {
    4
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            target_red_rate: default_target_red_rate(),
            samples_per_prompt: default_samples_per_prompt(),
            rng_seed: 0,
            compute_base_logprob: true,
            show_progress: false,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.target_red_rate) {
            return Err(ConfigError::invalid(
                "generation.target_red_rate",
                "must be within [0, 1]",
            ));
        }
        if self.samples_per_prompt == 0 {
            return Err(ConfigError::invalid(
                "generation.samples_per_prompt",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

/// Best-of-N and preference-pair configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Samples kept per prompt for the SFT dataset
    #[serde(default = "default_best_of_n")]
    pub best_of_n: usize,

    /// Pairs emitted per prompt (identical copies of the best/worst pair)
    #[serde(default = "default_max_pairs_per_prompt")]
    pub max_pairs_per_prompt: usize,

    /// Oddities that do not disqualify a chosen sample nor qualify a rejected one
    #[serde(default)]
    pub allowed_oddities: Vec<Oddity>,
}

fn default_best_of_n() -> usize {
    1
}

fn default_max_pairs_per_prompt() -> usize {
    1
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            best_of_n: default_best_of_n(),
            max_pairs_per_prompt: default_max_pairs_per_prompt(),
            allowed_oddities: Vec::new(),
        }
    }
}

impl SelectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.best_of_n == 0 {
            return Err(ConfigError::invalid("selection.best_of_n", "must be > 0"));
        }
        if self.max_pairs_per_prompt == 0 {
            return Err(ConfigError::invalid(
                "selection.max_pairs_per_prompt",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// B_i(file exists) → Result
    /// B_i(file is valid TOML) → Result
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.eligibility.validate()?;
        self.bias.validate()?;
        self.scoring.validate()?;
        self.reward.validate()?;
        self.generation.validate()?;
        self.selection.validate()
    }
}

/// Configuration errors.
///
/// Epistemic origin:
/// - B_i falsified: File not found, parse error
/// - K_i violated: A value outside its contract
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.bias.delta, 1.5);
        assert_eq!(config.bias.top_k, Some(50));
        assert_eq!(config.eligibility.top_k, 5000);
        assert!(config.eligibility.banned_fillers.contains("you know"));
        assert_eq!(config.selection.max_pairs_per_prompt, 1);
    }

    #[test]
    fn test_from_file_partial_sections() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[bias]
delta = 3.0
max_tokens = 16

[selection]
best_of_n = 2
allowed_oddities = ["mixed_script"]
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.bias.delta, 3.0);
        assert_eq!(config.bias.max_tokens, 16);
        assert_eq!(config.bias.entropy_threshold, 2.0);
        assert_eq!(config.bias.top_k, Some(50));
        assert_eq!(config.selection.best_of_n, 2);
        assert_eq!(config.selection.allowed_oddities, vec![Oddity::MixedScript]);
        assert_eq!(config.generation.samples_per_prompt, 4);
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file(std::path::Path::new("/nonexistent/redmark.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_from_file_bad_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[bias\ndelta = ").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_max_tokens() {
        let config = Config {
            bias: RedBiasConfig {
                max_tokens: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bias.max_tokens"));
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let bias = RedBiasConfig {
            top_k: Some(0),
            ..Default::default()
        };
        assert!(bias.validate().is_err());

        let bias = RedBiasConfig {
            top_k: None,
            ..Default::default()
        };
        assert!(bias.validate().is_ok());
    }

    #[test]
    fn test_top_k_gate_switch_from_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[bias]
top_k = 0
top_k_gate = false
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert!(!config.bias.top_k_gate);
        assert_eq!(config.bias.effective_top_k(), None);
        config.validate().unwrap();
        assert_eq!(Config::default().bias.effective_top_k(), Some(50));
    }

    #[test]
    fn test_validate_rejects_out_of_range_target() {
        let generation = GenerationConfig {
            target_red_rate: 1.5,
            ..Default::default()
        };
        assert!(generation.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite_weights() {
        let scoring = ScoreWeights {
            oddity_weight: f64::NAN,
            ..Default::default()
        };
        assert!(scoring.validate().is_err());
    }
}
