//! Red-biased teacher sampler with entropy gating.
//!
//! Per step: logits → gate → (bias) → seeded sample → append.
//! Runs exactly `max_tokens` steps; any end-of-text policy belongs to
//! the model adapter.
//!
//! The teacher gates with its own [`RedBiasConfig`] and then hands the
//! logits to [`apply_red_bias`], which gates again with the sampler-level
//! [`SamplerConfig`]. Both must agree for a step to be biased.

use crate::client::LanguageModel;
use crate::models::{RedBiasConfig, Result, WatermarkError};
use crate::watermark::{
    Partition, SamplerConfig, apply_red_bias, gate_allows_bias, red_rate, sample_token,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Output of one teacher generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Prompt ids followed by the generated continuation
    pub token_ids: Vec<u32>,
    /// Number of prompt ids at the front of `token_ids`
    pub prompt_len: usize,
    /// Steps where the bias was applied
    pub biased_steps: usize,
}

/// Teacher sampler that applies logit bias under entropy gating.
pub struct RedBiasedTeacher<M> {
    model: M,
    red_tokens: BTreeSet<u32>,
    eligible_tokens: BTreeSet<u32>,
    config: RedBiasConfig,
    /// Largest id the logit vector must cover
    max_token: Option<u32>,
}

impl<M: LanguageModel> RedBiasedTeacher<M> {
    /// Create a teacher; the config is validated here.
    pub fn new(
        model: M,
        red_tokens: BTreeSet<u32>,
        eligible_tokens: BTreeSet<u32>,
        config: RedBiasConfig,
    ) -> Result<Self> {
        config.validate()?;
        if red_tokens.is_disjoint(&eligible_tokens) {
            warn!(
                red = red_tokens.len(),
                eligible = eligible_tokens.len(),
                "No red token is eligible; generations will be unbiased"
            );
        }
        let max_token = red_tokens.last().max(eligible_tokens.last()).copied();
        Ok(Self {
            model,
            red_tokens,
            eligible_tokens,
            config,
            max_token,
        })
    }

    /// Create a teacher keyed by a red/blue partition.
    pub fn from_partition(model: M, partition: &Partition, config: RedBiasConfig) -> Result<Self> {
        Self::new(model, partition.red.clone(), partition.eligible(), config)
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn red_tokens(&self) -> &BTreeSet<u32> {
        &self.red_tokens
    }

    pub fn eligible_tokens(&self) -> &BTreeSet<u32> {
        &self.eligible_tokens
    }

    pub fn config(&self) -> &RedBiasConfig {
        &self.config
    }

    /// Sampler-level settings derived from the teacher config.
    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            delta: self.config.delta,
            entropy_threshold: self.config.entropy_threshold,
            top_k: self.config.effective_top_k(),
        }
    }

    fn should_bias(&self, logits: &[f64]) -> bool {
        gate_allows_bias(
            logits,
            &self.red_tokens,
            &self.eligible_tokens,
            self.config.entropy_threshold,
            self.config.effective_top_k(),
        )
    }

    fn check_logits(&self, logits: &[f64]) -> Result<()> {
        if logits.is_empty() {
            return Err(WatermarkError::EmptyLogits);
        }
        match self.max_token {
            Some(token) if token as usize >= logits.len() => Err(WatermarkError::TokenOutOfRange {
                token,
                vocab_size: logits.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Run one decoding step on `input_ids`, appending the sampled token.
    ///
    /// Returns whether the bias was applied.
    pub fn step<R: Rng + ?Sized>(&self, input_ids: &mut Vec<u32>, rng: &mut R) -> Result<bool> {
        let mut logits = self.model.next_logits(input_ids)?;
        self.check_logits(&logits)?;

        let biased = self.should_bias(&logits);
        if biased {
            logits = apply_red_bias(
                &logits,
                &self.red_tokens,
                &self.eligible_tokens,
                &self.sampler_config(),
            );
        }
        input_ids.push(sample_token(&logits, rng));
        Ok(biased)
    }

    /// Generate a completion with a caller-owned generator.
    pub fn generate_with_rng<R: Rng + ?Sized>(&self, prompt: &str, rng: &mut R) -> Result<Generation> {
        let mut token_ids = self.model.encode(prompt)?;
        let prompt_len = token_ids.len();
        token_ids.reserve(self.config.max_tokens);

        let mut biased_steps = 0;
        for _ in 0..self.config.max_tokens {
            if self.step(&mut token_ids, rng)? {
                biased_steps += 1;
            }
        }

        debug!(
            prompt_len,
            steps = self.config.max_tokens,
            biased_steps,
            "Teacher generation finished"
        );
        Ok(Generation {
            token_ids,
            prompt_len,
            biased_steps,
        })
    }

    /// Generate a completion as token ids, seeded by `rng_seed`.
    pub fn generate(&self, prompt: &str, rng_seed: u64) -> Result<Generation> {
        let mut rng = ChaCha20Rng::seed_from_u64(rng_seed);
        self.generate_with_rng(prompt, &mut rng)
    }

    pub fn summarize_red_rate(&self, tokens: &[u32]) -> f64 {
        red_rate(tokens, &self.red_tokens, &self.eligible_tokens)
    }
}
