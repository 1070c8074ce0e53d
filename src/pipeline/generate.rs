//! Candidate generation.
//!
//! Pipeline flow:
//! Prompts → Teacher (N seeded samples each) → decode / red rate /
//! base log-prob / oddities → Scorer → Samples
//!
//! K_i: Seeds are derived from (base seed, prompt index, sample index) only,
//! so a batch is reproducible and no two samples in it share a seed.

use crate::client::LanguageModel;
use crate::models::{GenerationConfig, Result, RewardWeights, Sample, WatermarkError};
use crate::scoring::{Scorer, detect_oddities, reward};
use crate::watermark::RedBiasedTeacher;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

/// Seed for sample `sample_idx` of prompt `prompt_idx`.
pub fn derive_seed(
    rng_seed: u64,
    prompt_idx: usize,
    sample_idx: usize,
    samples_per_prompt: usize,
) -> u64 {
    let offset = (prompt_idx as u64)
        .wrapping_mul(samples_per_prompt as u64)
        .wrapping_add(sample_idx as u64);
    rng_seed.wrapping_add(offset)
}

/// Sum of per-step log-probabilities of `token_ids[1..]` under `model`,
/// each conditioned on the tokens before it.
pub fn compute_base_logprob<M: LanguageModel + ?Sized>(
    model: &M,
    token_ids: &[u32],
) -> Result<f64> {
    let mut logprob = 0.0;
    for idx in 1..token_ids.len() {
        logprob += model.logprob(&token_ids[..idx], token_ids[idx])?;
    }
    Ok(logprob)
}

fn progress_bar(total: usize, visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
        .map_err(|e| WatermarkError::Internal(format!("Invalid progress template: {e}")))?
        .progress_chars("##-");
    pb.set_style(style);
    Ok(pb)
}

/// Generate and score `samples_per_prompt` candidates for every prompt.
///
/// `model` decodes and scores base log-probabilities; it is usually the
/// same model the teacher samples from. Each sample also carries its RL
/// reward under `rewards`. Model failures abort the batch.
pub fn generate_candidates<M, B, S, P>(
    teacher: &RedBiasedTeacher<M>,
    model: &B,
    prompts: &[P],
    config: &GenerationConfig,
    rewards: &RewardWeights,
    scorer: &S,
) -> Result<Vec<Sample>>
where
    M: LanguageModel,
    B: LanguageModel + ?Sized,
    S: Scorer + ?Sized,
    P: AsRef<str>,
{
    config.validate()?;
    rewards.validate()?;

    let total = prompts.len() * config.samples_per_prompt;
    let pb = progress_bar(total, config.show_progress)?;
    let mut samples = Vec::with_capacity(total);

    for (prompt_idx, prompt) in prompts.iter().enumerate() {
        let prompt = prompt.as_ref();
        for sample_idx in 0..config.samples_per_prompt {
            let seed = derive_seed(
                config.rng_seed,
                prompt_idx,
                sample_idx,
                config.samples_per_prompt,
            );
            let generation = teacher.generate(prompt, seed)?;
            let completion = model.decode(&generation.token_ids)?;
            let red_rate = teacher.summarize_red_rate(&generation.token_ids);
            let base_logprob = if config.compute_base_logprob {
                Some(compute_base_logprob(model, &generation.token_ids)?)
            } else {
                None
            };
            let oddities = detect_oddities(&completion);
            let score = scorer.score(red_rate, config.target_red_rate, base_logprob, &oddities);
            let reward = reward(red_rate, config.target_red_rate, &oddities, rewards);

            debug!(
                prompt_idx,
                sample_idx,
                seed,
                red_rate,
                biased_steps = generation.biased_steps,
                oddities = ?oddities.active(),
                score,
                reward,
                "Generated candidate"
            );

            samples.push(Sample {
                prompt: prompt.to_string(),
                completion,
                token_ids: generation.token_ids,
                prompt_len: generation.prompt_len,
                seed,
                red_rate,
                base_logprob,
                oddities,
                score,
                reward,
            });
            pb.inc(1);
        }
    }

    pb.finish_and_clear();
    Ok(samples)
}
