//! End-to-end pipeline.
//!
//! Pipeline flow:
//! Prompts → generate_candidates → select_best_of_n → SFT examples
//!                               ↘ build_dpo_pairs (over all candidates)

use crate::client::LanguageModel;
use crate::models::{Config, DpoPair, Result, RunStats, Sample, SftExample};
use crate::pipeline::{
    build_dpo_pairs_allowing, build_sft_dataset, generate_candidates, select_best_of_n,
};
use crate::scoring::{Scorer, any_oddities};
use crate::watermark::RedBiasedTeacher;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::info;

/// Everything one pipeline run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutputs {
    /// Every scored candidate, in generation order
    pub candidates: Vec<Sample>,
    /// Best-of-N survivors, grouped by prompt
    pub selected: Vec<Sample>,
    /// SFT examples built from `selected`
    pub sft_dataset: Vec<SftExample>,
    /// Preference pairs built from `candidates`
    pub dpo_pairs: Vec<DpoPair>,
    pub stats: RunStats,
}

/// Run the pipeline with the default score (`config.scoring` weights).
pub fn run_pipeline<M, B, P>(
    teacher: &RedBiasedTeacher<M>,
    model: &B,
    prompts: &[P],
    config: &Config,
) -> Result<PipelineOutputs>
where
    M: LanguageModel,
    B: LanguageModel + ?Sized,
    P: AsRef<str>,
{
    run_pipeline_with_scorer(teacher, model, prompts, config, &config.scoring)
}

/// Run the pipeline with a caller-supplied scorer.
pub fn run_pipeline_with_scorer<M, B, S, P>(
    teacher: &RedBiasedTeacher<M>,
    model: &B,
    prompts: &[P],
    config: &Config,
    scorer: &S,
) -> Result<PipelineOutputs>
where
    M: LanguageModel,
    B: LanguageModel + ?Sized,
    S: Scorer + ?Sized,
    P: AsRef<str>,
{
    config.scoring.validate()?;
    config.reward.validate()?;
    config.generation.validate()?;
    config.selection.validate()?;

    let start = Instant::now();
    info!(
        prompts = prompts.len(),
        samples_per_prompt = config.generation.samples_per_prompt,
        max_tokens = teacher.config().max_tokens,
        target_red_rate = config.generation.target_red_rate,
        best_of_n = config.selection.best_of_n,
        "Starting watermark pipeline"
    );

    let candidates = generate_candidates(
        teacher,
        model,
        prompts,
        &config.generation,
        &config.reward,
        scorer,
    )?;
    let selected = select_best_of_n(&candidates, config.selection.best_of_n);
    let sft_dataset = build_sft_dataset(&selected);
    let dpo_pairs = build_dpo_pairs_allowing(
        &candidates,
        config.selection.max_pairs_per_prompt,
        &config.selection.allowed_oddities,
    );

    let distinct_prompts: HashSet<&str> = candidates.iter().map(|s| s.prompt.as_str()).collect();
    let paired_prompts: HashSet<&str> = dpo_pairs.iter().map(|p| p.prompt.as_str()).collect();
    let mut stats = RunStats {
        total_prompts: distinct_prompts.len(),
        total_candidates: candidates.len(),
        total_selected: selected.len(),
        total_pairs: dpo_pairs.len(),
        prompts_without_pairs: distinct_prompts.len() - paired_prompts.len(),
        oddity_candidates: candidates
            .iter()
            .filter(|s| any_oddities(&s.oddities, &config.selection.allowed_oddities))
            .count(),
        red_rate_sum: candidates.iter().map(|s| s.red_rate).sum(),
        runtime_secs: start.elapsed().as_secs_f64(),
        ..Default::default()
    };
    stats.finalize();

    info!(
        candidates = stats.total_candidates,
        selected = stats.total_selected,
        pairs = stats.total_pairs,
        prompts_without_pairs = stats.prompts_without_pairs,
        mean_red_rate = format!("{:.3}", stats.mean_red_rate),
        runtime = format!("{:.2}s", stats.runtime_secs),
        "Watermark pipeline complete"
    );

    Ok(PipelineOutputs {
        candidates,
        selected,
        sft_dataset,
        dpo_pairs,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BigramModel;
    use crate::models::{
        GenerationConfig, OddityFlags, RedBiasConfig, RewardWeights, SelectionConfig,
    };
    use crate::scoring::reward;
    use crate::models::WatermarkError;
    use std::collections::BTreeSet;

    fn setup() -> BigramModel {
        BigramModel::new(["go", "alpha", "beta", "gamma", "DELTA", "!!!"]).unwrap()
    }

    fn teacher(model: &BigramModel) -> RedBiasedTeacher<&BigramModel> {
        let red: BTreeSet<u32> = [1, 2].into_iter().collect();
        let eligible: BTreeSet<u32> = [1, 2, 3].into_iter().collect();
        let bias = RedBiasConfig {
            delta: 2.0,
            entropy_threshold: 0.0,
            top_k: None,
            top_k_gate: true,
            max_tokens: 5,
        };
        RedBiasedTeacher::new(model, red, eligible, bias).unwrap()
    }

    fn config() -> Config {
        Config {
            generation: GenerationConfig {
                samples_per_prompt: 6,
                rng_seed: 17,
                ..Default::default()
            },
            selection: SelectionConfig {
                best_of_n: 2,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_pipeline_bundle_is_consistent() {
        let model = setup();
        let t = teacher(&model);
        let prompts = ["go", "go alpha"];
        let outputs = run_pipeline(&t, &model, &prompts, &config()).unwrap();

        assert_eq!(outputs.candidates.len(), 12);
        assert_eq!(outputs.selected.len(), 4);
        assert_eq!(outputs.sft_dataset.len(), 4);
        for (example, sample) in outputs.sft_dataset.iter().zip(&outputs.selected) {
            assert_eq!(example.prompt, sample.prompt);
            assert_eq!(example.completion, sample.completion);
        }
        for pair in &outputs.dpo_pairs {
            assert!(prompts.contains(&pair.prompt.as_str()));
            assert!(pair.chosen_score.is_finite());
        }
        assert_eq!(outputs.stats.total_prompts, 2);
        assert_eq!(outputs.stats.total_pairs, outputs.dpo_pairs.len());
        assert_eq!(
            outputs.stats.prompts_without_pairs,
            2 - outputs.dpo_pairs.len()
        );
        assert!((0.0..=1.0).contains(&outputs.stats.mean_red_rate));
    }

    #[test]
    fn test_pipeline_is_reproducible() {
        let model = setup();
        let t = teacher(&model);
        let a = run_pipeline(&t, &model, &["go"], &config()).unwrap();
        let b = run_pipeline(&t, &model, &["go"], &config()).unwrap();
        assert_eq!(a.candidates, b.candidates);
        assert_eq!(a.selected, b.selected);
        assert_eq!(a.dpo_pairs, b.dpo_pairs);
    }

    #[test]
    fn test_pipeline_with_scorer_controls_selection() {
        let model = setup();
        let t = teacher(&model);
        let penalize_punct = |rate: f64, _: f64, _: Option<f64>, flags: &OddityFlags| {
            rate - if flags.repeated_punct { 10.0 } else { 0.0 }
        };
        let outputs =
            run_pipeline_with_scorer(&t, &model, &["go"], &config(), &penalize_punct).unwrap();
        let top = outputs
            .candidates
            .iter()
            .map(|s| s.score)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(outputs.selected[0].score, top);
    }

    #[test]
    fn test_pipeline_rewards_follow_config() {
        let model = setup();
        let t = teacher(&model);
        let mut cfg = config();
        cfg.reward = RewardWeights {
            red_rate_weight: 3.0,
            oddity_weight: 0.25,
        };
        let outputs = run_pipeline(&t, &model, &["go"], &cfg).unwrap();
        for sample in &outputs.candidates {
            let expected = reward(
                sample.red_rate,
                cfg.generation.target_red_rate,
                &sample.oddities,
                &cfg.reward,
            );
            assert_eq!(sample.reward, expected);
        }
    }

    #[test]
    fn test_pipeline_rejects_invalid_selection() {
        let model = setup();
        let t = teacher(&model);
        let mut bad = config();
        bad.selection.best_of_n = 0;
        let err = run_pipeline(&t, &model, &["go"], &bad).unwrap_err();
        assert!(matches!(err, WatermarkError::Config(_)));
    }
}
