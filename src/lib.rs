//! redmark - Red-only text watermarking and distillation datasets.
//!
//! ## Architecture
//!
//! redmark is built from three layers:
//! - **Watermark**: Eligible vocabulary, seeded red/blue split, entropy-gated
//!   logit bias, red-rate detection
//! - **Scoring**: Surface oddity heuristics, candidate score, RL reward
//! - **Pipeline**: N seeded candidates per prompt → best-of-N SFT examples
//!   and clean-vs-odd DPO pairs
//!
//! Models plug in through the [`LanguageModel`] trait.
//!
//! ## Epistemic Design
//!
//! - K_i (Knowledge): Set invariants on the partition, bounded rates
//! - B_i (Beliefs): Model calls and config loading return `Result`
//! - I^R (Resolvable): User-configurable parameters
//! - I^B (Bounded): Randomness confined to explicitly seeded generators

pub mod client;
pub mod models;
pub mod pipeline;
pub mod scoring;
pub mod watermark;

// Re-exports for convenience
pub use client::{BigramModel, LanguageModel};
pub use models::{Config, DpoPair, Result, Sample, SftExample, WatermarkError};
pub use pipeline::{PipelineOutputs, run_pipeline, run_pipeline_with_scorer};
pub use watermark::{
    DetectionReport, Partition, RedBiasedTeacher, build_eligible_token_set,
    build_red_blue_partition, detect,
};
