//! Watermark core: probability utilities, eligibility, biased sampling.
//!
//! Dependency order (leaves first):
//! probability → eligibility → sampler → teacher, with the regularizer
//! and detector alongside.

mod detect;
mod eligibility;
mod probability;
mod regularizer;
mod sampler;
mod teacher;

pub use detect::*;
pub use eligibility::*;
pub use probability::*;
pub use regularizer::*;
pub use sampler::*;
pub use teacher::*;
