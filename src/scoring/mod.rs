//! Scoring module - oddity heuristics, candidate score, RL reward.

mod oddity;
mod reward;
mod score;

pub use oddity::*;
pub use reward::*;
pub use score::*;
