//! Core data models for redmark.
//!
//! Epistemic mapping:
//! - K_i (Knowledge): Concrete types with compile-time guarantees
//! - B_i (Beliefs): Wrapped in Result/Option
//! - I^R (Resolvable): Config parameters
//! - I^B (Bounded): Error variants surfaced to the caller

mod config;
mod error;
mod sample;

pub use config::*;
pub use error::*;
pub use sample::*;
