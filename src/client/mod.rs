//! Model client module.

mod bigram;
mod language_model;

pub use bigram::*;
pub use language_model::*;
