//! Error types for redmark.
//!
//! Epistemic taxonomy:
//! - B_i falsified: Expected failures (invalid config, malformed input)
//! - I^B materialized: The external model adapter failed
//! - K_i violated: Internal invariant violations (bugs)

use thiserror::Error;

/// Top-level error type for redmark.
#[derive(Debug, Error)]
pub enum WatermarkError {
    // ═══════════════════════════════════════════════════════════════════
    // B_i FALSIFIED - Belief proven wrong (expected failures)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model returned an empty logit vector")]
    EmptyLogits,

    #[error("Token {token} is outside the model vocabulary (size {vocab_size})")]
    TokenOutOfRange { token: u32, vocab_size: usize },

    // ═══════════════════════════════════════════════════════════════════
    // I^B MATERIALIZED - The model adapter failed; propagated as-is
    // ═══════════════════════════════════════════════════════════════════

    #[error("Model error: {0}")]
    Model(String),

    // ═══════════════════════════════════════════════════════════════════
    // K_i VIOLATED - Invariant broken (bug, should not happen)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WatermarkError {
    /// Create a model adapter error.
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    /// Check if this error came from the caller's configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type alias for redmark.
pub type Result<T> = std::result::Result<T, WatermarkError>;
