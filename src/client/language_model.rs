//! Language model capability consumed by the watermark core.
//!
//! Epistemic foundation:
//! - K_i: Logits are aligned by token id, one entry per vocabulary id
//! - B_i: Every call may fail → Result, propagated to the caller untouched
//! - I^R: The concrete backend is the caller's choice; the core only sees this trait

use crate::models::{Result, WatermarkError};
use crate::watermark::log_softmax;

/// Token-level access to a causal language model.
///
/// Implementations are expected to be side-effect free: the same input
/// sequence yields the same logits.
pub trait LanguageModel {
    /// Encode text into token ids.
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode token ids into text.
    fn decode(&self, token_ids: &[u32]) -> Result<String>;

    /// Logits for the next token given the sequence so far.
    fn next_logits(&self, input_ids: &[u32]) -> Result<Vec<f64>>;

    /// Natural-log probability of `target_id` following `input_ids`.
    ///
    /// Defaults to the log-softmax of [`LanguageModel::next_logits`].
    fn logprob(&self, input_ids: &[u32], target_id: u32) -> Result<f64> {
        let logits = self.next_logits(input_ids)?;
        let vocab_size = logits.len();
        log_softmax(&logits)
            .get(target_id as usize)
            .copied()
            .ok_or(WatermarkError::TokenOutOfRange {
                token: target_id,
                vocab_size,
            })
    }
}

impl<T: LanguageModel + ?Sized> LanguageModel for &T {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        (**self).encode(text)
    }

    fn decode(&self, token_ids: &[u32]) -> Result<String> {
        (**self).decode(token_ids)
    }

    fn next_logits(&self, input_ids: &[u32]) -> Result<Vec<f64>> {
        (**self).next_logits(input_ids)
    }

    fn logprob(&self, input_ids: &[u32], target_id: u32) -> Result<f64> {
        (**self).logprob(input_ids, target_id)
    }
}

impl<T: LanguageModel + ?Sized> LanguageModel for Box<T> {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        (**self).encode(text)
    }

    fn decode(&self, token_ids: &[u32]) -> Result<String> {
        (**self).decode(token_ids)
    }

    fn next_logits(&self, input_ids: &[u32]) -> Result<Vec<f64>> {
        (**self).next_logits(input_ids)
    }

    fn logprob(&self, input_ids: &[u32], target_id: u32) -> Result<f64> {
        (**self).logprob(input_ids, target_id)
    }
}
