//! Deterministic in-memory bigram model.
//!
//! Whitespace tokenizer over a fixed vocabulary, with next-token logits
//! looked up from the previous token. Used by the CLI demo and tests;
//! real inference backends implement [`LanguageModel`] themselves.

use crate::client::LanguageModel;
use crate::models::{Result, WatermarkError};
use std::collections::HashMap;

/// Table-driven bigram language model.
#[derive(Debug, Clone)]
pub struct BigramModel {
    /// Token strings indexed by id
    tokens: Vec<String>,
    /// Token string → id
    ids: HashMap<String, u32>,
    /// Previous token id → next-token logits
    transitions: HashMap<u32, Vec<f64>>,
    /// Logits used for an empty sequence or an unlisted previous token
    fallback: Vec<f64>,
}

impl BigramModel {
    /// Create a model with uniform logits everywhere.
    pub fn new<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        if tokens.is_empty() {
            return Err(WatermarkError::InvalidInput(
                "bigram vocabulary is empty".to_string(),
            ));
        }

        let mut ids = HashMap::with_capacity(tokens.len());
        for (id, token) in tokens.iter().enumerate() {
            if ids.insert(token.clone(), id as u32).is_some() {
                return Err(WatermarkError::InvalidInput(format!(
                    "duplicate bigram token: {token:?}"
                )));
            }
        }

        let fallback = vec![0.0; tokens.len()];
        Ok(Self {
            tokens,
            ids,
            transitions: HashMap::new(),
            fallback,
        })
    }

    /// Set the logits that follow `prev`.
    pub fn with_transition(mut self, prev: u32, logits: Vec<f64>) -> Result<Self> {
        self.check_row(&logits)?;
        if prev as usize >= self.tokens.len() {
            return Err(WatermarkError::TokenOutOfRange {
                token: prev,
                vocab_size: self.tokens.len(),
            });
        }
        self.transitions.insert(prev, logits);
        Ok(self)
    }

    /// Set the logits used when no transition row applies.
    pub fn with_fallback(mut self, logits: Vec<f64>) -> Result<Self> {
        self.check_row(&logits)?;
        self.fallback = logits;
        Ok(self)
    }

    fn check_row(&self, logits: &[f64]) -> Result<()> {
        if logits.len() != self.tokens.len() {
            return Err(WatermarkError::InvalidInput(format!(
                "logit row has {} entries, vocabulary has {}",
                logits.len(),
                self.tokens.len()
            )));
        }
        Ok(())
    }

    pub fn vocab_size(&self) -> usize {
        self.tokens.len()
    }

    /// Vocabulary as (id, token) pairs in id order.
    pub fn vocabulary(&self) -> Vec<(u32, String)> {
        self.tokens
            .iter()
            .enumerate()
            .map(|(id, token)| (id as u32, token.clone()))
            .collect()
    }
}

impl LanguageModel for BigramModel {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        text.split_whitespace()
            .map(|word| {
                self.ids.get(word).copied().ok_or_else(|| {
                    WatermarkError::model(format!("word {word:?} is not in the vocabulary"))
                })
            })
            .collect()
    }

    fn decode(&self, token_ids: &[u32]) -> Result<String> {
        let words = token_ids
            .iter()
            .map(|&id| {
                self.tokens
                    .get(id as usize)
                    .map(String::as_str)
                    .ok_or(WatermarkError::TokenOutOfRange {
                        token: id,
                        vocab_size: self.tokens.len(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(words.join(" "))
    }

    fn next_logits(&self, input_ids: &[u32]) -> Result<Vec<f64>> {
        let row = input_ids
            .last()
            .and_then(|prev| self.transitions.get(prev))
            .unwrap_or(&self.fallback);
        Ok(row.clone())
    }
}
