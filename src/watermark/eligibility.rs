//! Eligible vocabulary and the red/blue split.
//!
//! Epistemic foundation:
//! - K_i: Eligible ⊆ vocabulary, computed once and never mutated
//! - K_i: Red ∪ Blue = Eligible, Red ∩ Blue = ∅, |Red| = ⌊|Eligible| / 2⌋
//! - K_i: The split is the watermark key; it depends only on the seed and
//!   the (sorted) eligible ids, so `BTreeSet` is used throughout

use crate::models::EligibleTokenConfig;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

fn is_whitespace(token: &str) -> bool {
    token.trim().is_empty()
}

/// Non-empty and made only of non-word characters (word = alphanumeric or `_`).
fn is_punctuation(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| !(c.is_alphanumeric() || c == '_'))
}

fn has_digits(token: &str) -> bool {
    token.chars().any(|c| c.is_numeric())
}

fn is_non_ascii(token: &str) -> bool {
    !token.is_ascii()
}

/// Build eligible token ids from a frequency-ranked vocabulary.
///
/// Only the first `config.top_k` entries are considered.
pub fn build_eligible_token_set(
    vocab: &[(u32, String)],
    config: &EligibleTokenConfig,
) -> BTreeSet<u32> {
    let eligible: BTreeSet<u32> = vocab
        .iter()
        .take(config.top_k)
        .filter(|(_, token)| {
            !(config.exclude_whitespace && is_whitespace(token)
                || config.exclude_punctuation && is_punctuation(token)
                || config.exclude_digits && has_digits(token)
                || config.exclude_non_ascii && is_non_ascii(token)
                || config.banned_fillers.contains(&token.to_lowercase()))
        })
        .map(|(id, _)| *id)
        .collect();

    if eligible.is_empty() {
        warn!(
            considered = vocab.len().min(config.top_k),
            "No eligible tokens; the watermark will never bias"
        );
    } else {
        debug!(
            considered = vocab.len().min(config.top_k),
            eligible = eligible.len(),
            "Built eligible token set"
        );
    }
    eligible
}

/// Red/blue split of the eligible vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Tokens that carry the watermark signal
    pub red: BTreeSet<u32>,
    /// Remaining eligible tokens
    pub blue: BTreeSet<u32>,
}

impl Partition {
    /// Red ∪ Blue.
    pub fn eligible(&self) -> BTreeSet<u32> {
        self.red.union(&self.blue).copied().collect()
    }
}

/// Partition eligible tokens into red/blue sets with a seeded shuffle.
///
/// The ids are shuffled in ascending order; the first ⌊n/2⌋ become red.
pub fn build_red_blue_partition(eligible_tokens: &BTreeSet<u32>, seed: u64) -> Partition {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut tokens: Vec<u32> = eligible_tokens.iter().copied().collect();
    tokens.shuffle(&mut rng);

    let midpoint = tokens.len() / 2;
    let blue = tokens.split_off(midpoint);
    Partition {
        red: tokens.into_iter().collect(),
        blue: blue.into_iter().collect(),
    }
}

/// Convert an id → token mapping to a vocabulary sorted by token id.
///
/// Useful when frequency ranks are unknown.
pub fn build_vocab_from_mapping(vocab: &HashMap<u32, String>) -> Vec<(u32, String)> {
    let mut entries: Vec<(u32, String)> = vocab
        .iter()
        .map(|(id, token)| (*id, token.clone()))
        .collect();
    entries.sort_by_key(|(id, _)| *id);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(tokens: &[&str]) -> Vec<(u32, String)> {
        tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (i as u32, t.to_string()))
            .collect()
    }

    #[test]
    fn test_eligible_excludes_by_default() {
        let v = vocab(&[
            "the", " ", "", "...", "a1", "caf\u{e9}", "Um", "cat", "you know", "_x", "_",
        ]);
        let eligible = build_eligible_token_set(&v, &EligibleTokenConfig::default());
        // "_" is a word character, not punctuation
        let expected: BTreeSet<u32> = [0, 7, 9, 10].into_iter().collect();
        assert_eq!(eligible, expected);
    }

    #[test]
    fn test_eligible_respects_top_k() {
        let v = vocab(&["the", "cat", "sat"]);
        let config = EligibleTokenConfig {
            top_k: 2,
            ..Default::default()
        };
        let expected: BTreeSet<u32> = [0, 1].into_iter().collect();
        assert_eq!(build_eligible_token_set(&v, &config), expected);
    }

    #[test]
    fn test_eligible_switches_off_exclusions() {
        let v = vocab(&["42", "!!", "\u{e9}t\u{e9}", " "]);
        let config = EligibleTokenConfig {
            exclude_digits: false,
            exclude_punctuation: false,
            exclude_non_ascii: false,
            exclude_whitespace: false,
            ..Default::default()
        };
        assert_eq!(build_eligible_token_set(&v, &config).len(), 4);
    }

    #[test]
    fn test_numeric_exclusion_covers_unicode_numbers() {
        let v = vocab(&["\u{bd}", "\u{216b}", "\u{e9}t\u{e9}", "2nd"]);
        let config = EligibleTokenConfig {
            exclude_non_ascii: false,
            ..Default::default()
        };
        let expected: BTreeSet<u32> = [2].into_iter().collect();
        assert_eq!(build_eligible_token_set(&v, &config), expected);
    }

    #[test]
    fn test_partition_is_reproducible_and_disjoint() {
        let eligible: BTreeSet<u32> = (0..101).collect();
        for seed in [0, 1, 42, u64::MAX] {
            let a = build_red_blue_partition(&eligible, seed);
            let b = build_red_blue_partition(&eligible, seed);
            assert_eq!(a, b);
            assert_eq!(a.red.len(), 50);
            assert_eq!(a.red.len() + a.blue.len(), eligible.len());
            assert!(a.red.is_disjoint(&a.blue));
            assert_eq!(a.eligible(), eligible);
        }
    }

    #[test]
    fn test_partition_depends_on_seed() {
        let eligible: BTreeSet<u32> = (0..64).collect();
        let a = build_red_blue_partition(&eligible, 1);
        let b = build_red_blue_partition(&eligible, 2);
        assert_ne!(a.red, b.red);
    }

    #[test]
    fn test_partition_small_sets() {
        let empty = build_red_blue_partition(&BTreeSet::new(), 7);
        assert!(empty.red.is_empty() && empty.blue.is_empty());

        let one: BTreeSet<u32> = [5].into_iter().collect();
        let p = build_red_blue_partition(&one, 7);
        assert!(p.red.is_empty());
        assert_eq!(p.blue, one);
    }

    #[test]
    fn test_vocab_from_mapping_sorted() {
        let mapping: HashMap<u32, String> = [(2, "b".to_string()), (0, "z".to_string())]
            .into_iter()
            .collect();
        assert_eq!(
            build_vocab_from_mapping(&mapping),
            vec![(0, "z".to_string()), (2, "b".to_string())]
        );
    }
}
