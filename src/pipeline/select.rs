//! Best-of-N selection.
//!
//! K_i: Prompts keep the order of their first occurrence; within a prompt,
//! samples are ranked by score descending with ties in input order.

use crate::models::Sample;
use std::collections::HashMap;

/// Group samples by prompt, preserving first-occurrence order.
pub(crate) fn group_by_prompt(samples: &[Sample]) -> Vec<(&str, Vec<&Sample>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&Sample>)> = Vec::new();
    for sample in samples {
        let prompt = sample.prompt.as_str();
        match index.get(prompt) {
            Some(&slot) => groups[slot].1.push(sample),
            None => {
                index.insert(prompt, groups.len());
                groups.push((prompt, vec![sample]));
            }
        }
    }
    groups
}

/// Sort by score descending; the sort is stable.
pub(crate) fn rank_by_score(group: &mut [&Sample]) {
    group.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Keep the top `n` samples per prompt.
pub fn select_best_of_n(samples: &[Sample], n: usize) -> Vec<Sample> {
    let mut best = Vec::new();
    for (_, mut group) in group_by_prompt(samples) {
        rank_by_score(&mut group);
        best.extend(group.into_iter().take(n).cloned());
    }
    best
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::OddityFlags;

    pub(crate) fn sample(prompt: &str, completion: &str, score: f64) -> Sample {
        Sample {
            prompt: prompt.to_string(),
            completion: completion.to_string(),
            token_ids: Vec::new(),
            prompt_len: 0,
            seed: 0,
            red_rate: 0.0,
            base_logprob: None,
            oddities: OddityFlags::default(),
            score,
            reward: 0.0,
        }
    }

    #[test]
    fn test_best_of_one() {
        let samples = vec![
            sample("p", "a", 0.5),
            sample("p", "b", 0.9),
            sample("p", "c", 0.2),
        ];
        let best = select_best_of_n(&samples, 1);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].score, 0.9);
        assert_eq!(best[0].completion, "b");
    }

    #[test]
    fn test_groups_keep_first_occurrence_order() {
        let samples = vec![
            sample("q", "q1", 0.1),
            sample("p", "p1", 0.3),
            sample("q", "q2", 0.7),
            sample("p", "p2", 0.4),
        ];
        let best = select_best_of_n(&samples, 1);
        let completions: Vec<&str> = best.iter().map(|s| s.completion.as_str()).collect();
        assert_eq!(completions, vec!["q2", "p2"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let samples = vec![
            sample("p", "first", 0.5),
            sample("p", "second", 0.5),
            sample("p", "third", 0.1),
        ];
        let best = select_best_of_n(&samples, 2);
        let completions: Vec<&str> = best.iter().map(|s| s.completion.as_str()).collect();
        assert_eq!(completions, vec!["first", "second"]);
    }

    #[test]
    fn test_n_larger_than_group() {
        let samples = vec![sample("p", "a", 0.1), sample("p", "b", 0.2)];
        let best = select_best_of_n(&samples, 5);
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].completion, "b");
    }
}
