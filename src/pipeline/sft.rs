//! SFT (Supervised Fine-Tuning) dataset construction.

use crate::models::{Sample, SftExample};

/// One (prompt, completion) example per sample, in input order.
pub fn build_sft_dataset(samples: &[Sample]) -> Vec<SftExample> {
    samples.iter().map(SftExample::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::select::tests::sample;

    #[test]
    fn test_build_sft_dataset_preserves_order() {
        let samples = vec![sample("p", "b", 0.9), sample("q", "x", 0.1)];
        let dataset = build_sft_dataset(&samples);
        assert_eq!(
            dataset,
            vec![
                SftExample {
                    prompt: "p".to_string(),
                    completion: "b".to_string()
                },
                SftExample {
                    prompt: "q".to_string(),
                    completion: "x".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_build_sft_dataset_empty() {
        assert!(build_sft_dataset(&[]).is_empty());
    }
}
