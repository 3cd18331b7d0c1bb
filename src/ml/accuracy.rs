// ============================================================
// Layer 5 — Top-k Accuracy
// ============================================================
// Percentage (0–100) of samples whose true class is among the
// k highest-scoring classes. A class ranks above the target if
// its score is strictly higher, or equal with a lower index, so
// ties never count in the model's favour twice.

use anyhow::{anyhow, Result};
use burn::prelude::*;

/// Top-k accuracy for each k in `topk`, computed on host memory.
///
/// `scores` is row-major [targets.len(), num_classes].
pub fn topk_accuracy(scores: &[f32], num_classes: usize, targets: &[i64], topk: &[usize]) -> Vec<f64> {
    let batch_size = targets.len();
    if batch_size == 0 || num_classes == 0 {
        return vec![0.0; topk.len()];
    }

    // Rank of the true class within each row (0 = best)
    let ranks: Vec<usize> = targets
        .iter()
        .zip(scores.chunks(num_classes))
        .map(|(&target, row)| {
            let t = target as usize;
            let Some(&target_score) = row.get(t) else {
                return usize::MAX;
            };
            row.iter()
                .enumerate()
                .filter(|&(j, &s)| s > target_score || (s == target_score && j < t))
                .count()
        })
        .collect();

    topk.iter()
        .map(|&k| {
            let correct = ranks.iter().filter(|&&r| r < k).count();
            correct as f64 * 100.0 / batch_size as f64
        })
        .collect()
}

/// Tensor front-end for `topk_accuracy`
pub fn accuracy<B: Backend>(
    logits:  Tensor<B, 2>,
    targets: Tensor<B, 1, Int>,
    topk:    &[usize],
) -> Result<Vec<f64>> {
    let [_, num_classes] = logits.dims();
    let scores = logits
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read logits: {e:?}"))?;
    let targets = targets
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| anyhow!("Cannot read targets: {e:?}"))?;
    Ok(topk_accuracy(&scores, num_classes, &targets, topk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_top1_all_correct_and_all_wrong() {
        let scores = [0.9, 0.1, 0.2, 0.8];
        assert_eq!(topk_accuracy(&scores, 2, &[0, 1], &[1]), vec![100.0]);
        assert_eq!(topk_accuracy(&scores, 2, &[1, 0], &[1]), vec![0.0]);
    }

    #[test]
    fn test_topk_covers_second_choice() {
        // Row 0: target 2 is second best, row 1: target 0 is third
        let scores = [0.1, 0.5, 0.4, 0.1, 0.3, 0.6];
        let acc = topk_accuracy(&scores, 3, &[2, 0], &[1, 2, 3]);
        assert_eq!(acc, vec![0.0, 50.0, 100.0]);
    }

    #[test]
    fn test_ties_favour_lower_index() {
        let scores = [0.5, 0.5];
        assert_eq!(topk_accuracy(&scores, 2, &[0], &[1]), vec![100.0]);
        assert_eq!(topk_accuracy(&scores, 2, &[1], &[1]), vec![0.0]);
    }

    #[test]
    fn test_empty_batch() {
        assert_eq!(topk_accuracy(&[], 7, &[], &[1, 1]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_tensor_front_end() {
        let device = Default::default();
        let logits  = Tensor::<NdArray, 2>::from_floats([[1.0, 3.0, 2.0], [5.0, 0.0, 1.0]], &device);
        let targets = Tensor::<NdArray, 1, Int>::from_ints([1, 2], &device);
        let acc = accuracy(logits, targets, &[1, 2]).unwrap();
        assert_eq!(acc, vec![50.0, 100.0]);
    }
}
