//! K-fold cross-validation of the detector.

use crate::metrics::roc_auc_score;
use crate::split::k_fold_indices;
use ag_common::{Error, Result};
use ag_core::{AnomalyDetector, DetectorConfig};
use std::hash::Hash;
use tracing::debug;

/// Per-fold ROC AUC of a detector trained on the normal sequences of the
/// other folds.
///
/// Each fold is held out once. The detector is fitted only on training-fold
/// sequences labelled `0`, then scores every held-out sequence. Folds whose
/// held-out part contains a single class score 0.5.
pub fn cross_val_score<S, T>(
    sequences: &[T],
    labels: &[u8],
    max_order: i64,
    folds: usize,
    seed: u64,
) -> Result<Vec<f64>>
where
    S: Eq + Hash + Clone + Send + Sync,
    T: AsRef<[S]> + Sync,
{
    let max_order = ag_core::validate_max_order(max_order)?;
    cross_val_score_with_config(
        sequences,
        labels,
        DetectorConfig::default().with_max_order(max_order)?,
        folds,
        seed,
    )
}

/// [`cross_val_score`] with a full detector configuration.
pub fn cross_val_score_with_config<S, T>(
    sequences: &[T],
    labels: &[u8],
    config: DetectorConfig,
    folds: usize,
    seed: u64,
) -> Result<Vec<f64>>
where
    S: Eq + Hash + Clone + Send + Sync,
    T: AsRef<[S]> + Sync,
{
    if sequences.len() != labels.len() {
        return Err(Error::invalid_input(format!(
            "{} sequences but {} labels",
            sequences.len(),
            labels.len()
        )));
    }
    config.validate()?;

    let partition = k_fold_indices(sequences.len(), folds, seed)?;
    let mut held_out = vec![usize::MAX; sequences.len()];
    for (fold, indices) in partition.iter().enumerate() {
        for &i in indices {
            held_out[i] = fold;
        }
    }

    let mut aucs = Vec::with_capacity(partition.len());
    for (fold, test_indices) in partition.iter().enumerate() {
        let training: Vec<&[S]> = (0..sequences.len())
            .filter(|&i| held_out[i] != fold && labels[i] == 0)
            .map(|i| sequences[i].as_ref())
            .collect();
        if training.is_empty() {
            return Err(Error::invalid_input(format!(
                "fold {} has no normal training sequences",
                fold
            )));
        }

        let mut detector = AnomalyDetector::with_config(config.clone())?;
        detector.fit(&training)?;

        let test: Vec<&[S]> = test_indices.iter().map(|&i| sequences[i].as_ref()).collect();
        let test_labels: Vec<u8> = test_indices.iter().map(|&i| labels[i]).collect();
        let scores = detector.predict_proba(&test)?;
        let auc = roc_auc_score(&test_labels, &scores)?;
        debug!(fold, training = training.len(), test = test.len(), auc, "fold evaluated");
        aucs.push(auc);
    }
    Ok(aucs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separates_cyclic_from_reversed() {
        let mut sequences = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            if i % 5 == 0 {
                sequences.push(vec!["c", "b", "a", "c", "b", "a"]);
                labels.push(1);
            } else {
                sequences.push(vec!["a", "b", "c", "a", "b", "c"]);
                labels.push(0);
            }
        }
        let aucs = cross_val_score(&sequences, &labels, 2, 3, 11).unwrap();
        assert_eq!(aucs.len(), 3);
        for auc in aucs {
            assert!((0.0..=1.0).contains(&auc));
            assert!(auc >= 0.5, "auc={auc}");
        }
    }

    #[test]
    fn mismatched_lengths() {
        let sequences = vec![vec![1u8], vec![2]];
        assert!(matches!(
            cross_val_score(&sequences, &[0], 2, 2, 0),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn all_anomalous_training_fails() {
        let sequences = vec![vec![1u8, 2]; 4];
        assert!(matches!(
            cross_val_score(&sequences, &[1, 1, 1, 1], 1, 2, 0),
            Err(Error::InvalidInput(_))
        ));
    }
}
