//! Ranking metrics for binary anomaly labels.
//!
//! Provides:
//! - ROC AUC with tied scores counted as half-ordered
//! - Precision-recall curve over every distinct score threshold
//!
//! Labels are `0` (normal) or `1` (anomalous); scores are higher-is-more-anomalous.

use ag_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Precision and recall at each distinct score threshold.
///
/// `thresholds` is ascending. `precision` and `recall` have one more entry
/// than `thresholds`; the final point is `(precision = 1, recall = 0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionRecallCurve {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub thresholds: Vec<f64>,
}

fn check_inputs(labels: &[u8], scores: &[f64]) -> Result<()> {
    if labels.len() != scores.len() {
        return Err(Error::invalid_input(format!(
            "{} labels but {} scores",
            labels.len(),
            scores.len()
        )));
    }
    if labels.is_empty() {
        return Err(Error::invalid_input("no labels to evaluate"));
    }
    if let Some(bad) = labels.iter().find(|&&l| l > 1) {
        return Err(Error::invalid_input(format!(
            "labels must be 0 or 1, found {}",
            bad
        )));
    }
    if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
        return Err(Error::invalid_input(format!(
            "scores must be finite, found {}",
            bad
        )));
    }
    Ok(())
}

/// `(score, label)` pairs sorted by descending score.
fn ranked(labels: &[u8], scores: &[f64]) -> Vec<(f64, u8)> {
    let mut pairs: Vec<(f64, u8)> = scores.iter().copied().zip(labels.iter().copied()).collect();
    pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    pairs
}

/// Counts of `(true positives, false positives)` after each group of tied
/// scores, walking from the highest score down.
fn cumulative_counts(pairs: &[(f64, u8)]) -> Vec<(f64, usize, usize)> {
    let mut points = Vec::new();
    let mut tp = 0;
    let mut fp = 0;
    let mut i = 0;
    while i < pairs.len() {
        let score = pairs[i].0;
        while i < pairs.len() && pairs[i].0 == score {
            if pairs[i].1 == 1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push((score, tp, fp));
    }
    points
}

/// Area under the ROC curve.
///
/// Tied scores contribute a diagonal segment, which equals the Mann-Whitney
/// statistic with average ranks. Returns 0.5 when only one class is present.
pub fn roc_auc_score(labels: &[u8], scores: &[f64]) -> Result<f64> {
    check_inputs(labels, scores)?;

    let positives = labels.iter().filter(|&&l| l == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Ok(0.5);
    }

    let mut auc = 0.0;
    let mut prev_tp = 0.0;
    let mut prev_fp = 0.0;
    for (_, tp, fp) in cumulative_counts(&ranked(labels, scores)) {
        let (tp, fp) = (tp as f64, fp as f64);
        auc += (fp - prev_fp) * (tp + prev_tp) / 2.0;
        prev_tp = tp;
        prev_fp = fp;
    }

    Ok(auc / (positives as f64 * negatives as f64))
}

/// Precision-recall pairs for every distinct score used as a `>=` threshold.
///
/// Fails with `InvalidInput` if no label is positive.
pub fn precision_recall_curve(labels: &[u8], scores: &[f64]) -> Result<PrecisionRecallCurve> {
    check_inputs(labels, scores)?;
    let positives = labels.iter().filter(|&&l| l == 1).count();
    if positives == 0 {
        return Err(Error::invalid_input(
            "precision-recall curve needs at least one positive label",
        ));
    }

    let points = cumulative_counts(&ranked(labels, scores));
    let mut precision = Vec::with_capacity(points.len() + 1);
    let mut recall = Vec::with_capacity(points.len() + 1);
    let mut thresholds = Vec::with_capacity(points.len());
    for &(score, tp, fp) in points.iter().rev() {
        precision.push(tp as f64 / (tp + fp) as f64);
        recall.push(tp as f64 / positives as f64);
        thresholds.push(score);
    }
    precision.push(1.0);
    recall.push(0.0);

    Ok(PrecisionRecallCurve {
        precision,
        recall,
        thresholds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn perfect_and_inverted_rankings() {
        let labels = [0, 0, 1, 1];
        assert!(approx_eq(roc_auc_score(&labels, &[0.1, 0.2, 0.8, 0.9]).unwrap(), 1.0));
        assert!(approx_eq(roc_auc_score(&labels, &[0.9, 0.8, 0.2, 0.1]).unwrap(), 0.0));
    }

    #[test]
    fn ties_count_half() {
        assert!(approx_eq(roc_auc_score(&[0, 1], &[0.5, 0.5]).unwrap(), 0.5));
        // One positive above both negatives, one tied with a negative.
        let auc = roc_auc_score(&[0, 0, 1, 1], &[0.1, 0.5, 0.5, 0.9]).unwrap();
        assert!(approx_eq(auc, 0.875));
    }

    #[test]
    fn single_class_is_chance() {
        assert_eq!(roc_auc_score(&[1, 1], &[0.2, 0.3]).unwrap(), 0.5);
    }

    #[test]
    fn input_validation() {
        assert!(roc_auc_score(&[0, 1], &[0.1]).is_err());
        assert!(roc_auc_score(&[], &[]).is_err());
        assert!(roc_auc_score(&[0, 2], &[0.1, 0.2]).is_err());
        assert!(roc_auc_score(&[0, 1], &[0.1, f64::NAN]).is_err());
        assert!(precision_recall_curve(&[0, 0], &[0.1, 0.2]).is_err());
    }

    #[test]
    fn pr_curve_points() {
        let curve = precision_recall_curve(&[0, 1, 0, 1], &[0.1, 0.4, 0.35, 0.8]).unwrap();
        assert_eq!(curve.thresholds, vec![0.1, 0.35, 0.4, 0.8]);
        assert_eq!(curve.precision.len(), 5);
        assert!(approx_eq(curve.precision[0], 0.5));
        assert!(approx_eq(curve.precision[1], 2.0 / 3.0));
        assert!(approx_eq(curve.precision[2], 1.0));
        assert!(approx_eq(curve.precision[3], 1.0));
        assert_eq!(curve.recall, vec![1.0, 1.0, 1.0, 0.5, 0.0]);
        assert_eq!(curve.precision[4], 1.0);
    }
}
