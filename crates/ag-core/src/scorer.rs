//! Order-backoff surprise scorer.
//!
//! For position `i` of an encoded sequence the scorer walks from order
//! `min(max_order, i)` down to 1 and answers with the first context observed
//! at least [`MIN_SUPPORT`] times:
//!
//! ```text
//! P(next | context_k) = count_k(context, next) / total_k(context)
//! ```
//!
//! The estimate is 0 when `next` never followed that exact context; the scorer
//! does not descend further in that case. If no order `k >= 1` has support,
//! the unconditional order-0 distribution is used with additive smoothing that
//! reserves mass for the unknown symbol:
//!
//! ```text
//! P(next) = (count_0(next) + α) / (total_0 + α·(V + 1))
//! ```
//!
//! Surprise is `-ln(max(P, ε))`, so every position has a finite cost.

use crate::alphabet::SymbolId;
use crate::grid::ContextGrid;
use ag_math::{mean_surprise, relative_frequency, smoothed_probability, surprise, DEFAULT_ALPHA};
use serde::{Deserialize, Serialize};

/// Minimum observations for a context to answer a query.
pub const MIN_SUPPORT: u64 = 1;

/// Scoring detail for a single position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionScore {
    /// Index within the sequence.
    pub position: usize,
    /// Encoded symbol at this position (the unknown id for unseen symbols).
    pub symbol: SymbolId,
    /// Context order that produced the estimate (0 = unconditional).
    pub order_used: usize,
    /// Estimated probability before ε-clamping.
    pub probability: f64,
    /// `-ln(max(probability, ε))`.
    pub surprise: f64,
}

/// Backoff scorer over a trained grid.
#[derive(Debug, Clone, Copy)]
pub struct BackoffScorer<'a> {
    grid: &'a ContextGrid,
    alphabet_size: usize,
    alpha: f64,
}

impl<'a> BackoffScorer<'a> {
    /// Create a scorer for `grid` trained over `alphabet_size` symbols.
    pub fn new(grid: &'a ContextGrid, alphabet_size: usize) -> Self {
        Self {
            grid,
            alphabet_size,
            alpha: DEFAULT_ALPHA,
        }
    }

    /// Estimate `P(next | history)` and the order that answered.
    ///
    /// `history` is everything before the target position; only its last
    /// `max_order` ids are consulted.
    pub fn estimate(&self, history: &[SymbolId], next: SymbolId) -> (f64, usize) {
        let top = self.grid.max_order().min(history.len());
        for k in (1..=top).rev() {
            let context = &history[history.len() - k..];
            let view = self.grid.lookup(k, context);
            if view.has_support(MIN_SUPPORT) {
                if let Some(p) = relative_frequency(view.count(next), view.total()) {
                    return (p, k);
                }
            }
        }

        let unconditional = self.grid.lookup(0, &[]);
        let p = smoothed_probability(
            unconditional.count(next),
            unconditional.total(),
            self.alpha,
            self.alphabet_size,
        );
        (p, 0)
    }

    /// Score position `i` of `sequence`.
    ///
    /// # Panics
    /// Panics if `i` is out of bounds.
    pub fn score_position(&self, sequence: &[SymbolId], i: usize) -> PositionScore {
        let next = sequence[i];
        let (probability, order_used) = self.estimate(&sequence[..i], next);
        PositionScore {
            position: i,
            symbol: next,
            order_used,
            probability,
            surprise: surprise(probability),
        }
    }

    /// Per-position scoring detail.
    pub fn explain(&self, sequence: &[SymbolId]) -> Vec<PositionScore> {
        (0..sequence.len())
            .map(|i| self.score_position(sequence, i))
            .collect()
    }

    /// Per-position surprise values.
    pub fn surprises(&self, sequence: &[SymbolId]) -> Vec<f64> {
        (0..sequence.len())
            .map(|i| self.score_position(sequence, i).surprise)
            .collect()
    }

    /// Length-normalized surprise: the mean over all positions.
    pub fn mean_surprise(&self, sequence: &[SymbolId]) -> f64 {
        mean_surprise(&self.surprises(sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    /// A=0, B=1, C=2; 20× [A,B] and 20× [A,C].
    fn ab_ac_grid() -> ContextGrid {
        let mut data = Vec::new();
        for _ in 0..20 {
            data.push(vec![0u32, 1]);
            data.push(vec![0u32, 2]);
        }
        ContextGrid::build(2, &data).unwrap()
    }

    #[test]
    fn first_position_uses_smoothed_unconditional() {
        let grid = ab_ac_grid();
        let scorer = BackoffScorer::new(&grid, 3);
        let (p, order) = scorer.estimate(&[], 0);
        assert_eq!(order, 0);
        assert!(approx_eq(p, 41.0 / 84.0, 1e-12));
    }

    #[test]
    fn supported_context_uses_relative_frequency() {
        let grid = ab_ac_grid();
        let scorer = BackoffScorer::new(&grid, 3);
        let (p, order) = scorer.estimate(&[0], 1);
        assert_eq!(order, 1);
        assert!(approx_eq(p, 0.5, 1e-12));
    }

    #[test]
    fn unseen_continuation_of_supported_context_is_zero() {
        let grid = ab_ac_grid();
        let scorer = BackoffScorer::new(&grid, 3);
        // A was never followed by A; order 1 answers and does not back off.
        let (p, order) = scorer.estimate(&[0], 0);
        assert_eq!(order, 1);
        assert_eq!(p, 0.0);
        let detail = scorer.score_position(&[0, 0], 1);
        assert!(detail.surprise.is_finite());
        assert!(approx_eq(detail.surprise, -(1e-12f64).ln(), 1e-9));
    }

    #[test]
    fn unknown_context_backs_off_to_order_zero() {
        let grid = ab_ac_grid();
        let scorer = BackoffScorer::new(&grid, 3);
        let unknown = 3;
        let (p, order) = scorer.estimate(&[unknown], unknown);
        assert_eq!(order, 0);
        assert!(approx_eq(p, 1.0 / 84.0, 1e-12));
    }

    #[test]
    fn backs_off_one_order_at_a_time() {
        // [0,1,2] trained; query history [9,1] -> order 2 unseen, order 1 [1] seen.
        let grid = ContextGrid::build(2, &[vec![0u32, 1, 2]]).unwrap();
        let scorer = BackoffScorer::new(&grid, 3);
        let (p, order) = scorer.estimate(&[9, 1], 2);
        assert_eq!(order, 1);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn only_last_max_order_ids_are_consulted() {
        let grid = ContextGrid::build(1, &[vec![0u32, 1]]).unwrap();
        let scorer = BackoffScorer::new(&grid, 2);
        let (p, order) = scorer.estimate(&[7, 7, 7, 0], 1);
        assert_eq!(order, 1);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn explain_reports_each_position() {
        let grid = ab_ac_grid();
        let scorer = BackoffScorer::new(&grid, 3);
        let detail = scorer.explain(&[0, 1]);
        assert_eq!(detail.len(), 2);
        assert_eq!(detail[0].order_used, 0);
        assert_eq!(detail[1].order_used, 1);
        assert_eq!(detail[1].position, 1);
        let expected = (-(41.0f64 / 84.0).ln() + std::f64::consts::LN_2) / 2.0;
        assert!(approx_eq(scorer.mean_surprise(&[0, 1]), expected, 1e-12));
    }

    #[test]
    fn empty_sequence_has_zero_mean() {
        let grid = ab_ac_grid();
        let scorer = BackoffScorer::new(&grid, 3);
        assert!(scorer.surprises(&[]).is_empty());
        assert_eq!(scorer.mean_surprise(&[]), 0.0);
    }
}
