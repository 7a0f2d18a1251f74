//! Read-only summary statistics of a fitted detector.

use ag_math::ScoreTransform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of the trained model and detector usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Maximum context order.
    pub max_order: usize,
    /// Distinct trained symbols.
    pub vocabulary_size: usize,
    /// Distinct contexts stored per order (index = order).
    pub contexts_per_order: Vec<usize>,
    /// Distinct contexts across all orders.
    pub context_count: usize,
    /// Sequences in the last training corpus.
    pub training_sequences: usize,
    /// Symbols in the last training corpus.
    pub training_symbols: u64,
    /// Wall-clock duration of the last fit.
    pub training_time_ms: f64,
    /// Rough heap footprint of the grid.
    pub estimated_memory_bytes: usize,
    /// Mean per-sequence surprise of the training corpus (nats).
    pub baseline_surprise: f64,
    /// Normalization applied to raw surprise.
    pub score_transform: ScoreTransform,
    /// Successful `fit` calls over the detector's lifetime.
    pub fit_calls: u64,
    /// `predict` and `predict_proba` calls.
    pub predict_calls: u64,
    /// Sequences scored across all calls.
    pub sequences_scored: u64,
}

impl PerformanceMetrics {
    /// Flatten into a string-keyed map for metric collectors.
    pub fn to_map(&self) -> BTreeMap<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_map_exposes_every_field() {
        let metrics = PerformanceMetrics {
            max_order: 2,
            vocabulary_size: 3,
            contexts_per_order: vec![1, 1, 2],
            context_count: 4,
            training_sequences: 40,
            training_symbols: 80,
            training_time_ms: 1.5,
            estimated_memory_bytes: 512,
            baseline_surprise: 0.7,
            score_transform: ScoreTransform::Excess,
            fit_calls: 1,
            predict_calls: 2,
            sequences_scored: 4,
        };
        let map = metrics.to_map();
        assert_eq!(map.len(), 13);
        assert_eq!(map["vocabulary_size"], 3);
        assert_eq!(map["contexts_per_order"], serde_json::json!([1, 1, 2]));
        assert_eq!(map["score_transform"], "excess");
        assert_eq!(map["predict_calls"], 2);
    }
}
