//! Detector configuration.

use ag_common::{Error, Result};
use ag_math::ScoreTransform;
use serde::{Deserialize, Serialize};

/// Default maximum context order.
pub const DEFAULT_MAX_ORDER: usize = 3;

/// Default decision threshold for [`crate::AnomalyDetector::predict`].
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Orders above this trigger a capacity warning at fit time.
pub const CAPACITY_WARN_ORDER: usize = 8;

/// Configuration for [`crate::AnomalyDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    /// Longest context length considered. Must be at least 1.
    #[serde(default = "default_max_order")]
    pub max_order: usize,

    /// Scoped worker threads for sharded training and batch scoring.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// How raw mean surprise is normalized into [0, 1).
    #[serde(default)]
    pub score_transform: ScoreTransform,

    /// Threshold used by `predict_default`.
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,

    /// Estimated grid size above which fit logs a capacity warning.
    #[serde(default = "default_memory_warn_bytes")]
    pub memory_warn_bytes: usize,
}

fn default_max_order() -> usize {
    DEFAULT_MAX_ORDER
}

fn default_workers() -> usize {
    1
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_memory_warn_bytes() -> usize {
    256 * 1024 * 1024
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_order: default_max_order(),
            workers: default_workers(),
            score_transform: ScoreTransform::default(),
            default_threshold: default_threshold(),
            memory_warn_bytes: default_memory_warn_bytes(),
        }
    }
}

impl DetectorConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_order == 0 {
            return Err(Error::invalid_parameter(
                "max_order must be a positive integer, got 0",
            ));
        }
        if self.workers == 0 {
            return Err(Error::invalid_parameter("workers must be at least 1"));
        }
        validate_threshold(self.default_threshold)?;
        Ok(())
    }

    /// Set the maximum order, rejecting 0.
    pub fn with_max_order(mut self, max_order: usize) -> Result<Self> {
        self.max_order = max_order;
        self.validate()?;
        Ok(self)
    }

    /// Set the worker count (clamped to at least 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the score transform.
    pub fn with_score_transform(mut self, transform: ScoreTransform) -> Self {
        self.score_transform = transform;
        self
    }

    /// Set the default threshold, rejecting values outside [0, 1].
    pub fn with_default_threshold(mut self, threshold: f64) -> Result<Self> {
        validate_threshold(threshold)?;
        self.default_threshold = threshold;
        Ok(self)
    }
}

/// Convert a caller-supplied signed order into a validated `usize`.
pub fn validate_max_order(max_order: i64) -> Result<usize> {
    if max_order <= 0 {
        return Err(Error::invalid_parameter(format!(
            "max_order must be a positive integer, got {}",
            max_order
        )));
    }
    usize::try_from(max_order).map_err(|_| {
        Error::invalid_parameter(format!("max_order {} is too large", max_order))
    })
}

/// Check that a decision threshold lies in [0, 1].
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(Error::invalid_parameter(format!(
            "threshold must lie in [0, 1], got {}",
            threshold
        )));
    }
    Ok(())
}
