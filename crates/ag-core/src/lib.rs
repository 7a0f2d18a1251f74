//! Anomaly Grid core model.
//!
//! A variable-order context model over discrete symbol sequences. Training
//! counts next-symbol occurrences for every context of length `0..=max_order`;
//! scoring walks each position from the longest supported context down to the
//! unconditional distribution and reports the mean surprise of a sequence as
//! an anomaly score in [0, 1).
//!
//! By default the score counts only surprise above the training corpus's own
//! mean ([`ScoreTransform::Excess`]); see its docs for why the plain
//! `1 - exp(-S)` mapping ([`ScoreTransform::Absolute`]) is not the default.
//!
//! ```
//! use ag_core::AnomalyDetector;
//!
//! let training: Vec<Vec<&str>> = (0..10)
//!     .flat_map(|_| [vec!["A", "B"], vec!["A", "C"]])
//!     .collect();
//!
//! let mut detector = AnomalyDetector::new(2)?;
//! detector.fit(&training)?;
//!
//! let labels = detector.predict(&[vec!["A", "B"], vec!["X", "Y"]], 0.5)?;
//! assert_eq!(labels, vec![0, 1]);
//! # Ok::<(), ag_common::Error>(())
//! ```

pub mod alphabet;
pub mod config;
pub mod detector;
pub mod grid;
pub mod metrics;
pub mod scorer;
pub mod snapshot;

mod parallel;

pub use alphabet::{Alphabet, SymbolId};
pub use config::{
    validate_max_order, validate_threshold, DetectorConfig, CAPACITY_WARN_ORDER,
    DEFAULT_MAX_ORDER, DEFAULT_THRESHOLD,
};
pub use detector::{AnomalyDetector, SequenceScore};
pub use grid::{ContextGrid, ContextTable, ContextView, NextCounts};
pub use metrics::PerformanceMetrics;
pub use scorer::{BackoffScorer, PositionScore, MIN_SUPPORT};
pub use snapshot::{ContextSnapshot, ModelSnapshot, TableSnapshot, SNAPSHOT_SCHEMA_VERSION};

pub use ag_math::ScoreTransform;
