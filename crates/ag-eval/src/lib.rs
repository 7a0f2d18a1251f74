//! Anomaly Grid evaluation helpers.
//!
//! Tools that sit around the detector rather than inside it:
//! - Seeded train/test splits and k-fold partitions
//! - Cross-validated ROC AUC
//! - ROC AUC and precision-recall curves
//! - Synthetic labelled corpora
//! - Corpus validation, statistics, timing and memory readings

pub mod cross_val;
pub mod generate;
pub mod metrics;
pub mod split;
pub mod stats;
pub mod timer;

pub use cross_val::{cross_val_score, cross_val_score_with_config};
pub use generate::{generate_sequences, LabeledSequences};
pub use metrics::{precision_recall_curve, roc_auc_score, PrecisionRecallCurve};
pub use split::{k_fold_indices, train_test_split};
pub use stats::{calculate_sequence_stats, validate_sequences, SequenceStats};
pub use timer::{memory_usage, PerformanceTimer, TimingReport};
