//! Anomaly detector: training, scoring and thresholding.
//!
//! ```text
//! fit:     sequences ─► Alphabet (intern) ─► encoded ─► ContextGrid (sharded build)
//!                                                      └► training baseline surprise
//! score:   sequence ─► Alphabet (lookup) ─► BackoffScorer ─► mean surprise S
//!                                                         ─► ScoreTransform ─► [0, 1)
//! predict: score >= threshold ─► 1 else 0
//! ```
//!
//! The fitted model is immutable. Scoring takes `&self`, keeps only atomic
//! invocation counters, and can run from any number of threads at once.

use crate::alphabet::{Alphabet, SymbolId};
use crate::config::{
    validate_max_order, validate_threshold, DetectorConfig, CAPACITY_WARN_ORDER,
};
use crate::grid::ContextGrid;
use crate::metrics::PerformanceMetrics;
use crate::parallel::map_ordered;
use crate::scorer::{BackoffScorer, PositionScore};
use crate::snapshot::{tables_from_grid, ModelSnapshot, SNAPSHOT_SCHEMA_VERSION};
use ag_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Score of one sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceScore {
    /// Mean per-position surprise (nats).
    pub raw_surprise: f64,
    /// Normalized anomaly score in [0, 1).
    pub score: f64,
    /// Number of positions scored.
    pub length: usize,
}

/// Trained state. Replaced wholesale by every successful fit.
#[derive(Debug, Clone)]
struct FittedModel<S> {
    alphabet: Alphabet<S>,
    grid: ContextGrid,
    baseline_surprise: f64,
    training_sequences: usize,
    training_symbols: u64,
    training_time_ms: f64,
}

impl<S> FittedModel<S> {
    fn scorer(&self) -> BackoffScorer<'_> {
        BackoffScorer::new(&self.grid, self.alphabet.len())
    }
}

/// Variable-order context model for discrete-sequence anomaly detection.
#[derive(Debug)]
pub struct AnomalyDetector<S> {
    config: DetectorConfig,
    model: Option<FittedModel<S>>,
    fit_calls: u64,
    predict_calls: AtomicU64,
    sequences_scored: AtomicU64,
}

impl<S> AnomalyDetector<S>
where
    S: Eq + Hash + Clone + Send + Sync,
{
    /// Create an unfitted detector with the default configuration and the
    /// given maximum order.
    ///
    /// Fails with `InvalidParameter` if `max_order <= 0`.
    pub fn new(max_order: i64) -> Result<Self> {
        let max_order = validate_max_order(max_order)?;
        Self::with_config(DetectorConfig::default().with_max_order(max_order)?)
    }

    /// Create an unfitted detector from a full configuration.
    pub fn with_config(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            model: None,
            fit_calls: 0,
            predict_calls: AtomicU64::new(0),
            sequences_scored: AtomicU64::new(0),
        })
    }

    /// Rebuild a fitted detector from a snapshot.
    ///
    /// `max_order` and `score_transform` come from the snapshot; the remaining
    /// settings come from `config`.
    pub fn from_snapshot(snapshot: &ModelSnapshot<S>, config: DetectorConfig) -> Result<Self> {
        let (alphabet, grid) = snapshot.restore()?;
        let config = DetectorConfig {
            max_order: snapshot.max_order,
            score_transform: snapshot.score_transform,
            ..config
        };
        let mut detector = Self::with_config(config)?;
        detector.model = Some(FittedModel {
            alphabet,
            grid,
            baseline_surprise: snapshot.baseline_surprise,
            training_sequences: snapshot.training_sequences,
            training_symbols: snapshot.training_symbols,
            training_time_ms: 0.0,
        });
        debug!(
            max_order = snapshot.max_order,
            vocabulary = snapshot.symbols.len(),
            "restored detector from snapshot"
        );
        Ok(detector)
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn max_order(&self) -> usize {
        self.config.max_order
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Trained alphabet, if fitted.
    pub fn alphabet(&self) -> Option<&Alphabet<S>> {
        self.model.as_ref().map(|m| &m.alphabet)
    }

    /// Trained grid, if fitted.
    pub fn grid(&self) -> Option<&ContextGrid> {
        self.model.as_ref().map(|m| &m.grid)
    }

    /// Train on `sequences`, replacing any previous model.
    ///
    /// Fails with `InvalidInput` if the collection is empty or any sequence is
    /// empty. A failed fit leaves the previous model untouched.
    pub fn fit<T>(&mut self, sequences: &[T]) -> Result<()>
    where
        T: AsRef<[S]>,
    {
        if sequences.is_empty() {
            return Err(Error::invalid_input("training collection is empty"));
        }
        if let Some(index) = sequences.iter().position(|s| s.as_ref().is_empty()) {
            return Err(Error::invalid_input(format!(
                "training sequence {} is empty",
                index
            )));
        }

        let start = Instant::now();
        let max_order = self.config.max_order;
        let workers = self.config.workers;

        let mut alphabet = Alphabet::new();
        let mut encoded: Vec<Vec<SymbolId>> = Vec::with_capacity(sequences.len());
        let mut training_symbols: u64 = 0;
        for sequence in sequences {
            let sequence = sequence.as_ref();
            let ids = sequence
                .iter()
                .map(|symbol| alphabet.intern(symbol))
                .collect::<Result<Vec<_>>>()?;
            training_symbols += ids.len() as u64;
            encoded.push(ids);
        }

        let grid = ContextGrid::build_sharded(max_order, &encoded, workers)?;

        // Sequential sum over per-sequence means keeps the baseline identical
        // for any worker count.
        let scorer = BackoffScorer::new(&grid, alphabet.len());
        let per_sequence = map_ordered(&encoded, workers, |ids| scorer.mean_surprise(ids));
        let baseline_surprise = per_sequence.iter().sum::<f64>() / per_sequence.len() as f64;

        let estimated_memory_bytes = grid.estimated_memory_bytes();
        if max_order > CAPACITY_WARN_ORDER {
            warn!(
                max_order,
                vocabulary = alphabet.len(),
                "high max_order can make the context grid grow toward V^max_order entries"
            );
        }
        if estimated_memory_bytes > self.config.memory_warn_bytes {
            warn!(
                estimated_memory_bytes,
                limit = self.config.memory_warn_bytes,
                "context grid exceeds the configured memory warning threshold"
            );
        }

        let training_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            sequences = sequences.len(),
            symbols = training_symbols,
            vocabulary = alphabet.len(),
            contexts = grid.total_contexts(),
            baseline_surprise,
            training_time_ms,
            "detector fitted"
        );

        self.model = Some(FittedModel {
            alphabet,
            grid,
            baseline_surprise,
            training_sequences: sequences.len(),
            training_symbols,
            training_time_ms,
        });
        self.fit_calls += 1;
        Ok(())
    }

    /// Raw and normalized scores for each sequence, in input order.
    ///
    /// Does not count as a predict call.
    pub fn score_sequences<T>(&self, sequences: &[T]) -> Result<Vec<SequenceScore>>
    where
        T: AsRef<[S]> + Sync,
    {
        let model = self.model.as_ref().ok_or(Error::NotFitted)?;
        if let Some(index) = sequences.iter().position(|s| s.as_ref().is_empty()) {
            return Err(Error::invalid_input(format!(
                "sequence {} is empty",
                index
            )));
        }

        let scorer = model.scorer();
        let transform = self.config.score_transform;
        let baseline = model.baseline_surprise;
        let scores = map_ordered(sequences, self.config.workers, |sequence| {
            let ids = model.alphabet.encode(sequence.as_ref());
            let raw_surprise = scorer.mean_surprise(&ids);
            SequenceScore {
                raw_surprise,
                score: transform.apply(raw_surprise, baseline),
                length: ids.len(),
            }
        });

        self.sequences_scored
            .fetch_add(sequences.len() as u64, Ordering::Relaxed);
        debug!(sequences = sequences.len(), "scored batch");
        Ok(scores)
    }

    /// Anomaly score in [0, 1) for each sequence, in input order.
    ///
    /// 0 means as predictable as the model expects; values approaching 1 are
    /// maximally surprising. Fails with `NotFitted` before [`Self::fit`].
    pub fn predict_proba<T>(&self, sequences: &[T]) -> Result<Vec<f64>>
    where
        T: AsRef<[S]> + Sync,
    {
        let scores = self.score_sequences(sequences)?;
        self.predict_calls.fetch_add(1, Ordering::Relaxed);
        Ok(scores.into_iter().map(|s| s.score).collect())
    }

    /// Binary labels: 1 if the score is at least `threshold`, else 0.
    ///
    /// Fails with `InvalidParameter` unless `threshold` lies in [0, 1].
    pub fn predict<T>(&self, sequences: &[T], threshold: f64) -> Result<Vec<u8>>
    where
        T: AsRef<[S]> + Sync,
    {
        validate_threshold(threshold)?;
        let scores = self.score_sequences(sequences)?;
        self.predict_calls.fetch_add(1, Ordering::Relaxed);
        Ok(scores
            .into_iter()
            .map(|s| u8::from(s.score >= threshold))
            .collect())
    }

    /// [`Self::predict`] with the configured default threshold (0.5 unless
    /// overridden).
    pub fn predict_default<T>(&self, sequences: &[T]) -> Result<Vec<u8>>
    where
        T: AsRef<[S]> + Sync,
    {
        self.predict(sequences, self.config.default_threshold)
    }

    /// Per-position scoring detail for one sequence.
    pub fn explain(&self, sequence: &[S]) -> Result<Vec<PositionScore>> {
        let model = self.model.as_ref().ok_or(Error::NotFitted)?;
        let ids = model.alphabet.encode(sequence);
        Ok(model.scorer().explain(&ids))
    }

    /// Summary statistics of the trained model and detector usage.
    pub fn get_performance_metrics(&self) -> Result<PerformanceMetrics> {
        let model = self.model.as_ref().ok_or(Error::NotFitted)?;
        Ok(PerformanceMetrics {
            max_order: model.grid.max_order(),
            vocabulary_size: model.alphabet.len(),
            contexts_per_order: model.grid.contexts_per_order(),
            context_count: model.grid.total_contexts(),
            training_sequences: model.training_sequences,
            training_symbols: model.training_symbols,
            training_time_ms: model.training_time_ms,
            estimated_memory_bytes: model.grid.estimated_memory_bytes(),
            baseline_surprise: model.baseline_surprise,
            score_transform: self.config.score_transform,
            fit_calls: self.fit_calls,
            predict_calls: self.predict_calls.load(Ordering::Relaxed),
            sequences_scored: self.sequences_scored.load(Ordering::Relaxed),
        })
    }

    /// Serializable copy of the fitted model.
    pub fn snapshot(&self) -> Result<ModelSnapshot<S>> {
        let model = self.model.as_ref().ok_or(Error::NotFitted)?;
        Ok(ModelSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            max_order: model.grid.max_order(),
            score_transform: self.config.score_transform,
            symbols: model.alphabet.symbols().to_vec(),
            tables: tables_from_grid(&model.grid),
            baseline_surprise: model.baseline_surprise,
            training_sequences: model.training_sequences,
            training_symbols: model.training_symbols,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ag_math::ScoreTransform;

    fn seqs(items: &[&[&str]]) -> Vec<Vec<String>> {
        items
            .iter()
            .map(|s| s.iter().map(|x| x.to_string()).collect())
            .collect()
    }

    fn ab_ac_training() -> Vec<Vec<String>> {
        let mut data = Vec::new();
        for _ in 0..10 {
            data.extend(seqs(&[&["A", "B"], &["A", "C"]]));
        }
        data
    }

    #[test]
    fn rejects_non_positive_order() {
        assert!(matches!(
            AnomalyDetector::<String>::new(0),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            AnomalyDetector::<String>::new(-2),
            Err(Error::InvalidParameter(_))
        ));
        assert!(AnomalyDetector::<String>::new(1).is_ok());
    }

    #[test]
    fn rejects_empty_training() {
        let mut detector = AnomalyDetector::<String>::new(2).unwrap();
        let empty: Vec<Vec<String>> = Vec::new();
        assert!(matches!(detector.fit(&empty), Err(Error::InvalidInput(_))));

        let with_empty = vec![vec!["A".to_string()], Vec::new()];
        let err = detector.fit(&with_empty).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref m) if m.contains("1")));
        assert!(!detector.is_fitted());
    }

    #[test]
    fn not_fitted_errors() {
        let detector = AnomalyDetector::<String>::new(2).unwrap();
        let data = seqs(&[&["A", "B"]]);
        assert!(matches!(detector.predict_proba(&data), Err(Error::NotFitted)));
        assert!(matches!(detector.predict(&data, 0.5), Err(Error::NotFitted)));
        assert!(matches!(
            detector.get_performance_metrics(),
            Err(Error::NotFitted)
        ));
        assert!(matches!(detector.snapshot(), Err(Error::NotFitted)));
    }

    #[test]
    fn threshold_checked_before_fit_state() {
        let detector = AnomalyDetector::<String>::new(2).unwrap();
        let data = seqs(&[&["A"]]);
        assert!(matches!(
            detector.predict(&data, 1.5),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn scenario_seen_vs_unseen() {
        let mut detector = AnomalyDetector::new(2).unwrap();
        detector.fit(&ab_ac_training()).unwrap();

        let test = seqs(&[&["A", "B"], &["X", "Y"]]);
        let scores = detector.predict_proba(&test).unwrap();
        assert!(scores[0] < scores[1], "scores = {:?}", scores);
        assert_eq!(detector.predict(&test, 0.5).unwrap(), vec![0, 1]);
        assert_eq!(detector.predict_default(&test).unwrap(), vec![0, 1]);
    }

    #[test]
    fn absolute_transform_matches_closed_form() {
        let config = DetectorConfig::default()
            .with_max_order(2)
            .unwrap()
            .with_score_transform(ScoreTransform::Absolute);
        let mut detector = AnomalyDetector::with_config(config).unwrap();
        detector.fit(&ab_ac_training()).unwrap();

        let scores = detector
            .score_sequences(&seqs(&[&["A", "B"], &["X", "Y"]]))
            .unwrap();
        let s_ab = (-(21.0f64 / 44.0).ln() + std::f64::consts::LN_2) / 2.0;
        assert!((scores[0].raw_surprise - s_ab).abs() < 1e-12);
        assert!((scores[0].score - (1.0 - (-s_ab).exp())).abs() < 1e-12);
        assert!((scores[1].raw_surprise - 44.0f64.ln()).abs() < 1e-12);
        assert_eq!(scores[1].length, 2);
    }

    #[test]
    fn baseline_is_training_mean_surprise() {
        let mut detector = AnomalyDetector::new(2).unwrap();
        detector.fit(&ab_ac_training()).unwrap();
        let metrics = detector.get_performance_metrics().unwrap();
        let s_ab = (-(21.0f64 / 44.0).ln() + std::f64::consts::LN_2) / 2.0;
        assert!((metrics.baseline_surprise - s_ab).abs() < 1e-12);
    }

    #[test]
    fn metrics_report_model_shape_and_counters() {
        let mut detector = AnomalyDetector::new(2).unwrap();
        detector.fit(&ab_ac_training()).unwrap();
        let test = seqs(&[&["A", "B"]]);
        detector.predict_proba(&test).unwrap();
        detector.predict(&test, 0.3).unwrap();

        let metrics = detector.get_performance_metrics().unwrap();
        assert_eq!(metrics.vocabulary_size, 3);
        // order 0: [], order 1: [A]; length-2 sequences never reach order 2.
        assert_eq!(metrics.contexts_per_order, vec![1, 1]);
        assert_eq!(metrics.context_count, 2);
        assert_eq!(metrics.training_sequences, 20);
        assert_eq!(metrics.training_symbols, 40);
        assert_eq!(metrics.fit_calls, 1);
        assert_eq!(metrics.predict_calls, 2);
        assert_eq!(metrics.sequences_scored, 2);
        assert!(metrics.training_time_ms >= 0.0);
    }

    #[test]
    fn refit_replaces_model() {
        let mut detector = AnomalyDetector::new(1).unwrap();
        detector.fit(&seqs(&[&["A", "B"]])).unwrap();
        detector.fit(&seqs(&[&["C"], &["D"]])).unwrap();

        let alphabet = detector.alphabet().unwrap();
        assert_eq!(alphabet.symbols(), &["C".to_string(), "D".to_string()]);
        assert_eq!(alphabet.get(&"A".to_string()), None);
        assert_eq!(detector.get_performance_metrics().unwrap().fit_calls, 2);
    }

    #[test]
    fn failed_refit_keeps_previous_model() {
        let mut detector = AnomalyDetector::new(1).unwrap();
        detector.fit(&seqs(&[&["A", "B"]])).unwrap();
        let empty: Vec<Vec<String>> = Vec::new();
        assert!(detector.fit(&empty).is_err());
        assert!(detector.is_fitted());
        assert_eq!(detector.alphabet().unwrap().len(), 2);
    }

    #[test]
    fn scoring_rejects_empty_sequences() {
        let mut detector = AnomalyDetector::new(1).unwrap();
        detector.fit(&seqs(&[&["A", "B"]])).unwrap();
        let bad: Vec<Vec<String>> = vec![vec!["A".to_string()], Vec::new()];
        assert!(matches!(
            detector.predict_proba(&bad),
            Err(Error::InvalidInput(_))
        ));
        let none: Vec<Vec<String>> = Vec::new();
        assert!(detector.predict_proba(&none).unwrap().is_empty());
    }

    #[test]
    fn explain_reports_backoff_orders() {
        let mut detector = AnomalyDetector::new(2).unwrap();
        detector.fit(&ab_ac_training()).unwrap();
        let detail = detector
            .explain(&["A".to_string(), "B".to_string(), "Z".to_string()])
            .unwrap();
        assert_eq!(detail.len(), 3);
        assert_eq!(detail[0].order_used, 0);
        assert_eq!(detail[1].order_used, 1);
        // [A,B] never seen at order 2 and B never followed by anything at order 1.
        assert_eq!(detail[2].order_used, 0);
        assert_eq!(detail[2].symbol, 3);
    }

    #[test]
    fn snapshot_restores_identical_scores() {
        let mut detector = AnomalyDetector::new(2).unwrap();
        detector.fit(&ab_ac_training()).unwrap();
        let snapshot = detector.snapshot().unwrap();

        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: ModelSnapshot<String> = serde_json::from_str(&json).unwrap();
        let restored = AnomalyDetector::from_snapshot(&decoded, DetectorConfig::default()).unwrap();

        let test = seqs(&[&["A", "B"], &["A", "C", "A"], &["X", "Y"]]);
        assert_eq!(
            detector.predict_proba(&test).unwrap(),
            restored.predict_proba(&test).unwrap()
        );
        assert_eq!(restored.max_order(), 2);
    }

    #[test]
    fn snapshot_rejects_wrong_schema() {
        let mut detector = AnomalyDetector::new(1).unwrap();
        detector.fit(&seqs(&[&["A", "B"]])).unwrap();
        let mut snapshot = detector.snapshot().unwrap();
        snapshot.schema_version = "0.0.1".to_string();
        assert!(matches!(
            AnomalyDetector::from_snapshot(&snapshot, DetectorConfig::default()),
            Err(Error::Snapshot(_))
        ));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn fit_capturing_logs(
        detector: &mut AnomalyDetector<String>,
        data: &[Vec<String>],
    ) -> (Result<()>, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let result = tracing::subscriber::with_default(subscriber, || detector.fit(data));
        (result, logs.text())
    }

    #[test]
    fn huge_max_order_fits_without_allocating_per_order() {
        let mut detector = AnomalyDetector::<String>::new(1 << 40).unwrap();
        let (result, logs) = fit_capturing_logs(&mut detector, &seqs(&[&["A", "B"]]));
        result.unwrap();
        assert!(logs.contains("high max_order"), "logs: {}", logs);

        let metrics = detector.get_performance_metrics().unwrap();
        assert_eq!(metrics.max_order, 1 << 40);
        assert_eq!(metrics.contexts_per_order, vec![1, 1]);
        assert_eq!(metrics.training_symbols, 2);

        let scores = detector.predict_proba(&seqs(&[&["A", "B"], &["B", "A", "B"]])).unwrap();
        assert!(scores.iter().all(|s| (0.0..1.0).contains(s)));

        let restored =
            AnomalyDetector::from_snapshot(&detector.snapshot().unwrap(), DetectorConfig::default())
                .unwrap();
        assert_eq!(restored.max_order(), 1 << 40);
    }

    #[test]
    fn memory_warning_does_not_block_fit() {
        let config = DetectorConfig {
            memory_warn_bytes: 0,
            ..DetectorConfig::default().with_max_order(2).unwrap()
        };
        let mut detector = AnomalyDetector::with_config(config).unwrap();
        let (result, logs) = fit_capturing_logs(&mut detector, &ab_ac_training());
        result.unwrap();
        assert!(logs.contains("memory warning threshold"), "logs: {}", logs);
        assert!(!logs.contains("high max_order"));

        let metrics = detector.get_performance_metrics().unwrap();
        assert!(metrics.estimated_memory_bytes > 0);
        assert_eq!(metrics.training_sequences, 20);
        assert_eq!(detector.predict(&seqs(&[&["A", "B"], &["X", "Y"]]), 0.5).unwrap(), vec![0, 1]);
    }

    #[test]
    fn default_limits_stay_quiet() {
        let mut detector = AnomalyDetector::new(2).unwrap();
        let (result, logs) = fit_capturing_logs(&mut detector, &ab_ac_training());
        result.unwrap();
        assert!(logs.is_empty(), "logs: {}", logs);
    }

    #[test]
    fn alphabet_accessors_do_not_need_hashing() {
        let alphabet: Alphabet<f64> = Alphabet::default();
        assert_eq!(alphabet.len(), 0);
        assert!(alphabet.is_empty());
        assert_eq!(alphabet.unknown_id(), 0);
        assert!(alphabet.symbols().is_empty());
    }

    #[test]
    fn detector_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnomalyDetector<String>>();
    }
}
